//! Report repository: runs validated ad-hoc reports against reporting views.
//!
//! Validation happens in core before any SQL exists. Identifiers in the built
//! statements come only from the static registry; every filter value is bound
//! as a parameter.

use std::time::Instant;

use sea_orm::sea_query::{
    Alias, Asterisk, Condition, Expr, Func, LikeExpr, Order, PostgresQueryBuilder, Query,
    SelectStatement, SimpleExpr,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, FromQueryResult, JsonValue, Value};

use buildledger_core::reports::{
    Comparison, FilterValue, Predicate, PredicateKind, ReportError, ReportLimits, ReportRequest,
    ReportResult, ReportService, SortDirection, ValidatedReportQuery,
};

/// Error types for report execution.
#[derive(Debug, thiserror::Error)]
pub enum ReportQueryError {
    /// The request failed validation; nothing was queried.
    #[error(transparent)]
    Invalid(#[from] ReportError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

/// Report repository.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
    limits: ReportLimits,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, limits: ReportLimits) -> Self {
        Self { db, limits }
    }

    /// Validates and executes a report request.
    pub async fn execute(&self, request: &ReportRequest) -> Result<ReportResult, ReportQueryError> {
        execute_report(&self.db, request, self.limits).await
    }
}

/// Validates and executes a report request on any connection.
pub async fn execute_report<C: ConnectionTrait>(
    conn: &C,
    request: &ReportRequest,
    limits: ReportLimits,
) -> Result<ReportResult, ReportQueryError> {
    let query = ReportService::validate(request, limits).inspect_err(|err| {
        tracing::debug!(data_source = %request.data_source, %err, "report request rejected");
    })?;

    let started = Instant::now();
    let backend = conn.get_database_backend();

    let rows = JsonValue::find_by_statement(backend.build(&build_select(&query)))
        .all(conn)
        .await?;
    let total = CountRow::find_by_statement(backend.build(&build_count(&query)))
        .one(conn)
        .await?
        .map_or(0, |row| row.total);

    let execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let row_count = u64::try_from(rows.len()).unwrap_or(u64::MAX);

    tracing::info!(
        data_source = %query.data_source,
        filters = query.predicates.len(),
        row_count,
        execution_time_ms,
        "report executed"
    );

    Ok(ReportResult {
        data_source: query.data_source,
        rows,
        row_count,
        total_count: u64::try_from(total).unwrap_or(0),
        limit: query.limit,
        execution_time_ms,
    })
}

/// Builds the row query for a validated report.
pub fn build_select(query: &ValidatedReportQuery) -> SelectStatement {
    let order = match query.sort_dir {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };

    Query::select()
        .columns(query.columns.iter().map(|c| Alias::new(*c)))
        .from(Alias::new(query.view))
        .cond_where(conditions(&query.predicates))
        .order_by(Alias::new(query.sort_by), order)
        // Stable paging when the sort column has duplicates.
        .order_by(Alias::new("id"), Order::Asc)
        .limit(query.limit)
        .to_owned()
}

/// Builds the `COUNT(*)` query sharing the row query's predicates.
pub fn build_count(query: &ValidatedReportQuery) -> SelectStatement {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("total"))
        .from(Alias::new(query.view))
        .cond_where(conditions(&query.predicates))
        .to_owned()
}

/// Postgres SQL with inlined values, for logs and tests.
pub fn debug_sql(statement: &SelectStatement) -> String {
    statement.to_string(PostgresQueryBuilder)
}

fn conditions(predicates: &[Predicate]) -> Condition {
    predicates
        .iter()
        .fold(Condition::all(), |cond, p| cond.add(predicate_expr(p)))
}

fn predicate_expr(predicate: &Predicate) -> SimpleExpr {
    let col = Expr::col(Alias::new(predicate.column));
    match &predicate.kind {
        PredicateKind::Compare(op, value) => {
            let value = bind(value);
            match op {
                Comparison::Eq => col.eq(value),
                Comparison::Ne => col.ne(value),
                Comparison::Gt => col.gt(value),
                Comparison::Gte => col.gte(value),
                Comparison::Lt => col.lt(value),
                Comparison::Lte => col.lte(value),
            }
        }
        PredicateKind::In(values) => col.is_in(values.iter().map(bind)),
        PredicateKind::Between(low, high) => col.between(bind(low), bind(high)),
        PredicateKind::Contains(pattern) => {
            Expr::expr(Func::lower(col)).like(LikeExpr::new(pattern.as_str()).escape('\\'))
        }
        PredicateKind::IsNull(true) => col.is_null(),
        PredicateKind::IsNull(false) => col.is_not_null(),
    }
}

fn bind(value: &FilterValue) -> Value {
    match value {
        FilterValue::Text(v) => v.clone().into(),
        FilterValue::Decimal(v) => (*v).into(),
        FilterValue::Integer(v) => (*v).into(),
        FilterValue::Date(v) => (*v).into(),
        FilterValue::Boolean(v) => (*v).into(),
        FilterValue::Uuid(v) => (*v).into(),
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
