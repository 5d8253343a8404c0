//! Loading of project snapshots for the pure core engines.
//!
//! Every function is generic over `ConnectionTrait` so the same reads run on
//! the pool (allocation summaries) and inside a locked transaction (margin
//! recompute).

use std::collections::HashSet;

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use buildledger_core::allocation::{
    Correlation, CorrelationTarget, Expense, ExpenseSplit, LineItem, LineItemCategory, LineItemRef,
    LineItemSource, ProjectGraph, Quote, QuoteLine,
};

use crate::entities::{
    change_order_line_items, change_orders, estimate_line_items, estimates,
    expense_line_item_correlations, expense_splits, expenses, quote_line_items, quotes,
    sea_orm_active_enums::{ChangeOrderStatus, EstimateStatus, QuoteStatus},
};

/// Current-version approved estimate of a project.
pub async fn current_approved_estimate<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> Result<Option<estimates::Model>, DbErr> {
    estimates::Entity::find()
        .filter(estimates::Column::ProjectId.eq(project_id))
        .filter(estimates::Column::IsCurrentVersion.eq(true))
        .filter(estimates::Column::Status.eq(EstimateStatus::Approved))
        .one(conn)
        .await
}

/// Line items of an estimate, soft-deleted ones included and flagged.
pub async fn estimate_items<C: ConnectionTrait>(
    conn: &C,
    estimate_id: Uuid,
) -> Result<Vec<LineItem>, DbErr> {
    let rows = estimate_line_items::Entity::find()
        .filter(estimate_line_items::Column::EstimateId.eq(estimate_id))
        .order_by_asc(estimate_line_items::Column::SortOrder)
        .order_by_asc(estimate_line_items::Column::Id)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|m| LineItem {
            item: LineItemRef::estimate(m.id),
            category: m.category.into(),
            description: m.description,
            total_cost: m.total_cost,
            is_deleted: m.deleted_at.is_some(),
        })
        .collect())
}

/// All change orders of a project, any status.
pub async fn change_orders<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> Result<Vec<change_orders::Model>, DbErr> {
    change_orders::Entity::find()
        .filter(change_orders::Column::ProjectId.eq(project_id))
        .order_by_asc(change_orders::Column::CreatedAt)
        .all(conn)
        .await
}

/// Line items of the project's approved change orders.
pub async fn approved_change_order_items<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> Result<Vec<LineItem>, DbErr> {
    let approved: Vec<Uuid> = change_orders::Entity::find()
        .filter(change_orders::Column::ProjectId.eq(project_id))
        .filter(change_orders::Column::Status.eq(ChangeOrderStatus::Approved))
        .all(conn)
        .await?
        .into_iter()
        .map(|co| co.id)
        .collect();

    if approved.is_empty() {
        return Ok(vec![]);
    }

    let rows = change_order_line_items::Entity::find()
        .filter(change_order_line_items::Column::ChangeOrderId.is_in(approved))
        .order_by_asc(change_order_line_items::Column::SortOrder)
        .order_by_asc(change_order_line_items::Column::Id)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|m| LineItem {
            item: LineItemRef::change_order(m.id),
            category: m.category.into(),
            description: m.description,
            total_cost: m.total_cost,
            is_deleted: m.deleted_at.is_some(),
        })
        .collect())
}

/// Attaches lines to quote rows.
pub async fn with_lines<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<quotes::Model>,
) -> Result<Vec<Quote>, DbErr> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Uuid> = rows.iter().map(|q| q.id).collect();
    let lines = quote_line_items::Entity::find()
        .filter(quote_line_items::Column::QuoteId.is_in(ids))
        .order_by_asc(quote_line_items::Column::Id)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|q| Quote {
            id: q.id,
            project_id: q.project_id,
            payee_id: q.payee_id,
            status: q.status.into(),
            quote_date: q.quote_date,
            accepted_date: q.accepted_date,
            lines: lines
                .iter()
                .filter(|l| l.quote_id == q.id)
                .map(|l| QuoteLine {
                    id: l.id,
                    target: l
                        .estimate_line_item_id
                        .map(LineItemRef::estimate)
                        .or_else(|| l.change_order_line_item_id.map(LineItemRef::change_order)),
                    total_cost: l.total_cost,
                })
                .collect(),
        })
        .collect())
}

/// Quotes attached to a project, with their lines.
pub async fn project_quotes<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> Result<Vec<Quote>, DbErr> {
    let rows = quotes::Entity::find()
        .filter(quotes::Column::ProjectId.eq(project_id))
        .all(conn)
        .await?;
    with_lines(conn, rows).await
}

/// Accepted quotes of other projects dated within `[from, to]`.
pub async fn accepted_quotes_between<C: ConnectionTrait>(
    conn: &C,
    exclude_project_id: Uuid,
    from: chrono::NaiveDate,
    to: chrono::NaiveDate,
) -> Result<Vec<Quote>, DbErr> {
    let rows = quotes::Entity::find()
        .filter(quotes::Column::Status.eq(QuoteStatus::Accepted))
        .filter(quotes::Column::ProjectId.ne(exclude_project_id))
        .filter(quotes::Column::QuoteDate.between(from, to))
        .all(conn)
        .await?;
    with_lines(conn, rows).await
}

/// Subset of `refs` that can still take an allocation.
///
/// An estimate item qualifies when it is live, external and on its project's
/// current approved estimate. A change order item qualifies when it is live,
/// external and on an approved change order.
pub async fn billable_targets<C: ConnectionTrait>(
    conn: &C,
    refs: &[LineItemRef],
) -> Result<HashSet<LineItemRef>, DbErr> {
    let ids_of = |source: LineItemSource| -> Vec<Uuid> {
        refs.iter()
            .filter(|r| r.source == source)
            .map(|r| r.id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect()
    };
    let estimate_ids = ids_of(LineItemSource::Estimate);
    let co_ids = ids_of(LineItemSource::ChangeOrder);

    let mut billable = HashSet::new();

    if !estimate_ids.is_empty() {
        let items: Vec<_> = estimate_line_items::Entity::find()
            .filter(estimate_line_items::Column::Id.is_in(estimate_ids))
            .filter(estimate_line_items::Column::DeletedAt.is_null())
            .all(conn)
            .await?
            .into_iter()
            .filter(|m| !LineItemCategory::from(m.category).is_internal())
            .collect();

        if !items.is_empty() {
            let parents: Vec<Uuid> = items.iter().map(|m| m.estimate_id).collect();
            let live: HashSet<Uuid> = estimates::Entity::find()
                .filter(estimates::Column::Id.is_in(parents))
                .filter(estimates::Column::IsCurrentVersion.eq(true))
                .filter(estimates::Column::Status.eq(EstimateStatus::Approved))
                .all(conn)
                .await?
                .into_iter()
                .map(|e| e.id)
                .collect();
            billable.extend(
                items
                    .iter()
                    .filter(|m| live.contains(&m.estimate_id))
                    .map(|m| LineItemRef::estimate(m.id)),
            );
        }
    }

    if !co_ids.is_empty() {
        let items: Vec<_> = change_order_line_items::Entity::find()
            .filter(change_order_line_items::Column::Id.is_in(co_ids))
            .filter(change_order_line_items::Column::DeletedAt.is_null())
            .all(conn)
            .await?
            .into_iter()
            .filter(|m| !LineItemCategory::from(m.category).is_internal())
            .collect();

        if !items.is_empty() {
            let parents: Vec<Uuid> = items.iter().map(|m| m.change_order_id).collect();
            let approved: HashSet<Uuid> = change_orders::Entity::find()
                .filter(change_orders::Column::Id.is_in(parents))
                .filter(change_orders::Column::Status.eq(ChangeOrderStatus::Approved))
                .all(conn)
                .await?
                .into_iter()
                .map(|co| co.id)
                .collect();
            billable.extend(
                items
                    .iter()
                    .filter(|m| approved.contains(&m.change_order_id))
                    .map(|m| LineItemRef::change_order(m.id)),
            );
        }
    }

    Ok(billable)
}

/// Maps an expense row to the core shape.
pub fn to_expense(m: &expenses::Model) -> Expense {
    Expense {
        id: m.id,
        project_id: m.project_id,
        payee_id: m.payee_id,
        amount: m.amount,
        expense_date: m.expense_date,
        is_split: m.is_split,
    }
}

fn to_split(m: &expense_splits::Model) -> ExpenseSplit {
    ExpenseSplit {
        id: m.id,
        expense_id: m.expense_id,
        project_id: m.project_id,
        split_amount: m.split_amount,
    }
}

/// Expenses owned by the project plus every split of those expenses and
/// every split attributed to the project. Parents of foreign splits are
/// loaded too so each split can be traced to its expense.
pub async fn project_expenses<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> Result<(Vec<Expense>, Vec<ExpenseSplit>), DbErr> {
    let mut owned = expenses::Entity::find()
        .filter(expenses::Column::ProjectId.eq(project_id))
        .order_by_asc(expenses::Column::ExpenseDate)
        .order_by_asc(expenses::Column::Id)
        .all(conn)
        .await?;
    let owned_ids: Vec<Uuid> = owned.iter().map(|e| e.id).collect();

    let splits = expense_splits::Entity::find()
        .filter(
            Condition::any()
                .add(expense_splits::Column::ProjectId.eq(project_id))
                .add(expense_splits::Column::ExpenseId.is_in(owned_ids.clone())),
        )
        .order_by_asc(expense_splits::Column::Id)
        .all(conn)
        .await?;

    let known: HashSet<Uuid> = owned_ids.into_iter().collect();
    let foreign: Vec<Uuid> = splits
        .iter()
        .map(|s| s.expense_id)
        .filter(|id| !known.contains(id))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    if !foreign.is_empty() {
        owned.extend(
            expenses::Entity::find()
                .filter(expenses::Column::Id.is_in(foreign))
                .order_by_asc(expenses::Column::Id)
                .all(conn)
                .await?,
        );
    }

    Ok((
        owned.iter().map(to_expense).collect(),
        splits.iter().map(to_split).collect(),
    ))
}

fn to_correlation(m: &expense_line_item_correlations::Model) -> Option<Correlation> {
    let target = m
        .estimate_line_item_id
        .map(CorrelationTarget::EstimateLineItem)
        .or_else(|| {
            m.change_order_line_item_id
                .map(CorrelationTarget::ChangeOrderLineItem)
        })
        .or_else(|| m.quote_id.map(CorrelationTarget::Quote))?;

    Some(Correlation {
        id: m.id,
        expense_id: m.expense_id,
        split_id: m.expense_split_id,
        target,
        auto_correlated: m.auto_correlated,
        confidence_score: m.confidence_score.and_then(|s| u8::try_from(s).ok()),
    })
}

/// Loads the full allocation graph of a project.
///
/// Correlations are those touching the project's expenses, line items or
/// quotes. Sources of correlations coming from other projects' expenses are
/// loaded so their amounts resolve.
pub async fn project_graph<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> Result<ProjectGraph, DbErr> {
    let Some(estimate) = current_approved_estimate(conn, project_id).await? else {
        return Ok(ProjectGraph {
            project_id,
            ..ProjectGraph::default()
        });
    };

    let mut line_items = estimate_items(conn, estimate.id).await?;
    line_items.extend(approved_change_order_items(conn, project_id).await?);

    let quotes = project_quotes(conn, project_id).await?;
    let (mut expenses, mut splits) = project_expenses(conn, project_id).await?;

    let estimate_item_ids: Vec<Uuid> = line_items
        .iter()
        .filter(|li| li.item.source == LineItemSource::Estimate)
        .map(|li| li.item.id)
        .collect();
    let co_item_ids: Vec<Uuid> = line_items
        .iter()
        .filter(|li| li.item.source == LineItemSource::ChangeOrder)
        .map(|li| li.item.id)
        .collect();
    let quote_ids: Vec<Uuid> = quotes.iter().map(|q| q.id).collect();
    let expense_ids: Vec<Uuid> = expenses.iter().map(|e| e.id).collect();

    let rows = expense_line_item_correlations::Entity::find()
        .filter(
            Condition::any()
                .add(expense_line_item_correlations::Column::ExpenseId.is_in(expense_ids))
                .add(
                    expense_line_item_correlations::Column::EstimateLineItemId
                        .is_in(estimate_item_ids),
                )
                .add(
                    expense_line_item_correlations::Column::ChangeOrderLineItemId
                        .is_in(co_item_ids),
                )
                .add(expense_line_item_correlations::Column::QuoteId.is_in(quote_ids)),
        )
        .order_by_asc(expense_line_item_correlations::Column::CreatedAt)
        .order_by_asc(expense_line_item_correlations::Column::Id)
        .all(conn)
        .await?;

    let correlations: Vec<Correlation> = rows.iter().filter_map(to_correlation).collect();

    let known_expenses: HashSet<Uuid> = expenses.iter().map(|e| e.id).collect();
    let missing_expenses: Vec<Uuid> = correlations
        .iter()
        .map(|c| c.expense_id)
        .filter(|id| !known_expenses.contains(id))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if !missing_expenses.is_empty() {
        let extra = expenses::Entity::find()
            .filter(expenses::Column::Id.is_in(missing_expenses))
            .all(conn)
            .await?;
        expenses.extend(extra.iter().map(to_expense));
    }

    let known_splits: HashSet<Uuid> = splits.iter().map(|s| s.id).collect();
    let missing_splits: Vec<Uuid> = correlations
        .iter()
        .filter_map(|c| c.split_id)
        .filter(|id| !known_splits.contains(id))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if !missing_splits.is_empty() {
        let extra = expense_splits::Entity::find()
            .filter(expense_splits::Column::Id.is_in(missing_splits))
            .all(conn)
            .await?;
        splits.extend(extra.iter().map(to_split));
    }

    Ok(ProjectGraph {
        project_id,
        estimate_id: Some(estimate.id),
        line_items,
        quotes,
        expenses,
        splits,
        correlations,
    })
}
