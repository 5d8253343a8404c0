//! Report request validation.
//!
//! Turns a loosely typed [`ReportRequest`] into a [`ValidatedReportQuery`]
//! whose identifiers all come from the registry and whose operands are typed
//! values ready to be bound as parameters.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use super::error::ReportError;
use super::registry::{DataSourceDef, FieldDef, definition};
use super::types::{
    Comparison, DataSource, FieldType, FilterOperator, FilterSpec, FilterValue, Predicate,
    PredicateKind, ReportLimits, ReportRequest, SortDirection, ValidatedReportQuery,
};

/// Maximum filters per request.
pub const MAX_FILTERS: usize = 50;

/// Maximum values in an `in` list.
pub const MAX_IN_VALUES: usize = 500;

/// Service for validating report requests.
pub struct ReportService;

impl ReportService {
    /// Validates a report request against the registry.
    ///
    /// Boolean filters whose value is `null` or `"any"` are dropped: "don't
    /// care" never becomes a predicate.
    ///
    /// # Errors
    ///
    /// Returns a `ReportError` naming the offending data source, filter,
    /// field, operator, value or sort option.
    pub fn validate(
        request: &ReportRequest,
        limits: ReportLimits,
    ) -> Result<ValidatedReportQuery, ReportError> {
        let data_source = DataSource::from_str(&request.data_source)
            .map_err(ReportError::UnknownDataSource)?;
        let def = definition(data_source);

        if request.filters.len() > MAX_FILTERS {
            return Err(ReportError::TooManyFilters {
                count: request.filters.len(),
                max: MAX_FILTERS,
            });
        }

        let mut predicates = Vec::with_capacity(request.filters.len());
        for (key, spec) in &request.filters {
            if let Some(predicate) = Self::validate_filter(def, key, spec)? {
                predicates.push(predicate);
            }
        }

        let (sort_by, sort_dir) = Self::validate_sort(def, request)?;

        Ok(ValidatedReportQuery {
            data_source,
            view: def.view,
            columns: def.columns().collect(),
            predicates,
            sort_by,
            sort_dir,
            limit: Self::clamp_limit(request.limit, limits),
        })
    }

    /// Applies the default and clamps to `1..=max_limit`.
    #[must_use]
    pub fn clamp_limit(requested: Option<u64>, limits: ReportLimits) -> u64 {
        let max = limits.max_limit.max(1);
        requested.unwrap_or(limits.default_limit).clamp(1, max)
    }

    fn validate_filter(
        def: &DataSourceDef,
        key: &str,
        spec: &FilterSpec,
    ) -> Result<Option<Predicate>, ReportError> {
        let field = def
            .field(&spec.field)
            .ok_or_else(|| ReportError::UnknownField {
                filter: key.to_string(),
                field: spec.field.clone(),
            })?;

        if !field.filterable {
            return Err(ReportError::FieldNotFilterable {
                filter: key.to_string(),
                field: field.name.to_string(),
            });
        }

        let operator = FilterOperator::from_str(&spec.operator).map_err(|operator| {
            ReportError::UnknownOperator {
                filter: key.to_string(),
                operator,
            }
        })?;

        if !field.field_type.supports(operator) {
            return Err(ReportError::UnsupportedOperator {
                filter: key.to_string(),
                field: field.name.to_string(),
                operator: operator.to_string(),
            });
        }

        let ctx = FilterContext { key, field };

        if field.field_type == FieldType::Boolean
            && operator == FilterOperator::Equals
            && is_dont_care(&spec.value)
        {
            return Ok(None);
        }

        let kind = match operator {
            FilterOperator::Equals => {
                PredicateKind::Compare(Comparison::Eq, ctx.scalar(&spec.value)?)
            }
            FilterOperator::NotEquals => {
                PredicateKind::Compare(Comparison::Ne, ctx.scalar(&spec.value)?)
            }
            FilterOperator::Gt => PredicateKind::Compare(Comparison::Gt, ctx.scalar(&spec.value)?),
            FilterOperator::Gte => {
                PredicateKind::Compare(Comparison::Gte, ctx.scalar(&spec.value)?)
            }
            FilterOperator::Lt => PredicateKind::Compare(Comparison::Lt, ctx.scalar(&spec.value)?),
            FilterOperator::Lte => {
                PredicateKind::Compare(Comparison::Lte, ctx.scalar(&spec.value)?)
            }
            FilterOperator::In => PredicateKind::In(ctx.list(&spec.value)?),
            FilterOperator::Between => {
                let (low, high) = ctx.range(&spec.value)?;
                PredicateKind::Between(low, high)
            }
            FilterOperator::Contains => PredicateKind::Contains(ctx.pattern(&spec.value)?),
            FilterOperator::IsNull => PredicateKind::IsNull(ctx.null_flag(&spec.value)?),
        };

        Ok(Some(Predicate {
            column: field.name,
            kind,
        }))
    }

    fn validate_sort(
        def: &DataSourceDef,
        request: &ReportRequest,
    ) -> Result<(&'static str, SortDirection), ReportError> {
        let explicit_dir = request
            .sort_dir
            .as_deref()
            .map(|d| SortDirection::from_str(d).map_err(ReportError::InvalidSortDirection))
            .transpose()?;

        let Some(sort_by) = request.sort_by.as_deref() else {
            let (column, dir) = def.default_sort;
            return Ok((column, explicit_dir.unwrap_or(dir)));
        };

        let field = def
            .field(sort_by)
            .ok_or_else(|| ReportError::UnknownSortField(sort_by.to_string()))?;
        if !field.sortable {
            return Err(ReportError::FieldNotSortable(field.name.to_string()));
        }

        Ok((field.name, explicit_dir.unwrap_or(SortDirection::Asc)))
    }
}

/// `null` or `"any"` on a boolean field.
fn is_dont_care(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.eq_ignore_ascii_case("any"),
        _ => false,
    }
}

/// Escapes LIKE metacharacters and wraps the needle in `%`.
#[must_use]
pub fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

struct FilterContext<'a> {
    key: &'a str,
    field: &'static FieldDef,
}

impl FilterContext<'_> {
    fn invalid(&self, reason: impl Into<String>) -> ReportError {
        ReportError::InvalidValue {
            filter: self.key.to_string(),
            field: self.field.name.to_string(),
            reason: reason.into(),
        }
    }

    /// Parses one operand according to the field type.
    fn scalar(&self, value: &Value) -> Result<FilterValue, ReportError> {
        match self.field.field_type {
            FieldType::Text => value
                .as_str()
                .map(|s| FilterValue::Text(s.to_string()))
                .ok_or_else(|| self.invalid("expected a string")),
            FieldType::Enum(allowed) => {
                let s = value
                    .as_str()
                    .ok_or_else(|| self.invalid("expected a string"))?;
                if allowed.contains(&s) {
                    Ok(FilterValue::Text(s.to_string()))
                } else {
                    Err(self.invalid(format!(
                        "'{s}' is not one of: {}",
                        allowed.join(", ")
                    )))
                }
            }
            FieldType::Decimal => parse_decimal(value)
                .map(FilterValue::Decimal)
                .ok_or_else(|| self.invalid("expected a decimal number")),
            FieldType::Integer => value
                .as_i64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
                .map(FilterValue::Integer)
                .ok_or_else(|| self.invalid("expected an integer")),
            FieldType::Date => value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .map(FilterValue::Date)
                .ok_or_else(|| self.invalid("expected a date (YYYY-MM-DD)")),
            FieldType::Boolean => match value {
                Value::Bool(b) => Ok(FilterValue::Boolean(*b)),
                Value::String(s) if s.eq_ignore_ascii_case("true") => {
                    Ok(FilterValue::Boolean(true))
                }
                Value::String(s) if s.eq_ignore_ascii_case("false") => {
                    Ok(FilterValue::Boolean(false))
                }
                _ => Err(self.invalid("expected true, false, null or \"any\"")),
            },
            FieldType::Uuid => value
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(FilterValue::Uuid)
                .ok_or_else(|| self.invalid("expected a UUID")),
        }
    }

    fn list(&self, value: &Value) -> Result<Vec<FilterValue>, ReportError> {
        let items = value
            .as_array()
            .ok_or_else(|| self.invalid("expected a list"))?;
        if items.is_empty() {
            return Err(self.invalid("list must not be empty"));
        }
        if items.len() > MAX_IN_VALUES {
            return Err(self.invalid(format!("list exceeds {MAX_IN_VALUES} values")));
        }
        items.iter().map(|v| self.scalar(v)).collect()
    }

    fn range(&self, value: &Value) -> Result<(FilterValue, FilterValue), ReportError> {
        match value.as_array().map(Vec::as_slice) {
            Some([low, high]) => Ok((self.scalar(low)?, self.scalar(high)?)),
            _ => Err(self.invalid("expected exactly two values")),
        }
    }

    fn pattern(&self, value: &Value) -> Result<String, ReportError> {
        let needle = value
            .as_str()
            .ok_or_else(|| self.invalid("expected a string"))?;
        if needle.is_empty() {
            return Err(self.invalid("search text must not be empty"));
        }
        Ok(like_pattern(needle))
    }

    fn null_flag(&self, value: &Value) -> Result<bool, ReportError> {
        match value {
            Value::Null | Value::Bool(true) => Ok(true),
            Value::Bool(false) => Ok(false),
            _ => Err(self.invalid("expected true, false or null")),
        }
    }
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
