//! Report request and query types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use buildledger_shared::ReportsConfig;

/// Reportable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Projects with their cached financial fields.
    Projects,
    /// Expenses.
    Expenses,
    /// Vendor quotes.
    Quotes,
    /// Time entries.
    TimeEntries,
    /// Estimate line items.
    EstimateLineItems,
}

impl DataSource {
    /// All sources in registry order.
    pub const ALL: [Self; 5] = [
        Self::Projects,
        Self::Expenses,
        Self::Quotes,
        Self::TimeEntries,
        Self::EstimateLineItems,
    ];

    /// Name used in requests.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Expenses => "expenses",
            Self::Quotes => "quotes",
            Self::TimeEntries => "time_entries",
            Self::EstimateLineItems => "estimate_line_items",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Column type of a reportable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Free text.
    Text,
    /// Text restricted to a fixed set of values.
    Enum(&'static [&'static str]),
    /// Money or other decimal.
    Decimal,
    /// Whole number.
    Integer,
    /// Calendar date.
    Date,
    /// Boolean with tri-state filtering.
    Boolean,
    /// Identifier.
    Uuid,
}

impl FieldType {
    /// Type name for registry listings.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Enum(_) => "enum",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Uuid => "uuid",
        }
    }

    /// Operators the type supports.
    pub const fn operators(self) -> &'static [FilterOperator] {
        use FilterOperator::{
            Between, Contains, Equals, Gt, Gte, In, IsNull, Lt, Lte, NotEquals,
        };
        match self {
            Self::Text | Self::Enum(_) => &[Equals, NotEquals, In, Contains, IsNull],
            Self::Decimal | Self::Integer | Self::Date => {
                &[Equals, NotEquals, In, Between, Gt, Gte, Lt, Lte, IsNull]
            }
            Self::Boolean => &[Equals, IsNull],
            Self::Uuid => &[Equals, In, IsNull],
        }
    }

    /// Returns true if the type supports `operator`.
    #[must_use]
    pub fn supports(self, operator: FilterOperator) -> bool {
        self.operators().contains(&operator)
    }
}

/// Filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// `=`
    Equals,
    /// `<>`
    NotEquals,
    /// `IN (...)`
    In,
    /// `BETWEEN a AND b`
    Between,
    /// Case-insensitive substring match.
    Contains,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `IS NULL` / `IS NOT NULL`
    IsNull,
}

impl FilterOperator {
    /// All operators.
    pub const ALL: [Self; 10] = [
        Self::Equals,
        Self::NotEquals,
        Self::In,
        Self::Between,
        Self::Contains,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::IsNull,
    ];

    /// Name used in requests.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::In => "in",
            Self::Between => "between",
            Self::Contains => "contains",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::IsNull => "is_null",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    /// Accepts `is-null` as well as `is_null`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| s.to_string())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(s.to_string()),
        }
    }
}

/// One filter as sent by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Field name.
    pub field: String,
    /// Operator name.
    pub operator: String,
    /// Operand; shape depends on the operator.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// An ad-hoc report request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportRequest {
    /// Data source name.
    pub data_source: String,
    /// Filters keyed by an arbitrary caller-chosen key.
    #[serde(default)]
    pub filters: BTreeMap<String, FilterSpec>,
    /// Sort field.
    #[serde(default)]
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    #[serde(default)]
    pub sort_dir: Option<String>,
    /// Requested row limit.
    #[serde(default)]
    pub limit: Option<u64>,
}

/// UI state of a boolean filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    /// Only true rows.
    Yes,
    /// Only false rows.
    No,
    /// Don't care.
    Any,
}

impl TriState {
    /// Filter for this state, or `None` for "don't care".
    ///
    /// "Don't care" omits the filter entirely; it never becomes a
    /// null-equals-null comparison.
    #[must_use]
    pub fn to_filter(self, field: &str) -> Option<FilterSpec> {
        let value = match self {
            Self::Yes => true,
            Self::No => false,
            Self::Any => return None,
        };
        Some(FilterSpec {
            field: field.to_string(),
            operator: FilterOperator::Equals.as_str().to_string(),
            value: serde_json::Value::Bool(value),
        })
    }
}

/// A typed, validated filter operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Text or enum value.
    Text(String),
    /// Decimal.
    Decimal(Decimal),
    /// Integer.
    Integer(i64),
    /// Date.
    Date(NaiveDate),
    /// Boolean.
    Boolean(bool),
    /// Identifier.
    Uuid(Uuid),
}

/// Scalar comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

/// Validated predicate shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateKind {
    /// `field <op> value`
    Compare(Comparison, FilterValue),
    /// `field IN (values)`
    In(Vec<FilterValue>),
    /// `field BETWEEN low AND high`
    Between(FilterValue, FilterValue),
    /// `LOWER(field) LIKE pattern`; the pattern is already escaped and lowercased.
    Contains(String),
    /// `IS NULL` when true, `IS NOT NULL` when false.
    IsNull(bool),
}

/// A predicate over an allow-listed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Column, always taken from the registry.
    pub column: &'static str,
    /// Shape and operands.
    pub kind: PredicateKind,
}

/// A request that passed validation and can be turned into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReportQuery {
    /// Data source.
    pub data_source: DataSource,
    /// Backing view.
    pub view: &'static str,
    /// Projected columns.
    pub columns: Vec<&'static str>,
    /// Predicates, combined with AND.
    pub predicates: Vec<Predicate>,
    /// Sort column.
    pub sort_by: &'static str,
    /// Sort direction.
    pub sort_dir: SortDirection,
    /// Row limit after clamping.
    pub limit: u64,
}

/// Row limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLimits {
    /// Limit when none is requested.
    pub default_limit: u64,
    /// Upper bound regardless of request.
    pub max_limit: u64,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self::from(&ReportsConfig::default())
    }
}

impl From<&ReportsConfig> for ReportLimits {
    fn from(config: &ReportsConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }
}

/// Executed report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportResult {
    /// Data source.
    pub data_source: DataSource,
    /// Rows as JSON objects of the projected columns.
    pub rows: Vec<serde_json::Value>,
    /// Rows returned.
    pub row_count: u64,
    /// Rows matching the filters, ignoring the limit.
    pub total_count: u64,
    /// Limit applied.
    pub limit: u64,
    /// Wall time spent in the store.
    pub execution_time_ms: u64,
}
