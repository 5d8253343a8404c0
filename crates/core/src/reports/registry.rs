//! Static registry of reportable data sources.
//!
//! Each entry maps a [`DataSource`] to a reporting view and its allow-listed
//! fields. Table and column names reach SQL only from here. Adding a reportable
//! entity means adding an entry (and its view); bump [`REGISTRY_VERSION`] when
//! an entry changes shape.

use serde::Serialize;

use super::types::{DataSource, FieldType, SortDirection};

/// Version of the registry layout, reported to clients.
pub const REGISTRY_VERSION: u32 = 1;

const PROJECT_CATEGORIES: &[&str] = &["construction", "system", "overhead"];
const LINE_ITEM_CATEGORIES: &[&str] = &[
    "labor_internal",
    "management",
    "subcontractors",
    "materials",
    "equipment",
    "permits",
    "other",
];
const QUOTE_STATUSES: &[&str] = &["pending", "accepted", "rejected", "expired"];

/// A reportable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name in the view.
    pub name: &'static str,
    /// Column type.
    pub field_type: FieldType,
    /// May appear in filters.
    pub filterable: bool,
    /// May be sorted on.
    pub sortable: bool,
}

impl FieldDef {
    const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            field_type,
            filterable: true,
            sortable: true,
        }
    }

    const fn unsortable(self) -> Self {
        Self {
            sortable: false,
            ..self
        }
    }

    const fn output_only(self) -> Self {
        Self {
            filterable: false,
            sortable: false,
            ..self
        }
    }
}

/// Registry entry for one data source.
#[derive(Debug, Clone, Copy)]
pub struct DataSourceDef {
    /// Source.
    pub source: DataSource,
    /// Backing view.
    pub view: &'static str,
    /// Fields, in output order.
    pub fields: &'static [FieldDef],
    /// Sort when none is requested.
    pub default_sort: (&'static str, SortDirection),
}

impl DataSourceDef {
    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Output columns.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|f| f.name)
    }
}

const PROJECTS: &[FieldDef] = &[
    FieldDef::new("id", FieldType::Uuid).unsortable(),
    FieldDef::new("name", FieldType::Text),
    FieldDef::new("category", FieldType::Enum(PROJECT_CATEGORIES)),
    FieldDef::new("contracted_amount", FieldType::Decimal),
    FieldDef::new("total_expenses", FieldType::Decimal),
    FieldDef::new("original_est_costs", FieldType::Decimal),
    FieldDef::new("adjusted_est_costs", FieldType::Decimal),
    FieldDef::new("current_margin", FieldType::Decimal),
    FieldDef::new("current_margin_percentage", FieldType::Decimal),
    FieldDef::new("projected_margin", FieldType::Decimal),
    FieldDef::new("original_margin", FieldType::Decimal),
    FieldDef::new("contingency_remaining", FieldType::Decimal),
    FieldDef::new("has_approved_estimate", FieldType::Boolean),
    FieldDef::new("created_on", FieldType::Date),
];

const EXPENSES: &[FieldDef] = &[
    FieldDef::new("id", FieldType::Uuid).unsortable(),
    FieldDef::new("project_id", FieldType::Uuid).unsortable(),
    FieldDef::new("project_name", FieldType::Text),
    FieldDef::new("payee_name", FieldType::Text),
    FieldDef::new("category", FieldType::Enum(LINE_ITEM_CATEGORIES)),
    FieldDef::new("amount", FieldType::Decimal),
    FieldDef::new("expense_date", FieldType::Date),
    FieldDef::new("description", FieldType::Text).unsortable(),
    FieldDef::new("is_split", FieldType::Boolean),
    FieldDef::new("has_receipt", FieldType::Boolean),
    FieldDef::new("is_correlated", FieldType::Boolean),
];

const QUOTES: &[FieldDef] = &[
    FieldDef::new("id", FieldType::Uuid).unsortable(),
    FieldDef::new("project_id", FieldType::Uuid).unsortable(),
    FieldDef::new("project_name", FieldType::Text),
    FieldDef::new("payee_name", FieldType::Text),
    FieldDef::new("status", FieldType::Enum(QUOTE_STATUSES)),
    FieldDef::new("quote_date", FieldType::Date),
    FieldDef::new("accepted_date", FieldType::Date),
    FieldDef::new("total_amount", FieldType::Decimal),
    FieldDef::new("line_item_count", FieldType::Integer),
];

const TIME_ENTRIES: &[FieldDef] = &[
    FieldDef::new("id", FieldType::Uuid).unsortable(),
    FieldDef::new("project_id", FieldType::Uuid).unsortable(),
    FieldDef::new("project_name", FieldType::Text),
    FieldDef::new("worker_name", FieldType::Text),
    FieldDef::new("entry_date", FieldType::Date),
    FieldDef::new("hours", FieldType::Decimal),
    FieldDef::new("hourly_rate", FieldType::Decimal),
    FieldDef::new("labor_cost", FieldType::Decimal),
    FieldDef::new("is_lunch_break_deducted", FieldType::Boolean),
    FieldDef::new("approved", FieldType::Boolean),
];

const ESTIMATE_LINE_ITEMS: &[FieldDef] = &[
    FieldDef::new("id", FieldType::Uuid).unsortable(),
    FieldDef::new("estimate_id", FieldType::Uuid).unsortable(),
    FieldDef::new("project_id", FieldType::Uuid).unsortable(),
    FieldDef::new("project_name", FieldType::Text),
    FieldDef::new("category", FieldType::Enum(LINE_ITEM_CATEGORIES)),
    FieldDef::new("description", FieldType::Text),
    FieldDef::new("total_cost", FieldType::Decimal),
    FieldDef::new("total_price", FieldType::Decimal),
    // Derived per row from accepted quotes.
    FieldDef::new("quoted_cost", FieldType::Decimal).output_only(),
    FieldDef::new("is_internal", FieldType::Boolean),
];

static REGISTRY: [DataSourceDef; 5] = [
    DataSourceDef {
        source: DataSource::Projects,
        view: "reporting_projects",
        fields: PROJECTS,
        default_sort: ("name", SortDirection::Asc),
    },
    DataSourceDef {
        source: DataSource::Expenses,
        view: "reporting_expenses",
        fields: EXPENSES,
        default_sort: ("expense_date", SortDirection::Desc),
    },
    DataSourceDef {
        source: DataSource::Quotes,
        view: "reporting_quotes",
        fields: QUOTES,
        default_sort: ("quote_date", SortDirection::Desc),
    },
    DataSourceDef {
        source: DataSource::TimeEntries,
        view: "reporting_time_entries",
        fields: TIME_ENTRIES,
        default_sort: ("entry_date", SortDirection::Desc),
    },
    DataSourceDef {
        source: DataSource::EstimateLineItems,
        view: "reporting_estimate_line_items",
        fields: ESTIMATE_LINE_ITEMS,
        default_sort: ("project_name", SortDirection::Asc),
    },
];

/// Registry entry for `source`.
#[must_use]
pub fn definition(source: DataSource) -> &'static DataSourceDef {
    match source {
        DataSource::Projects => &REGISTRY[0],
        DataSource::Expenses => &REGISTRY[1],
        DataSource::Quotes => &REGISTRY[2],
        DataSource::TimeEntries => &REGISTRY[3],
        DataSource::EstimateLineItems => &REGISTRY[4],
    }
}

/// Field description for registry listings.
#[derive(Debug, Clone, Serialize)]
pub struct FieldInfo {
    /// Column name.
    pub name: &'static str,
    /// Type name.
    #[serde(rename = "type")]
    pub field_type: &'static str,
    /// Allowed values for enum fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<&'static [&'static str]>,
    /// Operators accepted when filterable.
    pub operators: Vec<&'static str>,
    /// Sortable.
    pub sortable: bool,
}

/// Data source description for registry listings.
#[derive(Debug, Clone, Serialize)]
pub struct DataSourceInfo {
    /// Name.
    pub name: &'static str,
    /// Fields.
    pub fields: Vec<FieldInfo>,
    /// Default sort field.
    pub default_sort_by: &'static str,
    /// Default sort direction.
    pub default_sort_dir: SortDirection,
}

/// The registry listing.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryInfo {
    /// Registry version.
    pub version: u32,
    /// Sources.
    pub data_sources: Vec<DataSourceInfo>,
}

/// Describes the whole registry.
#[must_use]
pub fn describe() -> RegistryInfo {
    RegistryInfo {
        version: REGISTRY_VERSION,
        data_sources: REGISTRY
            .iter()
            .map(|def| DataSourceInfo {
                name: def.source.as_str(),
                fields: def
                    .fields
                    .iter()
                    .map(|f| FieldInfo {
                        name: f.name,
                        field_type: f.field_type.name(),
                        values: match f.field_type {
                            FieldType::Enum(values) => Some(values),
                            _ => None,
                        },
                        operators: if f.filterable {
                            f.field_type.operators().iter().map(|op| op.as_str()).collect()
                        } else {
                            vec![]
                        },
                        sortable: f.sortable,
                    })
                    .collect(),
                default_sort_by: def.default_sort.0,
                default_sort_dir: def.default_sort.1,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_source_has_an_entry() {
        for source in DataSource::ALL {
            assert_eq!(definition(source).source, source);
        }
    }

    #[test]
    fn test_default_sort_fields_exist_and_are_sortable() {
        for source in DataSource::ALL {
            let def = definition(source);
            let field = def.field(def.default_sort.0).unwrap();
            assert!(field.sortable, "{source}: {}", field.name);
        }
    }

    #[test]
    fn test_identifiers_are_plain_snake_case() {
        let plain = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        };
        for def in &REGISTRY {
            assert!(plain(def.view));
            assert!(def.columns().all(plain));
        }
    }

    #[test]
    fn test_describe_lists_operators_per_type() {
        let info = describe();
        assert_eq!(info.version, REGISTRY_VERSION);
        assert_eq!(info.data_sources.len(), DataSource::ALL.len());

        let expenses = &info.data_sources[1];
        let is_split = expenses.fields.iter().find(|f| f.name == "is_split").unwrap();
        assert_eq!(is_split.operators, vec!["equals", "is_null"]);
    }
}
