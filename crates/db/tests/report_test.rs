//! Report executor against the reporting views.

mod common;

use std::collections::BTreeMap;

use rust_decimal_macros::dec;
use serde_json::json;

use buildledger_core::reports::{FilterSpec, ReportLimits, ReportRequest, TriState};
use buildledger_db::ReportRepository;
use buildledger_db::entities::sea_orm_active_enums::ProjectCategory;

use common::{connect, create_expense, create_project, create_receipt, date};

fn filter(field: &str, operator: &str, value: serde_json::Value) -> FilterSpec {
    FilterSpec {
        field: field.to_string(),
        operator: operator.to_string(),
        value,
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_expense_report_filters_by_project_and_receipt() {
    let db = connect().await;
    let project = create_project(&db, ProjectCategory::Construction, dec!(1000))
        .await
        .unwrap();
    let with_receipt = create_expense(&db, project, dec!(10), date(2025, 1, 2))
        .await
        .unwrap();
    create_expense(&db, project, dec!(20), date(2025, 1, 3))
        .await
        .unwrap();
    let receipt = create_receipt(&db, dec!(10)).await.unwrap();
    buildledger_db::ProjectFinancialsRepository::new(db.clone())
        .set_expense_receipt(with_receipt, Some(receipt))
        .await
        .unwrap();

    let repo = ReportRepository::new(db, ReportLimits::default());
    let mut filters = BTreeMap::from([(
        "project".to_string(),
        filter("project_id", "equals", json!(project.to_string())),
    )]);

    let all = repo
        .execute(&ReportRequest {
            data_source: "expenses".to_string(),
            filters: filters.clone(),
            ..ReportRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(all.total_count, 2);
    // Default sort is newest first.
    assert_eq!(all.rows[0]["expense_date"], "2025-01-03");

    if let Some(spec) = TriState::Yes.to_filter("has_receipt") {
        filters.insert("receipt".to_string(), spec);
    }
    let receipted = repo
        .execute(&ReportRequest {
            data_source: "expenses".to_string(),
            filters,
            ..ReportRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(receipted.row_count, 1);
    assert_eq!(receipted.rows[0]["id"], with_receipt.to_string());
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_limit_caps_rows_but_not_total() {
    let db = connect().await;
    let project = create_project(&db, ProjectCategory::Construction, dec!(1000))
        .await
        .unwrap();
    for day in 1..=3 {
        create_expense(&db, project, dec!(5), date(2025, 2, day))
            .await
            .unwrap();
    }

    let repo = ReportRepository::new(db, ReportLimits::default());
    let result = repo
        .execute(&ReportRequest {
            data_source: "expenses".to_string(),
            filters: BTreeMap::from([(
                "project".to_string(),
                filter("project_id", "equals", json!(project.to_string())),
            )]),
            sort_by: Some("amount".to_string()),
            sort_dir: Some("asc".to_string()),
            limit: Some(2),
        })
        .await
        .unwrap();

    assert_eq!(result.row_count, 2);
    assert_eq!(result.total_count, 3);
    assert_eq!(result.limit, 2);
}
