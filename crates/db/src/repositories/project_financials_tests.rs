//! Tests for margin recompute and its write paths.

use super::*;
use crate::entities::{
    estimate_line_items, estimates,
    sea_orm_active_enums::{EstimateStatus, ProjectCategory},
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};

fn project(category: ProjectCategory) -> projects::Model {
    let now = Utc::now().into();
    projects::Model {
        id: Uuid::from_u128(1),
        name: "Kitchen remodel".to_string(),
        category,
        original_contract_amount: dec!(100000),
        contracted_amount: None,
        original_est_costs: None,
        adjusted_est_costs: None,
        total_expenses: None,
        current_margin: None,
        current_margin_percentage: None,
        projected_margin: None,
        original_margin: None,
        contingency_amount: None,
        contingency_used: None,
        contingency_remaining: None,
        margins_recomputed_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn estimate() -> estimates::Model {
    estimates::Model {
        id: Uuid::from_u128(2),
        project_id: Uuid::from_u128(1),
        parent_estimate_id: None,
        version_number: 1,
        is_current_version: true,
        status: EstimateStatus::Approved,
        total_cost: dec!(80000),
        contingency_amount: dec!(5000),
        approved_at: None,
        created_at: Utc::now().into(),
    }
}

fn expense() -> expenses::Model {
    let now = Utc::now().into();
    expenses::Model {
        id: Uuid::from_u128(3),
        project_id: Uuid::from_u128(1),
        payee_id: None,
        category: None,
        amount: dec!(30000),
        expense_date: NaiveDate::from_ymd_opt(2025, 6, 11).unwrap(),
        description: None,
        is_split: false,
        receipt_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn receipt() -> receipts::Model {
    receipts::Model {
        id: Uuid::from_u128(4),
        image_url: "receipts/4.jpg".to_string(),
        claimed_amount: Some(dec!(30000)),
        captured_at: Utc::now().into(),
    }
}

fn split(id: u128, project: u128, amount: Decimal) -> expense_splits::Model {
    expense_splits::Model {
        id: Uuid::from_u128(id),
        expense_id: Uuid::from_u128(3),
        project_id: Uuid::from_u128(project),
        split_amount: amount,
        created_at: Utc::now().into(),
    }
}

/// Rows read by a recompute that ends in a skip.
fn skipped_recompute(db: MockDatabase) -> MockDatabase {
    db.append_query_results([vec![project(ProjectCategory::Overhead)]])
        .append_query_results([Vec::<estimates::Model>::new()])
        .append_query_results([Vec::<quotes::Model>::new()])
        .append_query_results([Vec::<change_orders::Model>::new()])
        .append_query_results([Vec::<expenses::Model>::new()])
        .append_query_results([Vec::<expense_splits::Model>::new()])
}

/// Debug renderings of the logged transactions; identifiers appear as `\"name\"`.
fn logged_sql(log: &[Transaction]) -> Vec<String> {
    log.iter().map(|t| format!("{t:?}")).collect()
}

#[tokio::test]
async fn test_non_construction_project_is_skipped_without_write() {
    // No UPDATE result is queued, so any write attempt would fail.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![project(ProjectCategory::Overhead)]])
        .append_query_results([Vec::<estimates::Model>::new()])
        .append_query_results([Vec::<quotes::Model>::new()])
        .append_query_results([Vec::<change_orders::Model>::new()])
        .append_query_results([Vec::<expenses::Model>::new()])
        .append_query_results([Vec::<expense_splits::Model>::new()])
        .into_connection();

    let outcome = recompute_in(&db, Uuid::from_u128(1)).await.unwrap();

    assert_eq!(
        outcome,
        RollupOutcome::Skipped {
            category: buildledger_core::rollup::ProjectCategory::Overhead
        }
    );
}

#[tokio::test]
async fn test_construction_project_writes_margins() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![project(ProjectCategory::Construction)]])
        .append_query_results([vec![estimate()]])
        .append_query_results([Vec::<estimate_line_items::Model>::new()])
        .append_query_results([Vec::<quotes::Model>::new()])
        .append_query_results([Vec::<change_orders::Model>::new()])
        .append_query_results([vec![expense()]])
        .append_query_results([Vec::<expense_splits::Model>::new()])
        .append_query_results([vec![project(ProjectCategory::Construction)]])
        .into_connection();

    let outcome = recompute_in(&db, Uuid::from_u128(1)).await.unwrap();

    let RollupOutcome::Computed { margins, warnings } = outcome else {
        panic!("expected computed outcome");
    };
    assert!(warnings.is_empty());
    assert_eq!(margins.total_expenses, dec!(30000));
    assert_eq!(margins.current_margin, dec!(70000));
    assert_eq!(margins.current_margin_percentage, dec!(70));
    assert_eq!(margins.original_est_costs, Some(dec!(80000)));
    assert_eq!(margins.projected_margin, Some(dec!(20000)));
    assert_eq!(margins.original_margin, Some(dec!(20000)));
    assert_eq!(margins.contingency_remaining, Some(dec!(5000)));
}

#[tokio::test]
async fn test_missing_project_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<projects::Model>::new()])
        .into_connection();

    let err = recompute_in(&db, Uuid::from_u128(1)).await.unwrap_err();
    assert!(matches!(err, ProjectFinancialsError::ProjectNotFound(_)));
}

#[tokio::test]
async fn test_invalid_splits_are_rejected_before_any_write() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![expense()]])
        .into_connection();
    let repo = ProjectFinancialsRepository::new(db);

    let err = repo
        .replace_expense_splits(
            Uuid::from_u128(3),
            &[
                NewSplit {
                    project_id: Uuid::from_u128(1),
                    amount: dec!(15000),
                },
                NewSplit {
                    project_id: Uuid::from_u128(9),
                    amount: dec!(14000),
                },
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProjectFinancialsError::Rollup(RollupError::SplitTotalMismatch { .. })
    ));
}

#[tokio::test]
async fn test_created_expense_is_rolled_into_its_project() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![project(ProjectCategory::Construction)]])
        .append_query_results([vec![expense()]])
        .append_query_results([vec![project(ProjectCategory::Construction)]])
        .append_query_results([vec![estimate()]])
        .append_query_results([Vec::<estimate_line_items::Model>::new()])
        .append_query_results([Vec::<quotes::Model>::new()])
        .append_query_results([Vec::<change_orders::Model>::new()])
        .append_query_results([vec![expense()]])
        .append_query_results([Vec::<expense_splits::Model>::new()])
        .append_query_results([vec![project(ProjectCategory::Construction)]])
        .into_connection();
    let repo = ProjectFinancialsRepository::new(db);

    let write = repo
        .create_expense(NewExpense {
            project_id: Uuid::from_u128(1),
            payee_id: None,
            category: None,
            amount: dec!(30000),
            expense_date: NaiveDate::from_ymd_opt(2025, 6, 11).unwrap(),
            description: None,
        })
        .await
        .unwrap();

    assert_eq!(write.expense.amount, dec!(30000));
    assert!(write.splits.is_empty());
    assert_eq!(write.recomputed.len(), 1);
    let RollupOutcome::Computed { margins, .. } = &write.recomputed[0].outcome else {
        panic!("expected computed outcome");
    };
    assert_eq!(margins.total_expenses, dec!(30000));

    let sql = logged_sql(&repo.db.into_transaction_log());
    assert!(sql.iter().any(|s| s.contains(r#"INSERT INTO \"expenses\""#)));
    assert!(sql.iter().any(|s| s.contains(r#"UPDATE \"projects\""#)));
}

#[tokio::test]
async fn test_expense_for_unknown_project_is_rejected_before_insert() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<projects::Model>::new()])
        .into_connection();
    let repo = ProjectFinancialsRepository::new(db);

    let err = repo
        .create_expense(NewExpense {
            project_id: Uuid::from_u128(8),
            payee_id: None,
            category: None,
            amount: dec!(10),
            expense_date: NaiveDate::from_ymd_opt(2025, 6, 11).unwrap(),
            description: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ProjectFinancialsError::ProjectNotFound(_)));
    let sql = logged_sql(&repo.db.into_transaction_log());
    assert!(!sql.iter().any(|s| s.contains("INSERT INTO")));
}

#[tokio::test]
async fn test_deleted_expense_recomputes_owner_and_split_projects() {
    let mut split_expense = expense();
    split_expense.is_split = true;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![split_expense]])
        .append_query_results([vec![split(5, 1, dec!(20000)), split(6, 9, dec!(10000))]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }]);
    let db = skipped_recompute(skipped_recompute(db)).into_connection();
    let repo = ProjectFinancialsRepository::new(db);

    let deletion = repo.delete_expense(Uuid::from_u128(3)).await.unwrap();

    let recomputed: Vec<Uuid> = deletion.recomputed.iter().map(|r| r.project_id).collect();
    assert_eq!(recomputed, vec![Uuid::from_u128(1), Uuid::from_u128(9)]);

    let sql = logged_sql(&repo.db.into_transaction_log());
    assert!(sql.iter().any(|s| s.contains(r#"DELETE FROM \"expenses\""#)));
}

#[tokio::test]
async fn test_deleting_unknown_expense_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<expenses::Model>::new()])
        .into_connection();
    let repo = ProjectFinancialsRepository::new(db);

    let err = repo.delete_expense(Uuid::from_u128(3)).await.unwrap_err();

    assert!(matches!(err, ProjectFinancialsError::ExpenseNotFound(_)));
    let sql = logged_sql(&repo.db.into_transaction_log());
    assert!(!sql.iter().any(|s| s.contains("DELETE FROM")));
}

#[tokio::test]
async fn test_reassigned_expense_recomputes_both_projects() {
    let mut moved = expense();
    moved.project_id = Uuid::from_u128(9);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![expense()]])
        .append_query_results([vec![project(ProjectCategory::Overhead)]])
        .append_query_results([Vec::<expense_splits::Model>::new()])
        .append_query_results([vec![moved]]);
    let db = skipped_recompute(skipped_recompute(db)).into_connection();
    let repo = ProjectFinancialsRepository::new(db);

    let write = repo
        .reassign_expense(Uuid::from_u128(3), Uuid::from_u128(9))
        .await
        .unwrap();

    assert_eq!(write.expense.project_id, Uuid::from_u128(9));
    let recomputed: Vec<Uuid> = write.recomputed.iter().map(|r| r.project_id).collect();
    assert_eq!(recomputed, vec![Uuid::from_u128(1), Uuid::from_u128(9)]);
}

#[tokio::test]
async fn test_reassign_to_unknown_project_writes_nothing() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![expense()]])
        .append_query_results([Vec::<projects::Model>::new()])
        .into_connection();
    let repo = ProjectFinancialsRepository::new(db);

    let err = repo
        .reassign_expense(Uuid::from_u128(3), Uuid::from_u128(9))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProjectFinancialsError::ProjectNotFound(id) if id == Uuid::from_u128(9)
    ));
    let sql = logged_sql(&repo.db.into_transaction_log());
    assert!(!sql.iter().any(|s| s.contains(r#"UPDATE \"expenses\""#)));
}

#[tokio::test]
async fn test_receipt_change_leaves_project_margins_untouched() {
    let mut attached = expense();
    attached.receipt_id = Some(Uuid::from_u128(4));

    // No project rows are queued, so any recompute would fail.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![receipt()]])
        .append_query_results([vec![expense()]])
        .append_query_results([vec![attached]])
        .into_connection();
    let repo = ProjectFinancialsRepository::new(db);

    let expense = repo
        .set_expense_receipt(Uuid::from_u128(3), Some(Uuid::from_u128(4)))
        .await
        .unwrap();
    assert_eq!(expense.receipt_id, Some(Uuid::from_u128(4)));

    let sql = logged_sql(&repo.db.into_transaction_log());
    assert_eq!(sql.len(), 3);
    assert!(sql.iter().any(|s| s.contains(r#"UPDATE \"expenses\""#)));
    assert!(!sql.iter().any(|s| s.contains("projects")));
}

#[tokio::test]
async fn test_unknown_receipt_is_rejected_before_expense_lookup() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<receipts::Model>::new()])
        .into_connection();
    let repo = ProjectFinancialsRepository::new(db);

    let err = repo
        .set_expense_receipt(Uuid::from_u128(3), Some(Uuid::from_u128(4)))
        .await
        .unwrap_err();

    assert!(matches!(err, ProjectFinancialsError::ReceiptNotFound(_)));
}
