//! Project margin rollup against a real database.
//!
//! Run with `cargo test -p buildledger-db -- --ignored` after migrating.

mod common;

use futures::future::join_all;
use rust_decimal_macros::dec;
use uuid::Uuid;

use buildledger_core::allocation::QuoteStatus;
use buildledger_core::rollup::{RollupError, RollupOutcome};
use buildledger_db::ProjectFinancialsRepository;
use buildledger_db::entities::sea_orm_active_enums::{LineItemCategory, ProjectCategory};
use buildledger_db::repositories::{NewExpense, NewSplit, ProjectFinancialsError};

use common::{
    connect, create_estimate, create_expense, create_project, create_quote, create_receipt, date,
};

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_recompute_is_idempotent() {
    let db = connect().await;
    let project = create_project(&db, ProjectCategory::Construction, dec!(100000))
        .await
        .unwrap();
    create_estimate(
        &db,
        project,
        dec!(5000),
        &[(LineItemCategory::Materials, dec!(80000))],
    )
    .await
    .unwrap();
    create_expense(&db, project, dec!(30000), date(2025, 6, 11))
        .await
        .unwrap();

    let repo = ProjectFinancialsRepository::new(db);
    let first = repo.recompute(project).await.unwrap();
    let second = repo.recompute(project).await.unwrap();
    assert_eq!(first, second);

    let stored = repo.get_margins(project).await.unwrap();
    assert_eq!(stored.total_expenses, Some(dec!(30000)));
    assert_eq!(stored.current_margin, Some(dec!(70000)));
    assert_eq!(stored.projected_margin, Some(dec!(20000)));
    assert!(stored.margins_recomputed_at.is_some());
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_even_split_is_not_double_counted() {
    let db = connect().await;
    let a = create_project(&db, ProjectCategory::Construction, dec!(10000))
        .await
        .unwrap();
    let b = create_project(&db, ProjectCategory::Construction, dec!(10000))
        .await
        .unwrap();
    let expense = create_expense(&db, a, dec!(1000), date(2025, 6, 1))
        .await
        .unwrap();

    let repo = ProjectFinancialsRepository::new(db);
    let write = repo
        .replace_expense_splits(
            expense,
            &[
                NewSplit {
                    project_id: a,
                    amount: dec!(500),
                },
                NewSplit {
                    project_id: b,
                    amount: dec!(500),
                },
            ],
        )
        .await
        .unwrap();

    assert!(write.expense.is_split);
    assert_eq!(write.recomputed.len(), 2);

    for project in [a, b] {
        let stored = repo.get_margins(project).await.unwrap();
        assert_eq!(stored.total_expenses, Some(dec!(500)));
    }

    // Un-splitting puts the full amount back on the owner.
    repo.replace_expense_splits(expense, &[]).await.unwrap();
    assert_eq!(
        repo.get_margins(a).await.unwrap().total_expenses,
        Some(dec!(1000))
    );
    assert_eq!(
        repo.get_margins(b).await.unwrap().total_expenses,
        Some(dec!(0))
    );
}

fn new_expense(project_id: Uuid, amount: rust_decimal::Decimal) -> NewExpense {
    NewExpense {
        project_id,
        payee_id: None,
        category: None,
        amount,
        expense_date: date(2025, 6, 1),
        description: Some("lumber".to_string()),
    }
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_created_expense_updates_stored_totals() {
    let db = connect().await;
    let project = create_project(&db, ProjectCategory::Construction, dec!(10000))
        .await
        .unwrap();

    let repo = ProjectFinancialsRepository::new(db);
    repo.recompute(project).await.unwrap();
    assert_eq!(
        repo.get_margins(project).await.unwrap().total_expenses,
        Some(dec!(0))
    );

    let write = repo
        .create_expense(new_expense(project, dec!(400)))
        .await
        .unwrap();
    assert_eq!(write.recomputed.len(), 1);

    // A credit nets against the earlier expense.
    repo.create_expense(new_expense(project, dec!(-150)))
        .await
        .unwrap();

    let stored = repo.get_margins(project).await.unwrap();
    assert_eq!(stored.total_expenses, Some(dec!(250)));
    assert_eq!(stored.current_margin, Some(dec!(9750)));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_deleted_split_expense_leaves_every_project() {
    let db = connect().await;
    let a = create_project(&db, ProjectCategory::Construction, dec!(10000))
        .await
        .unwrap();
    let b = create_project(&db, ProjectCategory::Construction, dec!(10000))
        .await
        .unwrap();
    let expense = create_expense(&db, a, dec!(1000), date(2025, 6, 1))
        .await
        .unwrap();

    let repo = ProjectFinancialsRepository::new(db);
    repo.replace_expense_splits(
        expense,
        &[
            NewSplit {
                project_id: a,
                amount: dec!(600),
            },
            NewSplit {
                project_id: b,
                amount: dec!(400),
            },
        ],
    )
    .await
    .unwrap();
    assert_eq!(
        repo.get_margins(b).await.unwrap().total_expenses,
        Some(dec!(400))
    );

    let deletion = repo.delete_expense(expense).await.unwrap();
    assert_eq!(deletion.recomputed.len(), 2);

    for project in [a, b] {
        assert_eq!(
            repo.get_margins(project).await.unwrap().total_expenses,
            Some(dec!(0))
        );
    }

    let err = repo.delete_expense(expense).await.unwrap_err();
    assert!(matches!(err, ProjectFinancialsError::ExpenseNotFound(_)));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_reassigned_expense_moves_between_projects() {
    let db = connect().await;
    let a = create_project(&db, ProjectCategory::Construction, dec!(10000))
        .await
        .unwrap();
    let b = create_project(&db, ProjectCategory::Construction, dec!(10000))
        .await
        .unwrap();

    let repo = ProjectFinancialsRepository::new(db);
    let created = repo
        .create_expense(new_expense(a, dec!(700)))
        .await
        .unwrap();
    repo.recompute(b).await.unwrap();

    let write = repo
        .reassign_expense(created.expense.id, b)
        .await
        .unwrap();
    assert_eq!(write.expense.project_id, b);
    assert_eq!(write.recomputed.len(), 2);

    assert_eq!(
        repo.get_margins(a).await.unwrap().total_expenses,
        Some(dec!(0))
    );
    assert_eq!(
        repo.get_margins(b).await.unwrap().total_expenses,
        Some(dec!(700))
    );

    let err = repo
        .reassign_expense(created.expense.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ProjectFinancialsError::ProjectNotFound(_)));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_amount_change_rejected_when_splits_disagree() {
    let db = connect().await;
    let a = create_project(&db, ProjectCategory::Construction, dec!(10000))
        .await
        .unwrap();
    let expense = create_expense(&db, a, dec!(1000), date(2025, 6, 1))
        .await
        .unwrap();

    let repo = ProjectFinancialsRepository::new(db);
    repo.replace_expense_splits(
        expense,
        &[NewSplit {
            project_id: a,
            amount: dec!(1000),
        }],
    )
    .await
    .unwrap();

    let err = repo
        .update_expense_amount(expense, dec!(1200))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProjectFinancialsError::Rollup(RollupError::SplitTotalMismatch { .. })
    ));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_receipt_does_not_change_totals() {
    let db = connect().await;
    let project = create_project(&db, ProjectCategory::Construction, dec!(10000))
        .await
        .unwrap();
    let expense = create_expense(&db, project, dec!(250), date(2025, 6, 1))
        .await
        .unwrap();
    let receipt = create_receipt(&db, dec!(999)).await.unwrap();

    let repo = ProjectFinancialsRepository::new(db);
    repo.recompute(project).await.unwrap();
    let before = repo.get_margins(project).await.unwrap().total_expenses;

    let updated = repo
        .set_expense_receipt(expense, Some(receipt))
        .await
        .unwrap();
    assert_eq!(updated.receipt_id, Some(receipt));

    repo.recompute(project).await.unwrap();
    let after = repo.get_margins(project).await.unwrap().total_expenses;
    assert_eq!(before, after);
    assert_eq!(after, Some(dec!(250)));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_accepting_quote_substitutes_estimate_cost() {
    let db = connect().await;
    let project = create_project(&db, ProjectCategory::Construction, dec!(2000))
        .await
        .unwrap();
    let (_, items) = create_estimate(
        &db,
        project,
        dec!(0),
        &[
            (LineItemCategory::Subcontractors, dec!(500)),
            (LineItemCategory::Materials, dec!(500)),
        ],
    )
    .await
    .unwrap();
    let quote = create_quote(&db, project, items[0], dec!(420), date(2025, 5, 1))
        .await
        .unwrap();

    let repo = ProjectFinancialsRepository::new(db);
    let write = repo
        .update_quote_status(quote, QuoteStatus::Accepted)
        .await
        .unwrap();
    assert!(write.quote.accepted_date.is_some());

    let Some(recomputed) = write.recomputed else {
        panic!("accepting a quote must recompute");
    };
    let RollupOutcome::Computed { margins, .. } = recomputed.outcome else {
        panic!("construction project must compute");
    };
    assert_eq!(margins.original_est_costs, Some(dec!(1000)));
    assert_eq!(margins.adjusted_est_costs, Some(dec!(920)));

    // Leaving `accepted` restores the estimate cost.
    let write = repo
        .update_quote_status(quote, QuoteStatus::Rejected)
        .await
        .unwrap();
    assert!(write.quote.accepted_date.is_none());
    assert_eq!(
        repo.get_margins(project).await.unwrap().adjusted_est_costs,
        Some(dec!(1000))
    );
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_overhead_project_is_left_null() {
    let db = connect().await;
    let project = create_project(&db, ProjectCategory::Overhead, dec!(0))
        .await
        .unwrap();
    create_expense(&db, project, dec!(75), date(2025, 6, 1))
        .await
        .unwrap();

    let repo = ProjectFinancialsRepository::new(db);
    let outcome = repo.recompute(project).await.unwrap();
    assert!(matches!(outcome, RollupOutcome::Skipped { .. }));
    assert_eq!(repo.get_margins(project).await.unwrap().total_expenses, None);
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_concurrent_writes_converge() {
    let db = connect().await;
    let project = create_project(&db, ProjectCategory::Construction, dec!(100000))
        .await
        .unwrap();

    let mut expenses = Vec::new();
    for _ in 0..10 {
        expenses.push(
            create_expense(&db, project, dec!(10), date(2025, 6, 1))
                .await
                .unwrap(),
        );
    }

    let repo = ProjectFinancialsRepository::new(db);
    let writes = expenses
        .iter()
        .map(|id| repo.update_expense_amount(*id, dec!(100)));
    for result in join_all(writes).await {
        result.unwrap();
    }

    let stored = repo.get_margins(project).await.unwrap();
    assert_eq!(stored.total_expenses, Some(dec!(1000)));
}

#[tokio::test]
#[ignore = "requires a migrated PostgreSQL database"]
async fn test_missing_expense_is_not_found() {
    let repo = ProjectFinancialsRepository::new(connect().await);
    let err = repo
        .update_expense_amount(Uuid::new_v4(), dec!(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ProjectFinancialsError::ExpenseNotFound(_)));
}
