//! Tests for the correlation repository.

use super::*;
use sea_orm::{DatabaseBackend, MockDatabase, Transaction};

fn stored(target: CorrelationTarget) -> expense_line_item_correlations::Model {
    let mut model = expense_line_item_correlations::Model {
        id: Uuid::from_u128(9),
        expense_id: Uuid::from_u128(1),
        expense_split_id: None,
        estimate_line_item_id: None,
        change_order_line_item_id: None,
        quote_id: None,
        correlation_type: target.correlation_type().into(),
        auto_correlated: false,
        confidence_score: None,
        created_at: Utc::now().into(),
    };
    match target {
        CorrelationTarget::EstimateLineItem(id) => model.estimate_line_item_id = Some(id),
        CorrelationTarget::ChangeOrderLineItem(id) => {
            model.change_order_line_item_id = Some(id);
        }
        CorrelationTarget::Quote(id) => model.quote_id = Some(id),
    }
    model
}

fn validated(target: CorrelationTarget) -> ValidatedCorrelation {
    ValidatedCorrelation {
        expense_id: Uuid::from_u128(1),
        split_id: None,
        target,
        auto_correlated: false,
        confidence_score: None,
    }
}

#[test]
fn test_stored_target_reads_single_column() {
    let target = CorrelationTarget::Quote(Uuid::from_u128(5));
    assert_eq!(stored_target(&stored(target)), Some(target));
}

#[test]
fn test_same_target_is_idempotent() {
    let target = CorrelationTarget::EstimateLineItem(Uuid::from_u128(5));
    let write = CorrelationRepository::resolve_existing(stored(target), &validated(target))
        .unwrap();
    assert!(!write.created);
    assert_eq!(write.correlation.id, Uuid::from_u128(9));
}

#[test]
fn test_other_target_of_same_type_conflicts() {
    let existing = stored(CorrelationTarget::EstimateLineItem(Uuid::from_u128(5)));
    let requested = validated(CorrelationTarget::EstimateLineItem(Uuid::from_u128(6)));

    let err = CorrelationRepository::resolve_existing(existing, &requested).unwrap_err();
    assert!(matches!(
        err,
        CorrelationError::Conflict {
            existing_id,
            correlation_type: "estimated",
        } if existing_id == Uuid::from_u128(9)
    ));
}

#[tokio::test]
async fn test_invalid_request_issues_no_query() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let repo = CorrelationRepository::new(db);

    let request = NewCorrelation {
        expense_id: Uuid::from_u128(1),
        estimate_line_item_id: Some(Uuid::from_u128(2)),
        quote_id: Some(Uuid::from_u128(3)),
        ..NewCorrelation::default()
    };

    let err = repo.create(&request).await.unwrap_err();
    assert!(matches!(
        err,
        CorrelationError::Invalid(AllocationError::MultipleTargets(2))
    ));

    let log: Vec<Transaction> = repo.db.into_transaction_log();
    assert!(log.is_empty());
}
