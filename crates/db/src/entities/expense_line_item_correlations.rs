//! `SeaORM` Entity for expense_line_item_correlations table.
//!
//! Exactly one of the three target columns is set (CHECK constraint). A unique
//! index allows one correlation per type for each expense or split row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::CorrelationType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_line_item_correlations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub expense_id: Uuid,
    pub expense_split_id: Option<Uuid>,
    pub estimate_line_item_id: Option<Uuid>,
    pub change_order_line_item_id: Option<Uuid>,
    pub quote_id: Option<Uuid>,
    pub correlation_type: CorrelationType,
    pub auto_correlated: bool,
    pub confidence_score: Option<i16>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
