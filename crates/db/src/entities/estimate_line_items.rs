//! `SeaORM` Entity for estimate_line_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::LineItemCategory;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "estimate_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub estimate_id: Uuid,
    pub category: LineItemCategory,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((15, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub cost_per_unit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_price: Decimal,
    pub sort_order: i32,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::estimates::Entity",
        from = "Column::EstimateId",
        to = "super::estimates::Column::Id"
    )]
    Estimates,
}

impl Related<super::estimates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Estimates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
