//! `SeaORM` Entity for change_orders table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ChangeOrderStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "change_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub status: ChangeOrderStatus,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub cost_impact: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub client_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub margin_impact: Decimal,
    pub includes_contingency: bool,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub contingency_amount_used: Decimal,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id"
    )]
    Projects,
    #[sea_orm(has_many = "super::change_order_line_items::Entity")]
    ChangeOrderLineItems,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl Related<super::change_order_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChangeOrderLineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
