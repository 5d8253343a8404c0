//! `SeaORM` Entity for estimates table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::EstimateStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "estimates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub parent_estimate_id: Option<Uuid>,
    pub version_number: i32,
    pub is_current_version: bool,
    pub status: EstimateStatus,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub contingency_amount: Decimal,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id"
    )]
    Projects,
    #[sea_orm(has_many = "super::estimate_line_items::Entity")]
    EstimateLineItems,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl Related<super::estimate_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EstimateLineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
