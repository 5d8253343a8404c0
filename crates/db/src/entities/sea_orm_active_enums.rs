//! `SeaORM` active enums mapped to Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use buildledger_core::allocation::{self, LineItemCategory as CoreCategory};
use buildledger_core::rollup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "project_category")]
#[serde(rename_all = "snake_case")]
pub enum ProjectCategory {
    #[sea_orm(string_value = "construction")]
    Construction,
    #[sea_orm(string_value = "system")]
    System,
    #[sea_orm(string_value = "overhead")]
    Overhead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "estimate_status")]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "expired")]
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "change_order_status")]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "quote_status")]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "expired")]
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "line_item_category")]
#[serde(rename_all = "snake_case")]
pub enum LineItemCategory {
    #[sea_orm(string_value = "labor_internal")]
    LaborInternal,
    #[sea_orm(string_value = "management")]
    Management,
    #[sea_orm(string_value = "subcontractors")]
    Subcontractors,
    #[sea_orm(string_value = "materials")]
    Materials,
    #[sea_orm(string_value = "equipment")]
    Equipment,
    #[sea_orm(string_value = "permits")]
    Permits,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "correlation_type")]
#[serde(rename_all = "snake_case")]
pub enum CorrelationType {
    #[sea_orm(string_value = "estimated")]
    Estimated,
    #[sea_orm(string_value = "quoted")]
    Quoted,
    #[sea_orm(string_value = "change_order")]
    ChangeOrder,
}

// Conversions to and from the core domain enums.

impl From<ProjectCategory> for rollup::ProjectCategory {
    fn from(value: ProjectCategory) -> Self {
        match value {
            ProjectCategory::Construction => Self::Construction,
            ProjectCategory::System => Self::System,
            ProjectCategory::Overhead => Self::Overhead,
        }
    }
}

impl From<ChangeOrderStatus> for rollup::ChangeOrderStatus {
    fn from(value: ChangeOrderStatus) -> Self {
        match value {
            ChangeOrderStatus::Pending => Self::Pending,
            ChangeOrderStatus::Approved => Self::Approved,
            ChangeOrderStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<rollup::ChangeOrderStatus> for ChangeOrderStatus {
    fn from(value: rollup::ChangeOrderStatus) -> Self {
        match value {
            rollup::ChangeOrderStatus::Pending => Self::Pending,
            rollup::ChangeOrderStatus::Approved => Self::Approved,
            rollup::ChangeOrderStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<QuoteStatus> for allocation::QuoteStatus {
    fn from(value: QuoteStatus) -> Self {
        match value {
            QuoteStatus::Pending => Self::Pending,
            QuoteStatus::Accepted => Self::Accepted,
            QuoteStatus::Rejected => Self::Rejected,
            QuoteStatus::Expired => Self::Expired,
        }
    }
}

impl From<allocation::QuoteStatus> for QuoteStatus {
    fn from(value: allocation::QuoteStatus) -> Self {
        match value {
            allocation::QuoteStatus::Pending => Self::Pending,
            allocation::QuoteStatus::Accepted => Self::Accepted,
            allocation::QuoteStatus::Rejected => Self::Rejected,
            allocation::QuoteStatus::Expired => Self::Expired,
        }
    }
}

impl From<LineItemCategory> for CoreCategory {
    fn from(value: LineItemCategory) -> Self {
        match value {
            LineItemCategory::LaborInternal => Self::LaborInternal,
            LineItemCategory::Management => Self::Management,
            LineItemCategory::Subcontractors => Self::Subcontractors,
            LineItemCategory::Materials => Self::Materials,
            LineItemCategory::Equipment => Self::Equipment,
            LineItemCategory::Permits => Self::Permits,
            LineItemCategory::Other => Self::Other,
        }
    }
}

impl From<allocation::CorrelationType> for CorrelationType {
    fn from(value: allocation::CorrelationType) -> Self {
        match value {
            allocation::CorrelationType::Estimated => Self::Estimated,
            allocation::CorrelationType::Quoted => Self::Quoted,
            allocation::CorrelationType::ChangeOrder => Self::ChangeOrder,
        }
    }
}
