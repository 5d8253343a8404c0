//! `SeaORM` entity definitions.

pub mod change_order_line_items;
pub mod change_orders;
pub mod estimate_line_items;
pub mod estimates;
pub mod expense_line_item_correlations;
pub mod expense_splits;
pub mod expenses;
pub mod payees;
pub mod projects;
pub mod quote_line_items;
pub mod quotes;
pub mod receipts;
pub mod sea_orm_active_enums;
pub mod time_entries;
