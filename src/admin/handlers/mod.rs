// src/admin/handlers/mod.rs

pub mod dashboard;
pub mod users;

pub use dashboard::{fetch_all_status, summary_line, StatusBoard};
pub use users::{fetch_nearby, fetch_user_detail, filter_users};
