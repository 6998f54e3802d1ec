//! CLI command handlers.

pub mod activity;
pub mod auth;
pub mod challenges;
pub mod config;
pub mod feed;
pub mod profile;
pub mod status;

use chrono::{DateTime, Local, Utc};

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
