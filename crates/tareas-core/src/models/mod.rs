//! Data models for the tareas API.
//!
//! - `Task`, `NewTask`, `TaskUpdate`, `TaskPage`, `TaskQuery`: the task list
//! - `User`, `NewUser`, `TokenPair`, `RefreshedToken`: accounts and credentials
//! - `PasswordRequirements`, `PasswordStrength`, `PasswordValidation`: password policy

pub mod password;
pub mod task;
pub mod user;

pub use password::{PasswordRequirements, PasswordStrength, PasswordValidation};
pub use task::{NewTask, Pagination, Priority, SortOrder, Task, TaskPage, TaskQuery, TaskUpdate};
pub use user::{NewUser, RefreshedToken, TokenPair, User};

use chrono::{DateTime, NaiveDateTime};

/// Format a server timestamp for display.
///
/// The backend emits both RFC 3339 (`2024-01-01T12:00:00Z`) and naive
/// (`2024-01-01T12:00:00.123456`) timestamps.
pub(crate) fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%b %d, %Y %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%b %d, %Y %H:%M").to_string();
    }
    raw.chars().take(16).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-01-01T12:00:00Z"), "Jan 01, 2024 12:00");
        assert_eq!(format_timestamp("2024-03-05T08:30:00.123456"), "Mar 05, 2024 08:30");
        assert_eq!(format_timestamp("2024-03-05T08:30:00"), "Mar 05, 2024 08:30");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
