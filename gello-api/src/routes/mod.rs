/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `csrf`: CSRF token issuance
/// - `auth`: Registration, login, session check, refresh, logout
/// - `boards`, `lists`, `tasks`: Kanban CRUD, assignment and completion
/// - `teams`: Teams and membership
/// - `users`: Profiles and user administration
/// - `points`: Leaderboard and points ledger
/// - `shop`: Points-shop catalog and redemption

pub mod auth;
pub mod boards;
pub mod csrf;
pub mod health;
pub mod lists;
pub mod points;
pub mod shop;
pub mod tasks;
pub mod teams;
pub mod users;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`)
///
/// Use with `#[serde(default, deserialize_with = "...")]`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims a string before validation sees it
///
/// Use with `#[serde(deserialize_with = "trimmed")]` so `length(min = 1)`
/// rejects whitespace-only input.
pub(crate) fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|value| value.trim().to_string())
}

/// [`trimmed`] for optional fields; needs `#[serde(default)]` as well
pub(crate) fn trimmed_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
        .map(|value| value.map(|v| v.trim().to_string()))
}

/// Maps an empty string to "clear the field"
pub(crate) fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
