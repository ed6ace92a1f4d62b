//! # Gello Shared Library
//!
//! This crate contains the domain types, authorization rules and data-access
//! seams used by the Gello API server.
//!
//! ## Module Organization
//!
//! - `models`: Entity shapes (users, teams, boards, lists, tasks, points ledger)
//! - `auth`: Role predicates, JWT verification, CSRF tokens, auth providers
//! - `db`: Connection pool and the `GelloStore` data-access trait with its
//!   Postgres and in-memory implementations
//! - `leaderboard`: Ranking of users by points
//! - `shop`: Points-shop catalog

pub mod auth;
pub mod db;
pub mod leaderboard;
pub mod models;
pub mod shop;

/// Current version of the Gello shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
