//! # Gello API Server Library
//!
//! HTTP JSON API for Gello: team boards, lists and tasks, points for
//! completed work, leaderboards and a points shop.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder, session authentication
//! - `config`: Layered configuration (defaults, file, environment)
//! - `cookies`: Session and CSRF cookies
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and CSRF checks
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod routes;
