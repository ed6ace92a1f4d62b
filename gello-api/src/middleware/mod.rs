/// Middleware modules for the API server
///
/// - `security`: Security response headers
/// - `csrf`: Double-submit CSRF check on mutating requests
///
/// Session authentication lives next to the router in `app`.

pub mod csrf;
pub mod security;
