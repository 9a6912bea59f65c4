//! HTTP middleware.
//!
//! Only authentication lives here; tracing and CORS come from `tower-http` layers
//! in `routes`.

/// API key authentication and the `AuthContext` it injects
pub mod auth;
