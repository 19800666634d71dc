//! HTTP API: server wiring, request context, and route handlers.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
