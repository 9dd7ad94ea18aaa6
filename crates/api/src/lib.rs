//! HTTP API: routing, role gates and request/response mapping.

pub mod app;
pub mod authz;
pub mod cookies;
pub mod middleware;
