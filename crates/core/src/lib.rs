//! `schoolbooks-core`: shared domain primitives.
//!
//! Identifiers and the domain error type used by every other crate.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{SchoolId, UserId};
