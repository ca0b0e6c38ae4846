//! Service layer for business logic
//!
//! HTTP handlers delegate to these services; they own no transport details.

mod url_service;

pub use url_service::*;
