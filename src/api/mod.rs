//! REST API module
//!
//! HTTP surface of the document pipeline: archive download, catalog
//! inspection and health.

pub mod document_routes;

pub use document_routes::{create_document_router, ApiError, DocumentState};
