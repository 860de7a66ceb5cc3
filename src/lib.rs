//! RTA Cases - share-certificate case document generation
//!
//! A registrar administers transfer and transmission "cases" over folios,
//! certificates, shareholders, legal heirs and nominations. This crate turns a
//! case into the legal paperwork its workflow requires: it resolves the
//! templates for the case type, assembles merge data per folio, renders every
//! `.docx` and zips the result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rta_cases::case_documents::{CaseDocumentService, TemplateCatalog};
//! use rta_cases::config::PipelineConfig;
//! use rta_cases::store::InMemoryStore;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let service = CaseDocumentService::new(
//!     store.clone(),
//!     store,
//!     Arc::new(TemplateCatalog::builtin()?),
//!     PipelineConfig::new("templates", "/tmp/rta"),
//! );
//! let outcome = service.generate(42).await?;
//! println!("archive at {:?}", outcome.archive_path);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

pub mod config;
pub mod models;

// Read-only stores (in-memory always, Postgres with `database`)
pub mod store;

// The document pipeline
pub mod case_documents;

// REST API (when enabled)
#[cfg(feature = "server")]
pub mod api;

pub use case_documents::{CaseDocumentService, GenerationOutcome, TemplateCatalog};
pub use config::PipelineConfig;
pub use error::{CaseDocumentError, CatalogError, RenderError};
