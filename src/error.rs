//! Error handling for the case document pipeline
//!
//! Each layer gets its own `thiserror` enum; `CaseDocumentError` is what the
//! pipeline surfaces to callers.

use std::path::PathBuf;

use docx_templates::DocxError;
use thiserror::Error;

use crate::case_documents::{TemplateId, TemplateVariant};
use crate::models::CaseType;
use crate::store::StoreError;

/// Errors raised while loading or validating the template catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Template '{0:?}' defined more than once")]
    DuplicateTemplate(TemplateId),

    #[error("Bundle '{bundle}' references undefined template '{template:?}'")]
    UnknownTemplate { bundle: String, template: TemplateId },

    #[error("Template '{template:?}' has no file for variant '{variant:?}'")]
    MissingVariant {
        template: TemplateId,
        variant: TemplateVariant,
    },

    #[error("Bundle not found: {bundle} (referenced by {referenced_by})")]
    UnknownBundle {
        bundle: String,
        referenced_by: String,
    },

    #[error("Circular inheritance detected in bundle: {0}")]
    CircularInheritance(String),

    #[error("Inheritance chain too deep for bundle: {0}")]
    InheritanceTooDeep(String),

    #[error("Case type {0} is not mapped to a bundle")]
    UnmappedCaseType(CaseType),
}

/// Why a single document could not be produced
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Template(#[from] DocxError),

    #[error("Required field '{0}' is missing from the rendering context")]
    MissingField(String),

    #[error("Catalog has no '{variant:?}' file for template '{template}'")]
    NoTemplateFile {
        template: TemplateId,
        variant: TemplateVariant,
    },
}

/// Errors surfaced by a generation run
#[derive(Error, Debug)]
pub enum CaseDocumentError {
    #[error("Case {0} not found")]
    CaseNotFound(i64),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Generation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Failed to write failure manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl CaseDocumentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CaseDocumentError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CaseDocumentError>;
