//! Read-only stores consumed by the document pipeline
//!
//! The case workflow owns these records; the pipeline only ever reads them.
//! `CaseStore` serves cases and folios, `ReferenceStore` serves the party and
//! master records those reference. Lookups by id set return matches in any
//! order and silently skip ids that do not exist.

mod memory;
#[cfg(feature = "database")]
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CaseRecord, CompanyMaster, Folio, LegalHeirDetail, Nomination, SecurityMaster,
    ShareHolderDetail,
};

pub use memory::InMemoryStore;
#[cfg(feature = "database")]
pub use postgres::{DatabaseConfig, PgStore};

#[derive(Error, Debug)]
pub enum StoreError {
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid stored value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn case_by_id(&self, case_id: i64) -> StoreResult<Option<CaseRecord>>;

    /// Folios with their certificates attached
    async fn folios_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Folio>>;
}

#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn shareholders_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<ShareHolderDetail>>;

    async fn legal_heirs_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<LegalHeirDetail>>;

    /// Every legal heir recorded against a project
    async fn legal_heirs_by_project(&self, project_id: i64) -> StoreResult<Vec<LegalHeirDetail>>;

    async fn nominations_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Nomination>>;

    async fn security_by_id(&self, security_id: i64) -> StoreResult<Option<SecurityMaster>>;

    /// Company master with its name-change history attached
    async fn company_by_id(&self, company_id: i64) -> StoreResult<Option<CompanyMaster>>;
}
