//! In-memory store
//!
//! Holds a fixed set of records; used by tests and local demos. Counts the
//! lookups it serves so callers can assert that empty selections never reach
//! the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{CaseStore, ReferenceStore, StoreResult};
use crate::models::{
    CaseRecord, CompanyMaster, Folio, LegalHeirDetail, Nomination, SecurityMaster,
    ShareHolderDetail,
};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    cases: HashMap<i64, CaseRecord>,
    folios: HashMap<i64, Folio>,
    shareholders: HashMap<i64, ShareHolderDetail>,
    legal_heirs: HashMap<i64, LegalHeirDetail>,
    nominations: HashMap<i64, Nomination>,
    securities: HashMap<i64, SecurityMaster>,
    companies: HashMap<i64, CompanyMaster>,
    lookups: AtomicUsize,
}

fn pick<T: Clone>(records: &HashMap<i64, T>, ids: &[i64]) -> Vec<T> {
    ids.iter().filter_map(|id| records.get(id).cloned()).collect()
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case(mut self, case: CaseRecord) -> Self {
        self.cases.insert(case.id, case);
        self
    }

    pub fn with_folio(mut self, folio: Folio) -> Self {
        self.folios.insert(folio.id, folio);
        self
    }

    pub fn with_shareholder(mut self, shareholder: ShareHolderDetail) -> Self {
        self.shareholders.insert(shareholder.id, shareholder);
        self
    }

    pub fn with_legal_heir(mut self, heir: LegalHeirDetail) -> Self {
        self.legal_heirs.insert(heir.id, heir);
        self
    }

    pub fn with_nomination(mut self, nomination: Nomination) -> Self {
        self.nominations.insert(nomination.id, nomination);
        self
    }

    pub fn with_security(mut self, security: SecurityMaster) -> Self {
        self.securities.insert(security.id, security);
        self
    }

    pub fn with_company(mut self, company: CompanyMaster) -> Self {
        self.companies.insert(company.id, company);
        self
    }

    /// Number of lookups served so far
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaseStore for InMemoryStore {
    async fn case_by_id(&self, case_id: i64) -> StoreResult<Option<CaseRecord>> {
        self.count();
        Ok(self.cases.get(&case_id).cloned())
    }

    async fn folios_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Folio>> {
        self.count();
        Ok(pick(&self.folios, ids))
    }
}

#[async_trait]
impl ReferenceStore for InMemoryStore {
    async fn shareholders_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<ShareHolderDetail>> {
        self.count();
        Ok(pick(&self.shareholders, ids))
    }

    async fn legal_heirs_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<LegalHeirDetail>> {
        self.count();
        Ok(pick(&self.legal_heirs, ids))
    }

    async fn legal_heirs_by_project(&self, project_id: i64) -> StoreResult<Vec<LegalHeirDetail>> {
        self.count();
        let mut heirs: Vec<_> = self
            .legal_heirs
            .values()
            .filter(|heir| heir.project_id == Some(project_id))
            .cloned()
            .collect();
        heirs.sort_by_key(|heir| heir.id);
        Ok(heirs)
    }

    async fn nominations_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Nomination>> {
        self.count();
        Ok(pick(&self.nominations, ids))
    }

    async fn security_by_id(&self, security_id: i64) -> StoreResult<Option<SecurityMaster>> {
        self.count();
        Ok(self.securities.get(&security_id).cloned())
    }

    async fn company_by_id(&self, company_id: i64) -> StoreResult<Option<CompanyMaster>> {
        self.count();
        Ok(self.companies.get(&company_id).cloned())
    }
}
