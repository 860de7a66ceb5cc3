//! Reference resolvers
//!
//! Cases reference folios and parties through `_`-joined id lists
//! (`"12_15_19"`). Each resolver parses its list, skips the store entirely
//! when nothing valid was selected, and returns records in list order.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::models::{CaseRecord, Folio, LegalHeirDetail, Nomination, ShareHolderDetail};
use crate::store::{CaseStore, ReferenceStore, StoreResult};

pub const ID_DELIMITER: char = '_';

/// Outcome of parsing a delimited id list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedIdList {
    /// Valid ids in first-seen order, without duplicates
    pub ids: Vec<i64>,
    /// Non-empty tokens that were not integers
    pub rejected: Vec<String>,
}

impl ParsedIdList {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Parse a `_`-joined id list.
///
/// Empty tokens are ignored; tokens that are not integers are collected in
/// `rejected` rather than failing the parse.
pub fn parse_id_list(raw: Option<&str>) -> ParsedIdList {
    let mut parsed = ParsedIdList::default();

    for token in raw.unwrap_or("").split(ID_DELIMITER) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<i64>() {
            Ok(id) if !parsed.ids.contains(&id) => parsed.ids.push(id),
            Ok(_) => {}
            Err(_) => parsed.rejected.push(token.to_string()),
        }
    }

    parsed
}

/// Parse a case field, logging any tokens that had to be dropped
fn parse_case_field(case: &CaseRecord, field: &str, raw: Option<&str>) -> ParsedIdList {
    let parsed = parse_id_list(raw);
    if !parsed.rejected.is_empty() {
        warn!(
            case_id = case.id,
            field,
            rejected = ?parsed.rejected,
            "Dropping non-numeric ids from case reference list"
        );
    }
    parsed
}

/// Records addressable by numeric id
pub trait Keyed {
    fn key(&self) -> i64;
}

impl Keyed for Folio {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for ShareHolderDetail {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for LegalHeirDetail {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for Nomination {
    fn key(&self) -> i64 {
        self.id
    }
}

/// Reorder store results to follow the id list; ids with no record are skipped
pub fn order_by_ids<T: Keyed>(records: Vec<T>, ids: &[i64]) -> Vec<T> {
    let mut by_id: HashMap<i64, T> = records.into_iter().map(|r| (r.key(), r)).collect();
    let ordered: Vec<T> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
    if ordered.len() < ids.len() {
        debug!(
            "Resolved {} of {} referenced ids",
            ordered.len(),
            ids.len()
        );
    }
    ordered
}

pub async fn resolve_folios(case: &CaseRecord, store: &dyn CaseStore) -> StoreResult<Vec<Folio>> {
    let parsed = parse_case_field(case, "folios", case.folios.as_deref());
    if parsed.is_empty() {
        return Ok(Vec::new());
    }
    let folios = store.folios_by_ids(&parsed.ids).await?;
    Ok(order_by_ids(folios, &parsed.ids))
}

pub async fn resolve_claimants(
    case: &CaseRecord,
    store: &dyn ReferenceStore,
) -> StoreResult<Vec<LegalHeirDetail>> {
    let parsed = parse_case_field(case, "selectClaimant", case.select_claimant.as_deref());
    if parsed.is_empty() {
        return Ok(Vec::new());
    }
    let heirs = store.legal_heirs_by_ids(&parsed.ids).await?;
    Ok(order_by_ids(heirs, &parsed.ids))
}

pub async fn resolve_affidavit_shareholders(
    case: &CaseRecord,
    store: &dyn ReferenceStore,
) -> StoreResult<Vec<ShareHolderDetail>> {
    let parsed = parse_case_field(
        case,
        "selectAffidavitShareholder",
        case.select_affidavit_shareholder.as_deref(),
    );
    if parsed.is_empty() {
        return Ok(Vec::new());
    }
    let holders = store.shareholders_by_ids(&parsed.ids).await?;
    Ok(order_by_ids(holders, &parsed.ids))
}

/// Affidavit legal heirs only exist for transmission cases that allow affidavits
pub async fn resolve_affidavit_legal_heirs(
    case: &CaseRecord,
    store: &dyn ReferenceStore,
) -> StoreResult<Vec<LegalHeirDetail>> {
    if !(case.allows_affidavit() && case.case_type.is_transmission()) {
        return Ok(Vec::new());
    }
    let parsed = parse_case_field(
        case,
        "selectAffidavitLegalHeir",
        case.select_affidavit_legal_heir.as_deref(),
    );
    if parsed.is_empty() {
        return Ok(Vec::new());
    }
    let heirs = store.legal_heirs_by_ids(&parsed.ids).await?;
    Ok(order_by_ids(heirs, &parsed.ids))
}

pub async fn resolve_nominations(
    case: &CaseRecord,
    store: &dyn ReferenceStore,
) -> StoreResult<Vec<Nomination>> {
    let parsed = parse_case_field(case, "selectNomination", case.select_nomination.as_deref());
    if parsed.is_empty() {
        return Ok(Vec::new());
    }
    let nominations = store.nominations_by_ids(&parsed.ids).await?;
    Ok(order_by_ids(nominations, &parsed.ids))
}

/// The full legal-heir set of a project, selected or not
pub async fn resolve_project_legal_heirs(
    project_id: Option<i64>,
    store: &dyn ReferenceStore,
) -> StoreResult<Vec<LegalHeirDetail>> {
    match project_id {
        Some(project_id) => store.legal_heirs_by_project(project_id).await,
        None => Ok(Vec::new()),
    }
}

/// Shareholders referenced by a folio's three slots
pub async fn resolve_slot_shareholders(
    folio: &Folio,
    store: &dyn ReferenceStore,
) -> StoreResult<[Option<ShareHolderDetail>; 3]> {
    let ids = folio.shareholder_refs();
    let found: HashMap<i64, ShareHolderDetail> = if ids.is_empty() {
        HashMap::new()
    } else {
        store
            .shareholders_by_ids(&ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect()
    };

    let mut slots: [Option<ShareHolderDetail>; 3] = [None, None, None];
    for (idx, slot) in slots.iter_mut().enumerate() {
        if let Some(id) = folio.shareholder_ref(idx + 1) {
            *slot = found.get(&id).cloned();
        }
    }

    Ok(slots)
}
