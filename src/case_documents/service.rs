//! Case Document Service
//!
//! Orchestrates one generation run: snapshot the case and everything it
//! references, assemble a context per folio, render every planned document
//! and archive the working directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::archiver::archive_directory;
use super::assembler::{assemble, CaseSnapshot, FolioSnapshot};
use super::catalog::TemplateCatalog;
use super::renderer::{RenderFailure, TemplateLibrary};
use super::resolvers::{
    resolve_affidavit_legal_heirs, resolve_affidavit_shareholders, resolve_claimants,
    resolve_folios, resolve_nominations, resolve_project_legal_heirs, resolve_slot_shareholders,
};
use crate::config::PipelineConfig;
use crate::error::{CaseDocumentError, Result};
use crate::models::LegalHeirDetail;
use crate::store::{CaseStore, ReferenceStore};

/// Written into the archive when any document failed
pub const FAILURE_MANIFEST: &str = "generation_failures.json";

/// Result of a generation run
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub case_id: i64,
    /// Absolute path of the archive
    pub archive_path: PathBuf,
    /// Documents written, relative to the archive root
    pub documents: Vec<PathBuf>,
    pub failures: Vec<RenderFailure>,
}

impl GenerationOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureManifest<'a> {
    case_id: i64,
    generated_documents: usize,
    failures: &'a [RenderFailure],
}

/// Generates the document archive for a case
#[derive(Clone)]
pub struct CaseDocumentService {
    case_store: Arc<dyn CaseStore>,
    reference_store: Arc<dyn ReferenceStore>,
    catalog: Arc<TemplateCatalog>,
    config: PipelineConfig,
}

impl CaseDocumentService {
    pub fn new(
        case_store: Arc<dyn CaseStore>,
        reference_store: Arc<dyn ReferenceStore>,
        catalog: Arc<TemplateCatalog>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            case_store,
            reference_store,
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read the case and everything it references
    pub async fn load_snapshot(&self, case_id: i64) -> Result<CaseSnapshot> {
        let case = self
            .case_store
            .case_by_id(case_id)
            .await?
            .ok_or(CaseDocumentError::CaseNotFound(case_id))?;

        let references = self.reference_store.as_ref();
        let folios = resolve_folios(&case, self.case_store.as_ref()).await?;

        let mut heirs_by_project: HashMap<i64, Vec<LegalHeirDetail>> = HashMap::new();
        let mut folio_snapshots = Vec::with_capacity(folios.len());

        for folio in folios {
            let slots = resolve_slot_shareholders(&folio, references).await?;

            let security = match folio.security_id {
                Some(id) => references.security_by_id(id).await?,
                None => None,
            };
            if folio.security_id.is_some() && security.is_none() {
                warn!(folio = %folio.folio, "Folio references a missing security master");
            }

            let company = match security.as_ref().and_then(|s| s.company_id) {
                Some(id) => references.company_by_id(id).await?,
                None => None,
            };

            // Folios of one case usually share a project
            let project_id = security.as_ref().and_then(|s| s.project_id);
            let legal_heirs = match project_id {
                Some(id) => match heirs_by_project.get(&id) {
                    Some(heirs) => heirs.clone(),
                    None => {
                        let heirs = resolve_project_legal_heirs(Some(id), references).await?;
                        heirs_by_project.insert(id, heirs.clone());
                        heirs
                    }
                },
                None => Vec::new(),
            };

            folio_snapshots.push(FolioSnapshot {
                folio,
                slots,
                security,
                company,
                legal_heirs,
            });
        }

        let mut snapshot = CaseSnapshot::new(case);
        snapshot.claimants = resolve_claimants(&snapshot.case, references).await?;
        snapshot.affidavit_shareholders =
            resolve_affidavit_shareholders(&snapshot.case, references).await?;
        snapshot.affidavit_legal_heirs =
            resolve_affidavit_legal_heirs(&snapshot.case, references).await?;
        snapshot.nominations = resolve_nominations(&snapshot.case, references).await?;
        snapshot.folios = folio_snapshots;

        Ok(snapshot)
    }

    /// Generate every document for a case and archive them.
    ///
    /// Fails with `CaseNotFound` before touching the filesystem when the case
    /// does not exist. Individual document failures do not fail the run; they
    /// are returned in the outcome and listed in the archive's manifest.
    #[instrument(skip(self))]
    pub async fn generate(&self, case_id: i64) -> Result<GenerationOutcome> {
        let snapshot = self.load_snapshot(case_id).await?;

        let working_dir = self
            .config
            .output_dir
            .join(format!("doc_{}_{}", case_id, Utc::now().timestamp_millis()));
        let catalog = Arc::clone(&self.catalog);
        let template_dir = self.config.template_dir.clone();
        let generated_on = Local::now().date_naive();

        let outcome = tokio::task::spawn_blocking(move || {
            render_and_archive(&catalog, &template_dir, &snapshot, &working_dir, generated_on)
        })
        .await??;

        info!(
            case_id,
            documents = outcome.documents.len(),
            failures = outcome.failures.len(),
            "Generated case documents"
        );
        Ok(outcome)
    }
}

/// Render every folio in order, then archive.
///
/// On a fatal error the working directory is removed so no partial run is
/// left in the output directory.
fn render_and_archive(
    catalog: &TemplateCatalog,
    template_dir: &Path,
    snapshot: &CaseSnapshot,
    working_dir: &Path,
    generated_on: NaiveDate,
) -> Result<GenerationOutcome> {
    std::fs::create_dir_all(working_dir).map_err(|e| CaseDocumentError::io(working_dir, e))?;

    let result = render_into(catalog, template_dir, snapshot, working_dir, generated_on);
    if let Err(e) = &result {
        warn!("Generation for case {} failed: {}", snapshot.case.id, e);
        discard_working_dir(working_dir);
    }
    result
}

fn render_into(
    catalog: &TemplateCatalog,
    template_dir: &Path,
    snapshot: &CaseSnapshot,
    working_dir: &Path,
    generated_on: NaiveDate,
) -> Result<GenerationOutcome> {
    let contexts = assemble(snapshot, generated_on);
    let mut library = TemplateLibrary::new(template_dir);
    let mut documents = Vec::new();
    let mut failures = Vec::new();

    for ctx in &contexts {
        let report = library.render_folio(catalog, &snapshot.case, ctx, working_dir);
        documents.extend(report.documents);
        failures.extend(report.failures);
    }

    if !failures.is_empty() {
        let manifest = FailureManifest {
            case_id: snapshot.case.id,
            generated_documents: documents.len(),
            failures: &failures,
        };
        let path = working_dir.join(FAILURE_MANIFEST);
        std::fs::write(&path, serde_json::to_vec_pretty(&manifest)?)
            .map_err(|e| CaseDocumentError::io(&path, e))?;
    }

    let archive_path = archive_directory(working_dir)?;

    Ok(GenerationOutcome {
        case_id: snapshot.case.id,
        archive_path,
        documents,
        failures,
    })
}

fn discard_working_dir(working_dir: &Path) {
    if !working_dir.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_dir_all(working_dir) {
        warn!(
            "Failed to remove working directory {:?}: {}",
            working_dir, e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case_documents::archiver::archive_path_for;
    use crate::models::{CaseRecord, CaseType, Folio};
    use tempfile::TempDir;

    fn snapshot() -> CaseSnapshot {
        let mut snapshot = CaseSnapshot::new(CaseRecord::new(5, CaseType::Claim));
        snapshot.folios.push(FolioSnapshot {
            folio: Folio {
                id: 1,
                folio: "F/001".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        snapshot
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_working_dir_removed_when_archive_fails() {
        let root = TempDir::new().unwrap();
        let working = root.path().join("doc_5_1");
        // Archive path taken by a directory, so the zip cannot be created
        std::fs::create_dir_all(archive_path_for(&working)).unwrap();
        let catalog = TemplateCatalog::builtin().unwrap();

        let result = render_and_archive(
            &catalog,
            &root.path().join("no-templates"),
            &snapshot(),
            &working,
            today(),
        );

        assert!(matches!(result, Err(CaseDocumentError::Io { .. })));
        assert!(!working.exists());
        assert!(archive_path_for(&working).is_dir());
    }

    #[test]
    fn test_failures_recorded_without_templates() {
        let root = TempDir::new().unwrap();
        let working = root.path().join("doc_5_2");
        let catalog = TemplateCatalog::builtin().unwrap();

        let outcome = render_and_archive(
            &catalog,
            &root.path().join("no-templates"),
            &snapshot(),
            &working,
            today(),
        )
        .unwrap();

        assert!(outcome.documents.is_empty());
        assert!(!outcome.failures.is_empty());
        assert!(outcome.archive_path.is_file());
        assert!(!working.exists());
    }
}
