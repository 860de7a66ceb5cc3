//! Template Renderer
//!
//! Loads `.docx` templates from the template directory (once per run) and
//! renders planned jobs into the working directory. Each job is its own error
//! boundary: a failure is recorded and the remaining jobs still run.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use docx_templates::{DocxError, DocxTemplate, MergeEngine};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::assembler::RenderingContext;
use super::catalog::{TemplateCatalog, TemplateId, TemplateVariant};
use super::dispatch::{plan_jobs, RenderJob};
use crate::error::RenderError;
use crate::models::CaseRecord;

/// A document that could not be produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFailure {
    pub folio: String,
    pub template: TemplateId,
    pub variant: TemplateVariant,
    /// Intended output path, relative to the working directory
    pub file: String,
    pub reason: String,
}

/// What one folio produced
#[derive(Debug, Default)]
pub struct FolioRenderReport {
    /// Written files, relative to the working directory
    pub documents: Vec<PathBuf>,
    pub failures: Vec<RenderFailure>,
}

/// Template files plus the merge engine, with a per-run cache of loaded templates.
/// Each template is compiled into the engine once, on first use.
pub struct TemplateLibrary {
    template_dir: PathBuf,
    engine: MergeEngine,
    cache: HashMap<PathBuf, DocxTemplate>,
}

fn load_cached<'a>(
    cache: &'a mut HashMap<PathBuf, DocxTemplate>,
    engine: &mut MergeEngine,
    path: PathBuf,
) -> Result<&'a DocxTemplate, DocxError> {
    match cache.entry(path) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let template = DocxTemplate::open(engine, entry.key())?;
            debug!("Loaded template {}", template.source());
            Ok(entry.insert(template))
        }
    }
}

/// First required field that is absent or null
fn missing_required(required: &[String], context: &Value) -> Option<String> {
    required
        .iter()
        .find(|field| context.get(field.as_str()).map_or(true, Value::is_null))
        .cloned()
}

impl TemplateLibrary {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            engine: MergeEngine::new(),
            cache: HashMap::new(),
        }
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Catalog files not present in the template directory
    pub fn missing_files(&self, catalog: &TemplateCatalog) -> Vec<PathBuf> {
        catalog
            .all_files()
            .into_iter()
            .map(|file| self.template_dir.join(file))
            .filter(|path| !path.is_file())
            .collect()
    }

    /// Merge fields referenced by each file variant of a template
    pub fn merge_fields(
        &mut self,
        catalog: &TemplateCatalog,
        template: TemplateId,
    ) -> Result<BTreeMap<TemplateVariant, BTreeSet<String>>, RenderError> {
        let mut fields = BTreeMap::new();
        let Some(def) = catalog.template(template) else {
            return Ok(fields);
        };

        for (variant, file) in &def.files {
            let loaded = load_cached(
                &mut self.cache,
                &mut self.engine,
                self.template_dir.join(file),
            )?;
            fields.insert(*variant, loaded.merge_fields());
        }
        Ok(fields)
    }

    /// Render one job under `working_dir`
    pub fn render_job(
        &mut self,
        catalog: &TemplateCatalog,
        job: &RenderJob,
        working_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        let file = catalog
            .file_for(job.template, job.variant)
            .ok_or(RenderError::NoTemplateFile {
                template: job.template,
                variant: job.variant,
            })?;

        if let Some(def) = catalog.template(job.template) {
            if let Some(field) = missing_required(&def.required_fields, &job.context) {
                return Err(RenderError::MissingField(field));
            }
        }

        let template = load_cached(
            &mut self.cache,
            &mut self.engine,
            self.template_dir.join(file),
        )?;
        let output = working_dir.join(&job.relative_path);
        template.render_to_file(&self.engine, &job.context, &output)?;

        debug!("Rendered {:?}", job.relative_path);
        Ok(output)
    }

    /// Render every document of one folio, continuing past failures
    pub fn render_folio(
        &mut self,
        catalog: &TemplateCatalog,
        case: &CaseRecord,
        ctx: &RenderingContext,
        working_dir: &Path,
    ) -> FolioRenderReport {
        let jobs = plan_jobs(catalog, case, ctx);
        let mut report = FolioRenderReport::default();

        for job in &jobs {
            match self.render_job(catalog, job, working_dir) {
                Ok(_) => report.documents.push(job.relative_path.clone()),
                Err(e) => {
                    warn!(
                        case_id = case.id,
                        folio = %ctx.folder_name,
                        template = %job.template,
                        "Failed to render {:?}: {}",
                        job.relative_path,
                        e
                    );
                    report.failures.push(RenderFailure {
                        folio: ctx.folder_name.clone(),
                        template: job.template,
                        variant: job.variant,
                        file: job.relative_path.to_string_lossy().into_owned(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            case_id = case.id,
            folio = %ctx.folder_name,
            "Rendered {} of {} documents",
            report.documents.len(),
            jobs.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_templates::package::{document_xml, minimal_package};
    use serde_json::json;
    use tempfile::TempDir;

    fn write_template(dir: &Path, name: &str, text: &str) {
        let body = format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text);
        let bytes = minimal_package(&document_xml(&body)).unwrap();
        std::fs::write(dir.join(name), bytes).unwrap();
    }

    fn job(template: TemplateId, context: Value) -> RenderJob {
        RenderJob {
            template,
            variant: TemplateVariant::Base,
            relative_path: PathBuf::from("F_1").join("ISR1_1.docx"),
            context,
        }
    }

    #[test]
    fn test_render_job_writes_file() {
        let templates = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_template(templates.path(), "ISR-1.docx", "Folio {{folio}}");

        let catalog = TemplateCatalog::builtin().unwrap();
        let mut library = TemplateLibrary::new(templates.path());
        let written = library
            .render_job(
                &catalog,
                &job(TemplateId::Isr1, json!({"folio": "F/1", "certificates": []})),
                out.path(),
            )
            .unwrap();

        assert!(written.is_file());
        assert!(written.starts_with(out.path().join("F_1")));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let templates = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_template(templates.path(), "ISR-1.docx", "Folio {{folio}}");

        let catalog = TemplateCatalog::builtin().unwrap();
        let mut library = TemplateLibrary::new(templates.path());
        let err = library
            .render_job(
                &catalog,
                &job(TemplateId::Isr1, json!({"folio": "F/1", "certificates": null})),
                out.path(),
            )
            .unwrap_err();

        assert!(matches!(err, RenderError::MissingField(ref f) if f == "certificates"));
        assert!(!out.path().join("F_1").exists());
    }

    #[test]
    fn test_missing_template_file_fails() {
        let templates = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let catalog = TemplateCatalog::builtin().unwrap();
        let mut library = TemplateLibrary::new(templates.path());
        let err = library
            .render_job(
                &catalog,
                &job(TemplateId::Isr1, json!({"folio": "F/1", "certificates": []})),
                out.path(),
            )
            .unwrap_err();

        assert!(matches!(err, RenderError::Template(DocxError::Io(_))));
        assert_eq!(library.missing_files(&catalog).len(), catalog.all_files().len());
    }

    #[test]
    fn test_merge_fields_per_variant() {
        let templates = TempDir::new().unwrap();
        write_template(
            templates.path(),
            "Form-A-Duplicate.docx",
            "{{folio}} {{companyName}}",
        );
        write_template(
            templates.path(),
            "Form-A-Duplicate-2.docx",
            "{{folio}} {{#each claimants}}{{name}}{{/each}}",
        );

        let catalog = TemplateCatalog::builtin().unwrap();
        let mut library = TemplateLibrary::new(templates.path());
        let fields = library
            .merge_fields(&catalog, TemplateId::FormADuplicate)
            .unwrap();

        let base: Vec<_> = fields[&TemplateVariant::Base].iter().cloned().collect();
        assert_eq!(base, vec!["companyName", "folio"]);
        assert!(fields[&TemplateVariant::Second].contains("claimants"));
        assert!(!fields[&TemplateVariant::Second].contains("name"));
    }
}
