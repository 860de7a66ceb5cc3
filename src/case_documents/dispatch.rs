//! Template dispatch
//!
//! Every template has exactly one instancing strategy. `plan_jobs` expands a
//! folio's rendering context into the concrete files that folio produces.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::assembler::RenderingContext;
use super::catalog::{TemplateCatalog, TemplateId, TemplateVariant};
use crate::models::{CaseRecord, CaseType};

/// How many files a template yields per folio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instancing {
    /// One file per folio
    PerFolio,
    /// One file per project legal heir, in a subfolder; the heir is left out of `legalHeirDetails`
    PerLegalHeir,
    /// One file per claimant, in a subfolder
    PerClaimant,
    /// One file per nominee or affidavit party
    PerParty,
}

impl TemplateId {
    pub fn instancing(&self) -> Instancing {
        match self {
            TemplateId::Isr1
            | TemplateId::Isr2
            | TemplateId::Isr3
            | TemplateId::Isr4
            | TemplateId::FormADuplicate
            | TemplateId::FormBDuplicate
            | TemplateId::AnnexureE
            | TemplateId::AnnexureF
            | TemplateId::Deletion => Instancing::PerFolio,
            TemplateId::AnnexureD => Instancing::PerLegalHeir,
            TemplateId::Isr5 => Instancing::PerClaimant,
            TemplateId::Sh13 | TemplateId::Sh14 | TemplateId::Affidavit => Instancing::PerParty,
        }
    }
}

/// Form A/B duplicate layout: the second variant belongs to transmission duplicates only
pub fn duplicate_variant(case_type: CaseType) -> TemplateVariant {
    match case_type {
        CaseType::TransmissionIssueDuplicate => TemplateVariant::Second,
        _ => TemplateVariant::Base,
    }
}

/// One file to render
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub template: TemplateId,
    pub variant: TemplateVariant,
    /// Output path relative to the run's working directory
    pub relative_path: PathBuf,
    pub context: Value,
}

/// A set of parties rendered with one template variant
struct PartyGroup<'a> {
    variant: TemplateVariant,
    parties: &'a [Value],
    /// Party field holding the shareholder id used for the certificate name lookup
    holder_key: Option<&'static str>,
}

fn party_groups<'a>(
    template: TemplateId,
    case: &CaseRecord,
    ctx: &'a RenderingContext,
) -> Vec<PartyGroup<'a>> {
    match template {
        TemplateId::Sh13 | TemplateId::Sh14 => vec![PartyGroup {
            variant: TemplateVariant::Base,
            parties: ctx.list("nominations"),
            holder_key: Some("shareholderId"),
        }],
        TemplateId::Affidavit => {
            if !case.allows_affidavit() {
                return Vec::new();
            }
            let mut groups = vec![PartyGroup {
                variant: TemplateVariant::Shareholder,
                parties: ctx.list("affidavitShareholders"),
                holder_key: Some("id"),
            }];
            if case.case_type.is_transmission() {
                groups.push(PartyGroup {
                    variant: TemplateVariant::LegalHeir,
                    parties: ctx.list("affidavitLegalHeirs"),
                    holder_key: None,
                });
            }
            groups
        }
        _ => Vec::new(),
    }
}

/// Name printed on the certificate for the shareholder with this id
fn certificate_name_for(ctx: &RenderingContext, shareholder_id: Option<i64>) -> Value {
    let name = shareholder_id.and_then(|id| {
        ctx.list("shareHolderDetails")
            .iter()
            .find(|holder| holder.get("id").and_then(Value::as_i64) == Some(id))
            .and_then(|holder| holder.get("certificateHolderName").cloned())
    });
    name.unwrap_or_else(|| Value::String(String::new()))
}

fn overlay_of(record: &Value) -> Map<String, Value> {
    record.as_object().cloned().unwrap_or_default()
}

/// Expand one folio's context into render jobs, in catalog order
pub fn plan_jobs(
    catalog: &TemplateCatalog,
    case: &CaseRecord,
    ctx: &RenderingContext,
) -> Vec<RenderJob> {
    let folder = PathBuf::from(&ctx.folder_name);
    let mut jobs = Vec::new();

    for template in catalog.templates_for(case.case_type) {
        let Some(def) = catalog.template(*template) else {
            warn!("Template {} has no catalog entry, skipping", template);
            continue;
        };
        let stem = def.output_name.as_str();

        match template.instancing() {
            Instancing::PerFolio => {
                let variant = match template {
                    TemplateId::FormADuplicate | TemplateId::FormBDuplicate => {
                        duplicate_variant(case.case_type)
                    }
                    _ => TemplateVariant::Base,
                };
                jobs.push(RenderJob {
                    template: *template,
                    variant,
                    relative_path: folder.join(format!("{}_{}.docx", stem, ctx.folio_index)),
                    context: Value::Object(ctx.fields().clone()),
                });
            }

            Instancing::PerLegalHeir => {
                let heirs = ctx.list("legalHeirDetails");
                for (idx, heir) in heirs.iter().enumerate() {
                    let heir_id = heir.get("id").and_then(Value::as_i64);
                    let others: Vec<Value> = heirs
                        .iter()
                        .filter(|other| other.get("id").and_then(Value::as_i64) != heir_id)
                        .cloned()
                        .collect();

                    let mut overlay = overlay_of(heir);
                    overlay.insert("legalHeirDetails".to_string(), Value::Array(others));
                    jobs.push(RenderJob {
                        template: *template,
                        variant: TemplateVariant::Base,
                        relative_path: folder
                            .join(stem)
                            .join(format!("{}_{}.docx", stem, idx + 1)),
                        context: Value::Object(ctx.merged_with(&overlay)),
                    });
                }
            }

            Instancing::PerClaimant => {
                for (idx, claimant) in ctx.list("claimants").iter().enumerate() {
                    jobs.push(RenderJob {
                        template: *template,
                        variant: TemplateVariant::Base,
                        relative_path: folder
                            .join(stem)
                            .join(format!("{}_{}.docx", stem, idx + 1)),
                        context: Value::Object(ctx.merged_with(&overlay_of(claimant))),
                    });
                }
            }

            Instancing::PerParty => {
                for group in party_groups(*template, case, ctx) {
                    for (idx, party) in group.parties.iter().enumerate() {
                        let holder_id = group
                            .holder_key
                            .and_then(|key| party.get(key))
                            .and_then(Value::as_i64);

                        let mut overlay = overlay_of(party);
                        overlay.insert(
                            "shareholderCertificateName".to_string(),
                            certificate_name_for(ctx, holder_id),
                        );
                        jobs.push(RenderJob {
                            template: *template,
                            variant: group.variant,
                            relative_path: folder.join(format!(
                                "{}{}_{}_{}.docx",
                                stem,
                                group.variant.output_suffix(),
                                ctx.folio_index,
                                idx + 1
                            )),
                            context: Value::Object(ctx.merged_with(&overlay)),
                        });
                    }
                }
            }
        }
    }

    jobs
}
