//! Template Catalog
//!
//! Which documents each case type produces, and which `.docx` file backs each
//! document. Loaded once from YAML and shared read-only for the life of the
//! process. Bundles support single inheritance via `extends`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::models::CaseType;

const BUILTIN_CATALOG: &str = include_str!("../../config/case_catalog.yaml");

/// Longest `extends` chain accepted
pub const MAX_INHERITANCE_DEPTH: usize = 10;

/// Every document the registrar can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    Isr1,
    Isr2,
    Isr3,
    Isr4,
    Isr5,
    Sh13,
    Sh14,
    Affidavit,
    FormADuplicate,
    FormBDuplicate,
    AnnexureD,
    AnnexureE,
    AnnexureF,
    Deletion,
}

impl TemplateId {
    pub fn all() -> &'static [TemplateId] {
        &[
            TemplateId::Isr1,
            TemplateId::Isr2,
            TemplateId::Isr3,
            TemplateId::Isr4,
            TemplateId::Isr5,
            TemplateId::Sh13,
            TemplateId::Sh14,
            TemplateId::Affidavit,
            TemplateId::FormADuplicate,
            TemplateId::FormBDuplicate,
            TemplateId::AnnexureD,
            TemplateId::AnnexureE,
            TemplateId::AnnexureF,
            TemplateId::Deletion,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Isr1 => "isr1",
            TemplateId::Isr2 => "isr2",
            TemplateId::Isr3 => "isr3",
            TemplateId::Isr4 => "isr4",
            TemplateId::Isr5 => "isr5",
            TemplateId::Sh13 => "sh13",
            TemplateId::Sh14 => "sh14",
            TemplateId::Affidavit => "affidavit",
            TemplateId::FormADuplicate => "form-a-duplicate",
            TemplateId::FormBDuplicate => "form-b-duplicate",
            TemplateId::AnnexureD => "annexure-d",
            TemplateId::AnnexureE => "annexure-e",
            TemplateId::AnnexureF => "annexure-f",
            TemplateId::Deletion => "deletion",
        }
    }

    /// File variants a catalog entry must provide for this document
    pub fn required_variants(&self) -> &'static [TemplateVariant] {
        match self {
            TemplateId::Affidavit => &[TemplateVariant::Shareholder, TemplateVariant::LegalHeir],
            TemplateId::FormADuplicate | TemplateId::FormBDuplicate => {
                &[TemplateVariant::Base, TemplateVariant::Second]
            }
            _ => &[TemplateVariant::Base],
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateId::all()
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown template '{}'", s))
    }
}

/// Which physical file of a template a render uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateVariant {
    Base,
    /// Alternate layout used by transmission duplicate cases
    Second,
    Shareholder,
    LegalHeir,
}

impl TemplateVariant {
    /// Appended to the output stem so variants rendered side by side do not collide
    pub fn output_suffix(&self) -> &'static str {
        match self {
            TemplateVariant::Base | TemplateVariant::Second => "",
            TemplateVariant::Shareholder => "_Shareholder",
            TemplateVariant::LegalHeir => "_Legal_Heir",
        }
    }
}

/// A document definition from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TemplateDef {
    pub id: TemplateId,
    pub display_name: String,
    /// Stem of the generated file names
    pub output_name: String,
    /// Template file per variant, relative to the template directory
    pub files: BTreeMap<TemplateVariant, String>,
    /// Context keys that must be present (and not null) for a render to proceed
    #[serde(default)]
    pub required_fields: Vec<String>,
}

/// A named document set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BundleDef {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub documents: Vec<TemplateId>,
}

/// YAML file structure for the catalog
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CatalogFile {
    #[serde(default)]
    templates: Vec<TemplateDef>,
    #[serde(default)]
    bundles: Vec<BundleDef>,
    #[serde(default)]
    case_types: BTreeMap<CaseType, String>,
}

/// Validated catalog with bundle inheritance resolved
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: HashMap<TemplateId, TemplateDef>,
    bundles: HashMap<String, BundleDef>,
    case_types: HashMap<CaseType, String>,
    resolved_cache: HashMap<String, Vec<TemplateId>>,
}

impl TemplateCatalog {
    /// The catalog compiled into the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    /// Load an override catalog from disk
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_yaml_str(&content)?;
        info!(
            "Loaded catalog with {} templates and {} bundles from {:?}",
            catalog.templates.len(),
            catalog.bundles.len(),
            path
        );
        Ok(catalog)
    }

    /// Override file when given, built-in catalog otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load_file(path),
            None => Self::builtin(),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_yaml::from_str(content)?;

        let mut templates = HashMap::new();
        for def in file.templates {
            for variant in def.id.required_variants() {
                if !def.files.contains_key(variant) {
                    return Err(CatalogError::MissingVariant {
                        template: def.id,
                        variant: *variant,
                    });
                }
            }
            let id = def.id;
            if templates.insert(id, def).is_some() {
                return Err(CatalogError::DuplicateTemplate(id));
            }
        }

        let mut bundles = HashMap::new();
        for bundle in file.bundles {
            if let Some(missing) = bundle
                .documents
                .iter()
                .find(|doc| !templates.contains_key(*doc))
            {
                return Err(CatalogError::UnknownTemplate {
                    bundle: bundle.id.clone(),
                    template: *missing,
                });
            }
            debug!("Loaded bundle: {}", bundle.id);
            bundles.insert(bundle.id.clone(), bundle);
        }

        let mut catalog = Self {
            templates,
            bundles,
            case_types: HashMap::new(),
            resolved_cache: HashMap::new(),
        };
        catalog.build_resolved_cache()?;

        for case_type in CaseType::all() {
            let bundle_id = file
                .case_types
                .get(case_type)
                .ok_or(CatalogError::UnmappedCaseType(*case_type))?;
            if !catalog.bundles.contains_key(bundle_id) {
                return Err(CatalogError::UnknownBundle {
                    bundle: bundle_id.clone(),
                    referenced_by: case_type.to_string(),
                });
            }
            catalog.case_types.insert(*case_type, bundle_id.clone());
        }

        Ok(catalog)
    }

    /// Ordered documents a case type generates
    pub fn templates_for(&self, case_type: CaseType) -> &[TemplateId] {
        self.case_types
            .get(&case_type)
            .and_then(|bundle_id| self.resolved_cache.get(bundle_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn bundle_for(&self, case_type: CaseType) -> Option<&BundleDef> {
        self.case_types
            .get(&case_type)
            .and_then(|bundle_id| self.bundles.get(bundle_id))
    }

    pub fn template(&self, id: TemplateId) -> Option<&TemplateDef> {
        self.templates.get(&id)
    }

    /// Template definitions in `TemplateId` order
    pub fn templates(&self) -> Vec<&TemplateDef> {
        let mut defs: Vec<_> = self.templates.values().collect();
        defs.sort_by_key(|def| def.id);
        defs
    }

    pub fn file_for(&self, id: TemplateId, variant: TemplateVariant) -> Option<&str> {
        self.templates
            .get(&id)
            .and_then(|def| def.files.get(&variant))
            .map(String::as_str)
    }

    /// Every template file the catalog refers to, deduplicated and sorted
    pub fn all_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = self
            .templates
            .values()
            .flat_map(|def| def.files.values().map(String::as_str))
            .collect();
        files.sort_unstable();
        files.dedup();
        files
    }

    fn build_resolved_cache(&mut self) -> Result<(), CatalogError> {
        let bundle_ids: Vec<String> = self.bundles.keys().cloned().collect();

        for bundle_id in bundle_ids {
            let resolved = self.resolve_inheritance(&bundle_id)?;
            self.resolved_cache.insert(bundle_id, resolved);
        }

        Ok(())
    }

    /// Ancestor documents first, then the bundle's own; first occurrence wins
    fn resolve_inheritance(&self, bundle_id: &str) -> Result<Vec<TemplateId>, CatalogError> {
        let mut chain = Vec::new();
        let mut current_id = Some(bundle_id.to_string());
        let mut visited = HashSet::new();

        while let Some(id) = current_id {
            if !visited.insert(id.clone()) {
                return Err(CatalogError::CircularInheritance(bundle_id.to_string()));
            }

            let bundle = self
                .bundles
                .get(&id)
                .ok_or_else(|| CatalogError::UnknownBundle {
                    bundle: id.clone(),
                    referenced_by: bundle_id.to_string(),
                })?;

            chain.push(bundle);
            current_id = bundle.extends.clone();

            if chain.len() > MAX_INHERITANCE_DEPTH {
                return Err(CatalogError::InheritanceTooDeep(bundle_id.to_string()));
            }
        }

        let mut seen = HashSet::new();
        let documents = chain
            .iter()
            .rev()
            .flat_map(|bundle| bundle.documents.iter().copied())
            .filter(|doc| seen.insert(*doc))
            .collect();

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TemplateId::*;

    const BASE: [TemplateId; 7] = [Isr1, Isr2, Isr3, Isr4, Sh13, Sh14, Affidavit];

    fn with_base(extra: &[TemplateId]) -> Vec<TemplateId> {
        BASE.iter().chain(extra.iter()).copied().collect()
    }

    #[test]
    fn test_builtin_membership() {
        let catalog = TemplateCatalog::builtin().unwrap();

        let expected = [
            (CaseType::Claim, with_base(&[])),
            (CaseType::ClaimTransposition, with_base(&[])),
            (
                CaseType::ClaimIssueDuplicate,
                with_base(&[FormADuplicate, FormBDuplicate]),
            ),
            (
                CaseType::Transmission,
                with_base(&[Isr5, AnnexureD, AnnexureE, AnnexureF]),
            ),
            (
                CaseType::TransmissionIssueDuplicate,
                with_base(&[
                    Isr5,
                    AnnexureD,
                    AnnexureE,
                    AnnexureF,
                    FormADuplicate,
                    FormBDuplicate,
                ]),
            ),
            (
                CaseType::TransmissionIssueDuplicateTransposition,
                with_base(&[
                    Isr5,
                    AnnexureD,
                    AnnexureE,
                    AnnexureF,
                    FormADuplicate,
                    FormBDuplicate,
                ]),
            ),
            (CaseType::Deletion, with_base(&[Deletion])),
            (
                CaseType::DeletionIssueDuplicate,
                with_base(&[Deletion, FormADuplicate, FormBDuplicate]),
            ),
            (
                CaseType::DeletionIssueDuplicateTransposition,
                with_base(&[Deletion, FormADuplicate, FormBDuplicate]),
            ),
        ];

        assert_eq!(expected.len(), CaseType::all().len());
        for (case_type, templates) in expected {
            assert_eq!(
                catalog.templates_for(case_type),
                templates.as_slice(),
                "membership for {}",
                case_type
            );
        }
    }

    #[test]
    fn test_builtin_files() {
        let catalog = TemplateCatalog::builtin().unwrap();
        for id in TemplateId::all() {
            let def = catalog.template(*id).unwrap();
            for variant in id.required_variants() {
                assert!(def.files.contains_key(variant));
            }
        }
        assert_eq!(
            catalog.file_for(FormADuplicate, TemplateVariant::Second),
            Some("Form-A-Duplicate-2.docx")
        );
        assert_eq!(catalog.file_for(Isr1, TemplateVariant::Second), None);
    }

    #[test]
    fn test_template_id_parse() {
        assert_eq!("annexure-d".parse::<TemplateId>().unwrap(), AnnexureD);
        assert_eq!("ISR1".parse::<TemplateId>().unwrap(), Isr1);
        assert!("isr9".parse::<TemplateId>().is_err());
    }

    #[test]
    fn test_missing_variant_rejected() {
        let yaml = r#"
templates:
  - id: affidavit
    display-name: Affidavit
    output-name: Affidavit
    files:
      shareholder: a.docx
"#;
        let err = TemplateCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::MissingVariant {
                template: TemplateId::Affidavit,
                variant: TemplateVariant::LegalHeir
            }
        ));
    }

    #[test]
    fn test_circular_inheritance_rejected() {
        let yaml = r#"
templates:
  - id: isr1
    display-name: ISR1
    output-name: ISR1
    files: { base: ISR-1.docx }
bundles:
  - id: a
    display-name: A
    extends: b
    documents: [isr1]
  - id: b
    display-name: B
    extends: a
"#;
        let err = TemplateCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::CircularInheritance(_)));
    }

    #[test]
    fn test_unmapped_case_type_rejected() {
        let yaml = r#"
templates:
  - id: isr1
    display-name: ISR1
    output-name: ISR1
    files: { base: ISR-1.docx }
bundles:
  - id: only
    display-name: Only
    documents: [isr1]
case-types:
  Claim: only
"#;
        let err = TemplateCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnmappedCaseType(CaseType::ClaimTransposition)
        ));
    }

    #[test]
    fn test_undefined_template_rejected() {
        let yaml = r#"
bundles:
  - id: only
    display-name: Only
    documents: [isr1]
"#;
        let err = TemplateCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTemplate { .. }));
    }
}
