//! Shared fixtures for pipeline integration tests
//!
//! Builds a template directory with a minimal .docx for every catalog file
//! and an in-memory registrar with one folio of a single claim case.

#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use docx_templates::package::{document_xml, minimal_package};
use rust_decimal::Decimal;
use tempfile::TempDir;
use zip::ZipArchive;

use rta_cases::case_documents::{CaseDocumentService, TemplateCatalog};
use rta_cases::config::PipelineConfig;
use rta_cases::models::{
    CaseRecord, CaseType, Certificate, CompanyMaster, CompanyNameChange, Folio, Nomination,
    SecurityMaster, ShareHolderDetail,
};
use rta_cases::store::InMemoryStore;

/// Merge fields every fixture template prints after its file name
pub const FIXTURE_FIELDS: &str = "{{folio}}|{{companyName}}|{{name}}|{{nomineeName}}|{{shareholderCertificateName}}|{{combinedTotalNoOfSharesWords}}";

pub struct Fixture {
    pub root: TempDir,
    pub template_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Fixture {
    /// Template directory populated for the built-in catalog
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let template_dir = root.path().join("templates");
        let output_dir = root.path().join("out");
        std::fs::create_dir_all(&template_dir).unwrap();

        let catalog = TemplateCatalog::builtin().unwrap();
        for file in catalog.all_files() {
            write_template(&template_dir, file);
        }

        Self {
            root,
            template_dir,
            output_dir,
        }
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::new(&self.template_dir, &self.output_dir)
    }

    pub fn service(&self, store: InMemoryStore) -> CaseDocumentService {
        let store = Arc::new(store);
        CaseDocumentService::new(
            store.clone(),
            store,
            Arc::new(TemplateCatalog::builtin().unwrap()),
            self.config(),
        )
    }

    /// Entries currently in the output directory
    pub fn output_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.output_dir)
            .map(|dir| {
                dir.filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Write a one-paragraph template that prints its own file name and the fixture fields
pub fn write_template(dir: &Path, file: &str) {
    let text = format!("{}|{}", file, FIXTURE_FIELDS);
    let body = format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text);
    let bytes = minimal_package(&document_xml(&body)).unwrap();
    std::fs::write(dir.join(file), bytes).unwrap();
}

/// File entries of an archive, sorted, directories left out
pub fn archive_files(archive: &Path) -> Vec<String> {
    let zip = ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut names: Vec<String> = zip
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_string)
        .collect();
    names.sort();
    names
}

pub fn read_entry(archive: &Path, entry: &str) -> Vec<u8> {
    let mut zip = ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut file = zip.by_name(entry).unwrap();
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).unwrap();
    bytes
}

/// `word/document.xml` of a generated document inside the archive
pub fn document_text(archive: &Path, entry: &str) -> String {
    let docx = read_entry(archive, entry);
    let mut inner = ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut part = inner.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

pub fn shareholder(id: i64, name: &str) -> ShareHolderDetail {
    ShareHolderDetail {
        id,
        name: Some(name.to_string()),
        pan: Some("ABCDE1234F".to_string()),
        dob: NaiveDate::from_ymd_opt(1950, 6, 1),
        ..Default::default()
    }
}

pub fn certificate(id: i64, shares: &str, holder: &str) -> Certificate {
    Certificate {
        id,
        folio_id: 1,
        certificate_no: Some(format!("C-{}", id)),
        distinctive_no_from: Some(format!("{}001", id)),
        distinctive_no_to: Some(format!("{}100", id)),
        face_value: Some(Decimal::new(10, 0)),
        no_of_shares: Some(shares.to_string()),
        allotment_date: NaiveDate::from_ymd_opt(1995, 4, 1),
        holder_name1: Some(holder.to_string()),
        ..Default::default()
    }
}

/// A claim case: one folio, two certificates, one nomination, one affidavit shareholder
pub fn claim_case(case_type: CaseType) -> CaseRecord {
    let mut case = CaseRecord::new(1, case_type);
    case.case_number = Some("RTA/2024/0001".to_string());
    case.folios = Some("1".to_string());
    case.select_nomination = Some("30".to_string());
    case.select_affidavit_shareholder = Some("10".to_string());
    case.allow_affidavit = Some("Yes".to_string());
    case
}

/// Registrar data behind [`claim_case`]
pub fn claim_store(case: CaseRecord) -> InMemoryStore {
    InMemoryStore::new()
        .with_case(case)
        .with_folio(Folio {
            id: 1,
            folio: "INE/001".to_string(),
            security_id: Some(3),
            shareholder_name1: Some(10),
            certificates: vec![
                certificate(1, "100", "R KUMAR"),
                certificate(2, "50", "RAJESH KUMAR"),
            ],
            ..Default::default()
        })
        .with_shareholder(shareholder(10, "Rajesh Kumar"))
        .with_security(SecurityMaster {
            id: 3,
            company_id: Some(4),
            project_id: Some(77),
            isin: Some("INE000A01010".to_string()),
            security_type: Some("Equity".to_string()),
        })
        .with_company(CompanyMaster {
            id: 4,
            cin: Some("L00000MH1990PLC000000".to_string()),
            rta_name: Some("Registrar Services".to_string()),
            name_changes: vec![CompanyNameChange {
                id: 1,
                current_name: Some("Acme Ltd".to_string()),
                previous_name: Some("Acme Industries".to_string()),
                date_of_change: NaiveDate::from_ymd_opt(2005, 8, 1),
            }],
            ..Default::default()
        })
        .with_nomination(Nomination {
            id: 30,
            shareholder_id: Some(10),
            nominee_name: Some("Kiran Kumar".to_string()),
            relation: Some("Son".to_string()),
            ..Default::default()
        })
}
