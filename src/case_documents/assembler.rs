//! Payload Assembler
//!
//! Turns a case snapshot into one flat rendering context per folio. Keys are
//! the merge-field names template designers use, so they stay camelCase and
//! some historical spellings (`non_clamaints`) are kept alongside the fixed ones.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::number_words::number_in_words;
use crate::models::{
    is_yes, CaseRecord, Certificate, CompanyMaster, Folio, LegalHeirDetail, Nomination,
    SecurityMaster, ShareHolderDetail,
};

/// Date format printed on every generated document
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Everything one folio needs, read at the start of a run
#[derive(Debug, Clone, Default)]
pub struct FolioSnapshot {
    pub folio: Folio,
    /// Shareholders in slots 1..=3
    pub slots: [Option<ShareHolderDetail>; 3],
    pub security: Option<SecurityMaster>,
    pub company: Option<CompanyMaster>,
    /// Every legal heir of the security's project
    pub legal_heirs: Vec<LegalHeirDetail>,
}

/// Read-only view of a case and everything it references
#[derive(Debug, Clone)]
pub struct CaseSnapshot {
    pub case: CaseRecord,
    /// In the order of the case's folio list
    pub folios: Vec<FolioSnapshot>,
    pub claimants: Vec<LegalHeirDetail>,
    pub affidavit_shareholders: Vec<ShareHolderDetail>,
    pub affidavit_legal_heirs: Vec<LegalHeirDetail>,
    pub nominations: Vec<Nomination>,
}

impl CaseSnapshot {
    pub fn new(case: CaseRecord) -> Self {
        Self {
            case,
            folios: Vec::new(),
            claimants: Vec::new(),
            affidavit_shareholders: Vec::new(),
            affidavit_legal_heirs: Vec::new(),
            nominations: Vec::new(),
        }
    }
}

/// Merge data for every document of one folio
#[derive(Debug, Clone)]
pub struct RenderingContext {
    /// 1-based position of the folio within the case
    pub folio_index: usize,
    /// Directory the folio's documents are written to
    pub folder_name: String,
    fields: Map<String, Value>,
}

impl RenderingContext {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Array-valued field, empty when absent
    pub fn list(&self, key: &str) -> &[Value] {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn flag(&self, key: &str) -> bool {
        self.fields.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Copy of the fields with `overlay` merged on top
    pub fn merged_with(&self, overlay: &Map<String, Value>) -> Map<String, Value> {
        let mut merged = self.fields.clone();
        for (key, value) in overlay {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// ISO date string to `DD-MM-YYYY`; anything unparsable passes through
fn format_date_value(value: &Value) -> Value {
    match value {
        Value::String(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Value::String(date.format(DATE_FORMAT).to_string()),
            Err(_) => value.clone(),
        },
        Value::Null => Value::String(String::new()),
        other => other.clone(),
    }
}

/// Serialise a record into merge fields: dates formatted, Yes/No flags as booleans
pub fn record_fields<T: Serialize>(
    record: &T,
    date_fields: &[&str],
    flag_fields: &[&str],
) -> Map<String, Value> {
    let mut fields = match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    for key in date_fields {
        if let Some(value) = fields.get_mut(*key) {
            *value = format_date_value(value);
        }
    }
    for key in flag_fields {
        if let Some(value) = fields.get_mut(*key) {
            *value = Value::Bool(is_yes(value.as_str()));
        }
    }

    fields
}

/// Records as an array of objects with a 1-based `index`
fn indexed<T: Serialize>(records: &[T], date_fields: &[&str], flag_fields: &[&str]) -> Value {
    Value::Array(
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let mut fields = record_fields(record, date_fields, flag_fields);
                fields.insert("index".to_string(), json!(idx + 1));
                Value::Object(fields)
            })
            .collect(),
    )
}

fn legal_heir_list(heirs: &[LegalHeirDetail]) -> Value {
    indexed(
        heirs,
        LegalHeirDetail::DATE_FIELDS,
        LegalHeirDetail::FLAG_FIELDS,
    )
}

fn string_or_empty(value: Option<&str>) -> Value {
    Value::String(value.unwrap_or("").to_string())
}

fn certificate_fields(certificates: &[Certificate]) -> Value {
    Value::Array(
        certificates
            .iter()
            .enumerate()
            .map(|(idx, cert)| {
                let mut fields =
                    record_fields(cert, Certificate::DATE_FIELDS, Certificate::FLAG_FIELDS);
                fields.insert("index".to_string(), json!(idx + 1));
                fields.insert(
                    "distinctiveNos".to_string(),
                    Value::String(cert.distinctive_nos()),
                );
                fields.insert(
                    "allotmentYear".to_string(),
                    Value::String(
                        cert.allotment_date
                            .map(|date| date.format("%Y").to_string())
                            .unwrap_or_default(),
                    ),
                );
                Value::Object(fields)
            })
            .collect(),
    )
}

fn insert_share_totals(fields: &mut Map<String, Value>, certificates: &[Certificate]) {
    // Saturates on absurd free-text counts; the words field is then empty
    let total = certificates
        .iter()
        .map(Certificate::share_count)
        .fold(0u64, u64::saturating_add);
    let words = number_in_words(&total.to_string());

    fields.insert("certificateCount".to_string(), json!(certificates.len()));
    fields.insert("grandTotalNoOfShares".to_string(), json!(total));
    fields.insert("combinedTotalNoOfShares".to_string(), json!(total));
    fields.insert(
        "combinedTotalNoOfSharesWords".to_string(),
        words.map(Value::String).unwrap_or(Value::Null),
    );
    fields.insert(
        "combinedTotalFaceValue".to_string(),
        Value::String(
            certificates
                .first()
                .and_then(|cert| cert.face_value)
                .map(|value| value.normalize().to_string())
                .unwrap_or_else(|| "0".to_string()),
        ),
    );
}

fn insert_company_fields(fields: &mut Map<String, Value>, snapshot: &FolioSnapshot) {
    let company = snapshot.company.as_ref();
    let security = snapshot.security.as_ref();

    fields.insert(
        "companyName".to_string(),
        Value::String(company.map(CompanyMaster::display_name).unwrap_or_default()),
    );
    fields.insert(
        "previousCompanyName".to_string(),
        Value::String(company.map(CompanyMaster::previous_name).unwrap_or_default()),
    );
    fields.insert(
        "companyCin".to_string(),
        string_or_empty(company.and_then(|c| c.cin.as_deref())),
    );
    fields.insert(
        "companyAddress".to_string(),
        string_or_empty(company.and_then(|c| c.registered_office.as_deref())),
    );
    fields.insert(
        "rtaName".to_string(),
        string_or_empty(company.and_then(|c| c.rta_name.as_deref())),
    );
    fields.insert(
        "rtaAddress".to_string(),
        string_or_empty(company.and_then(|c| c.rta_address.as_deref())),
    );
    fields.insert(
        "rtaContact".to_string(),
        string_or_empty(company.and_then(|c| c.rta_contact.as_deref())),
    );
    fields.insert(
        "rtaEmail".to_string(),
        string_or_empty(company.and_then(|c| c.rta_email.as_deref())),
    );
    fields.insert(
        "isin".to_string(),
        string_or_empty(security.and_then(|s| s.isin.as_deref())),
    );
    fields.insert(
        "securityType".to_string(),
        string_or_empty(security.and_then(|s| s.security_type.as_deref())),
    );
}

/// Flatten slot holders into `<field>_<slot>` keys and build `shareHolderDetails`.
///
/// Descriptors are prepended, so the list runs from slot 3 down to slot 1.
fn insert_slot_fields(fields: &mut Map<String, Value>, snapshot: &FolioSnapshot) -> Vec<Value> {
    let mut descriptors: Vec<Value> = Vec::new();
    let last_certificate = snapshot.folio.certificates.last();

    for slot in 1..=Folio::SLOTS {
        let holder = snapshot.slots.get(slot - 1).and_then(Option::as_ref);
        let Some(holder) = holder else {
            fields.insert(format!("hasShareholder_{}", slot), Value::Bool(false));
            continue;
        };

        let holder_fields = record_fields(
            holder,
            ShareHolderDetail::DATE_FIELDS,
            ShareHolderDetail::FLAG_FIELDS,
        );
        for (key, value) in &holder_fields {
            fields.insert(format!("{}_{}", key, slot), value.clone());
        }
        fields.insert(format!("hasShareholder_{}", slot), Value::Bool(true));

        let mut descriptor = holder_fields;
        descriptor.insert("slot".to_string(), json!(slot));
        descriptor.insert(
            "certificateHolderName".to_string(),
            string_or_empty(last_certificate.and_then(|cert| cert.holder_name(slot))),
        );
        descriptors.insert(0, Value::Object(descriptor));
    }

    descriptors
}

fn id_of(value: &Value) -> Option<i64> {
    value.get("id").and_then(Value::as_i64)
}

fn assemble_folio(
    case: &CaseRecord,
    case_fields: &Map<String, Value>,
    snapshot: &CaseSnapshot,
    folio_snapshot: &FolioSnapshot,
    folio_index: usize,
    generated_on: NaiveDate,
) -> RenderingContext {
    let folio = &folio_snapshot.folio;
    let mut fields = case_fields.clone();

    fields.insert("caseId".to_string(), json!(case.id));
    fields.insert("folioId".to_string(), json!(folio.id));
    fields.insert("folioIndex".to_string(), json!(folio_index));
    fields.insert("folio".to_string(), Value::String(folio.folio.clone()));
    fields.insert(
        "generatedOn".to_string(),
        Value::String(generated_on.format(DATE_FORMAT).to_string()),
    );

    fields.insert(
        "certificates".to_string(),
        certificate_fields(&folio.certificates),
    );
    insert_share_totals(&mut fields, &folio.certificates);
    insert_company_fields(&mut fields, folio_snapshot);

    let holders = insert_slot_fields(&mut fields, folio_snapshot);
    let dead_id = case.dead_shareholder_id();
    let survivors: Vec<Value> = holders
        .iter()
        .filter(|holder| dead_id.is_none() || id_of(holder) != dead_id)
        .cloned()
        .collect();
    fields.insert("shareHolderDetails".to_string(), Value::Array(holders));
    fields.insert("survivors".to_string(), Value::Array(survivors));

    let claimant_ids: HashSet<i64> = snapshot.claimants.iter().map(|c| c.id).collect();
    let non_claimants: Vec<LegalHeirDetail> = folio_snapshot
        .legal_heirs
        .iter()
        .filter(|heir| !claimant_ids.contains(&heir.id))
        .cloned()
        .collect();
    let non_claimants = legal_heir_list(&non_claimants);
    fields.insert("non_clamaints".to_string(), non_claimants.clone());
    fields.insert("non_claimants".to_string(), non_claimants);

    fields.insert(
        "claimants".to_string(),
        legal_heir_list(&snapshot.claimants),
    );
    fields.insert(
        "affidavitShareholders".to_string(),
        indexed(
            &snapshot.affidavit_shareholders,
            ShareHolderDetail::DATE_FIELDS,
            ShareHolderDetail::FLAG_FIELDS,
        ),
    );
    fields.insert(
        "affidavitLegalHeirs".to_string(),
        legal_heir_list(&snapshot.affidavit_legal_heirs),
    );
    fields.insert(
        "nominations".to_string(),
        indexed(
            &snapshot.nominations,
            Nomination::DATE_FIELDS,
            Nomination::FLAG_FIELDS,
        ),
    );
    fields.insert(
        "legalHeirDetails".to_string(),
        legal_heir_list(&folio_snapshot.legal_heirs),
    );

    RenderingContext {
        folio_index,
        folder_name: folio.folder_name(),
        fields,
    }
}

/// Folios whose labels map to the same folder get `_<folioIndex>` appended
fn disambiguate_folders(contexts: &mut [RenderingContext]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for ctx in contexts.iter() {
        *counts.entry(ctx.folder_name.clone()).or_default() += 1;
    }
    let mut taken: HashSet<String> = counts.keys().cloned().collect();

    for ctx in contexts.iter_mut() {
        if counts.get(&ctx.folder_name).copied().unwrap_or(0) < 2 {
            continue;
        }
        let mut name = format!("{}_{}", ctx.folder_name, ctx.folio_index);
        while !taken.insert(name.clone()) {
            name = format!("{}_{}", name, ctx.folio_index);
        }
        warn!(
            "Folio folder {:?} is shared by several folios, using {:?}",
            ctx.folder_name, name
        );
        ctx.folder_name = name;
    }
}

/// Build one rendering context per folio, in case folio order
pub fn assemble(snapshot: &CaseSnapshot, generated_on: NaiveDate) -> Vec<RenderingContext> {
    let case = &snapshot.case;
    let case_fields = record_fields(case, CaseRecord::DATE_FIELDS, CaseRecord::FLAG_FIELDS);

    let mut contexts: Vec<RenderingContext> = snapshot
        .folios
        .iter()
        .enumerate()
        .map(|(idx, folio)| {
            assemble_folio(case, &case_fields, snapshot, folio, idx + 1, generated_on)
        })
        .collect();
    disambiguate_folders(&mut contexts);

    debug!(
        case_id = case.id,
        folios = contexts.len(),
        "Assembled rendering contexts"
    );
    contexts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseType, CompanyNameChange, DeadShareholder};
    use rust_decimal::Decimal;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn cert(shares: &str) -> Certificate {
        Certificate {
            no_of_shares: Some(shares.to_string()),
            ..Default::default()
        }
    }

    fn holder(id: i64, name: &str) -> ShareHolderDetail {
        ShareHolderDetail {
            id,
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn heir(id: i64, name: &str) -> LegalHeirDetail {
        LegalHeirDetail {
            id,
            project_id: Some(7),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn single_folio(folio: FolioSnapshot, case: CaseRecord) -> RenderingContext {
        let mut snapshot = CaseSnapshot::new(case);
        snapshot.folios.push(folio);
        assemble(&snapshot, today()).remove(0)
    }

    #[test]
    fn test_share_totals_treat_text_as_zero() {
        let folio = FolioSnapshot {
            folio: Folio {
                id: 1,
                folio: "F/001".into(),
                certificates: vec![cert("10"), cert("abc"), cert("5")],
                ..Default::default()
            },
            ..Default::default()
        };
        let ctx = single_folio(folio, CaseRecord::new(1, CaseType::Claim));

        assert_eq!(ctx.get("combinedTotalNoOfShares"), Some(&json!(15)));
        assert_eq!(ctx.get("grandTotalNoOfShares"), Some(&json!(15)));
        assert_eq!(ctx.get("certificateCount"), Some(&json!(3)));
        assert_eq!(
            ctx.get("combinedTotalNoOfSharesWords"),
            Some(&json!("fifteen only"))
        );
        assert_eq!(ctx.get("combinedTotalFaceValue"), Some(&json!("0")));
        assert_eq!(ctx.folder_name, "F_001");
    }

    #[test]
    fn test_certificate_fields() {
        let certificate = Certificate {
            distinctive_no_from: Some("101".into()),
            distinctive_no_to: Some("200".into()),
            face_value: Some(Decimal::new(1000, 2)),
            allotment_date: NaiveDate::from_ymd_opt(1994, 3, 9),
            endorsement: Some("Yes".into()),
            no_of_shares: Some("100".into()),
            ..Default::default()
        };
        let folio = FolioSnapshot {
            folio: Folio {
                certificates: vec![certificate],
                ..Default::default()
            },
            ..Default::default()
        };
        let ctx = single_folio(folio, CaseRecord::new(1, CaseType::Claim));

        let first = &ctx.list("certificates")[0];
        assert_eq!(first["distinctiveNos"], json!("101-200"));
        assert_eq!(first["allotmentDate"], json!("09-03-1994"));
        assert_eq!(first["allotmentYear"], json!("1994"));
        assert_eq!(first["endorsement"], json!(true));
        assert_eq!(first["index"], json!(1));
        assert_eq!(ctx.get("combinedTotalFaceValue"), Some(&json!("10")));
    }

    #[test]
    fn test_slot_flags() {
        let folio = FolioSnapshot {
            folio: Folio {
                shareholder_name1: Some(10),
                ..Default::default()
            },
            slots: [Some(holder(10, "Asha")), None, None],
            ..Default::default()
        };
        let ctx = single_folio(folio, CaseRecord::new(1, CaseType::Claim));

        assert!(ctx.flag("hasShareholder_1"));
        assert!(!ctx.flag("hasShareholder_2"));
        assert!(!ctx.flag("hasShareholder_3"));
        assert_eq!(ctx.get("name_1"), Some(&json!("Asha")));
        assert!(ctx.get("name_2").is_none());
    }

    #[test]
    fn test_holder_descriptors_prepended_with_certificate_names() {
        let folio = FolioSnapshot {
            folio: Folio {
                certificates: vec![
                    Certificate {
                        holder_name1: Some("OLD".into()),
                        ..Default::default()
                    },
                    Certificate {
                        holder_name1: Some("A. KUMAR".into()),
                        holder_name2: Some("B. KUMAR".into()),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
            slots: [Some(holder(10, "A")), Some(holder(11, "B")), None],
            ..Default::default()
        };
        let ctx = single_folio(folio, CaseRecord::new(1, CaseType::Claim));

        let holders = ctx.list("shareHolderDetails");
        assert_eq!(holders.len(), 2);
        assert_eq!(holders[0]["slot"], json!(2));
        assert_eq!(holders[0]["certificateHolderName"], json!("B. KUMAR"));
        assert_eq!(holders[1]["slot"], json!(1));
        assert_eq!(holders[1]["certificateHolderName"], json!("A. KUMAR"));
    }

    #[test]
    fn test_survivors_exclude_dead_shareholder() {
        let mut case = CaseRecord::new(1, CaseType::Transmission);
        case.dead_shareholder = Some(DeadShareholder {
            id: 11,
            name: Some("B".into()),
        });
        let folio = FolioSnapshot {
            slots: [
                Some(holder(10, "A")),
                Some(holder(11, "B")),
                Some(holder(12, "C")),
            ],
            ..Default::default()
        };
        let ctx = single_folio(folio, case);

        let survivor_ids: Vec<_> = ctx.list("survivors").iter().filter_map(id_of).collect();
        assert_eq!(survivor_ids, vec![12, 10]);
        assert_eq!(ctx.list("shareHolderDetails").len(), 3);
    }

    #[test]
    fn test_non_claimants() {
        let mut snapshot = CaseSnapshot::new(CaseRecord::new(1, CaseType::Transmission));
        snapshot.claimants = vec![heir(2, "Ravi")];
        snapshot.folios.push(FolioSnapshot {
            legal_heirs: vec![heir(1, "Sita"), heir(2, "Ravi"), heir(3, "Gita")],
            ..Default::default()
        });
        let ctx = assemble(&snapshot, today()).remove(0);

        let ids: Vec<_> = ctx.list("non_clamaints").iter().filter_map(id_of).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(ctx.get("non_claimants"), ctx.get("non_clamaints"));
        assert_eq!(ctx.list("non_claimants")[1]["index"], json!(2));
        assert_eq!(ctx.list("legalHeirDetails").len(), 3);
        assert_eq!(ctx.list("claimants")[0]["name"], json!("Ravi"));
    }

    #[test]
    fn test_company_fields_follow_latest_name_change() {
        let folio = FolioSnapshot {
            security: Some(SecurityMaster {
                id: 3,
                company_id: Some(4),
                isin: Some("INE000A01010".into()),
                ..Default::default()
            }),
            company: Some(CompanyMaster {
                id: 4,
                cin: Some("L00000MH1990PLC000000".into()),
                name_changes: vec![
                    CompanyNameChange {
                        id: 1,
                        current_name: Some("Acme Ltd".into()),
                        date_of_change: NaiveDate::from_ymd_opt(2001, 1, 1),
                        ..Default::default()
                    },
                    CompanyNameChange {
                        id: 2,
                        current_name: None,
                        previous_name: Some("Acme Industries".into()),
                        date_of_change: NaiveDate::from_ymd_opt(2010, 1, 1),
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        };
        let ctx = single_folio(folio, CaseRecord::new(1, CaseType::Claim));

        assert_eq!(ctx.get("companyName"), Some(&json!("Acme Industries")));
        assert_eq!(ctx.get("isin"), Some(&json!("INE000A01010")));
        assert_eq!(ctx.get("rtaEmail"), Some(&json!("")));
    }

    #[test]
    fn test_case_fields_formatted() {
        let mut case = CaseRecord::new(9, CaseType::Claim);
        case.allow_affidavit = Some("Yes".into());
        case.is_minor = Some("No".into());
        case.date_of_death = NaiveDate::from_ymd_opt(2023, 12, 1);
        let ctx = single_folio(FolioSnapshot::default(), case);

        assert_eq!(ctx.get("allowAffidavit"), Some(&json!(true)));
        assert_eq!(ctx.get("isMinor"), Some(&json!(false)));
        assert_eq!(ctx.get("isTestate"), Some(&json!(false)));
        assert_eq!(ctx.get("dateOfDeath"), Some(&json!("01-12-2023")));
        assert_eq!(ctx.get("documentDate"), Some(&json!("")));
        assert_eq!(ctx.get("generatedOn"), Some(&json!("17-05-2024")));
        assert_eq!(ctx.get("caseId"), Some(&json!(9)));
        assert_eq!(ctx.folio_index, 1);
    }

    #[test]
    fn test_share_total_saturates() {
        let folio = FolioSnapshot {
            folio: Folio {
                id: 1,
                folio: "F/001".into(),
                certificates: vec![cert(&u64::MAX.to_string()), cert("1")],
                ..Default::default()
            },
            ..Default::default()
        };
        let ctx = single_folio(folio, CaseRecord::new(1, CaseType::Claim));

        assert_eq!(ctx.get("combinedTotalNoOfShares"), Some(&json!(u64::MAX)));
        assert_eq!(ctx.get("combinedTotalNoOfSharesWords"), Some(&Value::Null));
    }

    #[test]
    fn test_colliding_folder_names_made_unique() {
        let folio = |id: i64, label: &str| FolioSnapshot {
            folio: Folio {
                id,
                folio: label.into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut snapshot = CaseSnapshot::new(CaseRecord::new(1, CaseType::Transmission));
        snapshot.folios = vec![
            folio(1, "INE/001"),
            folio(2, "INE_001"),
            folio(3, "INE/002"),
            folio(4, "INE_001_1"),
        ];

        let names: Vec<String> = assemble(&snapshot, today())
            .into_iter()
            .map(|ctx| ctx.folder_name)
            .collect();

        assert_eq!(names, vec!["INE_001_1_1", "INE_001_2", "INE_002", "INE_001_1"]);
    }
}
