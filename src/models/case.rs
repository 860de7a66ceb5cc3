//! Case records

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Workflow variant of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaseType {
    Claim,
    ClaimTransposition,
    ClaimIssueDuplicate,
    Transmission,
    TransmissionIssueDuplicate,
    TransmissionIssueDuplicateTransposition,
    Deletion,
    DeletionIssueDuplicate,
    DeletionIssueDuplicateTransposition,
}

/// The legal workflow a case type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseFamily {
    Claim,
    Transmission,
    Deletion,
}

impl CaseType {
    pub fn all() -> &'static [CaseType] {
        &[
            CaseType::Claim,
            CaseType::ClaimTransposition,
            CaseType::ClaimIssueDuplicate,
            CaseType::Transmission,
            CaseType::TransmissionIssueDuplicate,
            CaseType::TransmissionIssueDuplicateTransposition,
            CaseType::Deletion,
            CaseType::DeletionIssueDuplicate,
            CaseType::DeletionIssueDuplicateTransposition,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseType::Claim => "Claim",
            CaseType::ClaimTransposition => "ClaimTransposition",
            CaseType::ClaimIssueDuplicate => "ClaimIssueDuplicate",
            CaseType::Transmission => "Transmission",
            CaseType::TransmissionIssueDuplicate => "TransmissionIssueDuplicate",
            CaseType::TransmissionIssueDuplicateTransposition => {
                "TransmissionIssueDuplicateTransposition"
            }
            CaseType::Deletion => "Deletion",
            CaseType::DeletionIssueDuplicate => "DeletionIssueDuplicate",
            CaseType::DeletionIssueDuplicateTransposition => "DeletionIssueDuplicateTransposition",
        }
    }

    pub fn family(&self) -> CaseFamily {
        match self {
            CaseType::Claim | CaseType::ClaimTransposition | CaseType::ClaimIssueDuplicate => {
                CaseFamily::Claim
            }
            CaseType::Transmission
            | CaseType::TransmissionIssueDuplicate
            | CaseType::TransmissionIssueDuplicateTransposition => CaseFamily::Transmission,
            CaseType::Deletion
            | CaseType::DeletionIssueDuplicate
            | CaseType::DeletionIssueDuplicateTransposition => CaseFamily::Deletion,
        }
    }

    pub fn is_transmission(&self) -> bool {
        self.family() == CaseFamily::Transmission
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing CaseType
#[derive(Debug)]
pub struct ParseCaseTypeError(String);

impl fmt::Display for ParseCaseTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown case type '{}'", self.0)
    }
}

impl std::error::Error for ParseCaseTypeError {}

impl FromStr for CaseType {
    type Err = ParseCaseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        CaseType::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseCaseTypeError(s.to_string()))
    }
}

/// The shareholder a deceased-holder case is about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadShareholder {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// A case as stored by the case workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub id: i64,
    pub case_number: Option<String>,
    pub case_type: CaseType,

    // `_`-joined id lists
    pub folios: Option<String>,
    pub select_claimant: Option<String>,
    pub select_affidavit_shareholder: Option<String>,
    pub select_affidavit_legal_heir: Option<String>,
    pub select_nomination: Option<String>,

    pub allow_affidavit: Option<String>,
    pub document_date: Option<NaiveDate>,

    // Deceased shareholder
    pub is_deceased: Option<String>,
    pub dead_shareholder: Option<DeadShareholder>,
    pub shareholder_name_death: Option<String>,
    pub date_of_death: Option<NaiveDate>,
    pub place_of_death: Option<String>,
    pub is_testate: Option<String>,
    pub proof_of_succession: Option<String>,

    // Minor / guardian
    pub is_minor: Option<String>,
    pub minor_dob: Option<NaiveDate>,
    pub guardian_name: Option<String>,
    pub guardian_relation: Option<String>,
    pub guardian_pan: Option<String>,

    // Claimant classification
    pub tax_status: Option<String>,
    pub occupation: Option<String>,
    pub political_exposure: Option<String>,
    pub annual_income: Option<String>,
    pub percentage: Option<String>,

    pub remarks: Option<String>,
}

impl CaseRecord {
    pub const DATE_FIELDS: &'static [&'static str] = &["documentDate", "dateOfDeath", "minorDob"];
    pub const FLAG_FIELDS: &'static [&'static str] =
        &["allowAffidavit", "isDeceased", "isTestate", "isMinor"];

    /// A bare case of the given type; every optional field empty
    pub fn new(id: i64, case_type: CaseType) -> Self {
        Self {
            id,
            case_number: None,
            case_type,
            folios: None,
            select_claimant: None,
            select_affidavit_shareholder: None,
            select_affidavit_legal_heir: None,
            select_nomination: None,
            allow_affidavit: None,
            document_date: None,
            is_deceased: None,
            dead_shareholder: None,
            shareholder_name_death: None,
            date_of_death: None,
            place_of_death: None,
            is_testate: None,
            proof_of_succession: None,
            is_minor: None,
            minor_dob: None,
            guardian_name: None,
            guardian_relation: None,
            guardian_pan: None,
            tax_status: None,
            occupation: None,
            political_exposure: None,
            annual_income: None,
            percentage: None,
            remarks: None,
        }
    }

    pub fn allows_affidavit(&self) -> bool {
        super::is_yes(self.allow_affidavit.as_deref())
    }

    pub fn dead_shareholder_id(&self) -> Option<i64> {
        self.dead_shareholder.as_ref().map(|d| d.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_type_round_trip_names() {
        for case_type in CaseType::all() {
            assert_eq!(case_type.as_str().parse::<CaseType>().unwrap(), *case_type);
        }
        assert!("Transfer".parse::<CaseType>().is_err());
    }

    #[test]
    fn test_families() {
        assert_eq!(CaseType::ClaimIssueDuplicate.family(), CaseFamily::Claim);
        assert!(CaseType::TransmissionIssueDuplicateTransposition.is_transmission());
        assert_eq!(
            CaseType::DeletionIssueDuplicateTransposition.family(),
            CaseFamily::Deletion
        );
    }

    #[test]
    fn test_serialises_camel_case() {
        let mut case = CaseRecord::new(7, CaseType::Transmission);
        case.allow_affidavit = Some("Yes".into());
        let value = serde_json::to_value(&case).unwrap();
        assert_eq!(value["caseType"], "Transmission");
        assert_eq!(value["allowAffidavit"], "Yes");
        assert!(case.allows_affidavit());
    }
}
