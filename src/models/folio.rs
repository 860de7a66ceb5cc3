//! Folios, certificates and the security/company masters behind them

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A share certificate held under a folio
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,
    pub folio_id: i64,
    pub certificate_no: Option<String>,
    pub distinctive_no_from: Option<String>,
    pub distinctive_no_to: Option<String>,
    pub face_value: Option<Decimal>,
    /// Free text as captured at data entry
    pub no_of_shares: Option<String>,
    pub equity_type: Option<String>,
    pub allotment_date: Option<NaiveDate>,
    pub endorsement: Option<String>,
    pub endorsement_folio: Option<String>,
    pub endorsement_date: Option<NaiveDate>,
    /// Holder names as printed on the certificate, per shareholder slot
    pub holder_name1: Option<String>,
    pub holder_name2: Option<String>,
    pub holder_name3: Option<String>,
}

impl Certificate {
    pub const DATE_FIELDS: &'static [&'static str] = &["allotmentDate", "endorsementDate"];
    pub const FLAG_FIELDS: &'static [&'static str] = &["endorsement"];

    /// Share count; anything that is not a whole number counts as zero
    pub fn share_count(&self) -> u64 {
        self.no_of_shares
            .as_deref()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(0)
    }

    /// `"<from>-<to>"`
    pub fn distinctive_nos(&self) -> String {
        format!(
            "{}-{}",
            self.distinctive_no_from.as_deref().unwrap_or(""),
            self.distinctive_no_to.as_deref().unwrap_or("")
        )
    }

    /// Printed holder name for slot 1..=3
    pub fn holder_name(&self, slot: usize) -> Option<&str> {
        match slot {
            1 => self.holder_name1.as_deref(),
            2 => self.holder_name2.as_deref(),
            3 => self.holder_name3.as_deref(),
            _ => None,
        }
    }
}

/// A folio: up to three registered holders and their certificates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Folio {
    pub id: i64,
    /// Registrar's folio label, e.g. `"INE001/00042"`
    pub folio: String,
    pub security_id: Option<i64>,
    pub shareholder_name1: Option<i64>,
    pub shareholder_name2: Option<i64>,
    pub shareholder_name3: Option<i64>,
    #[serde(default)]
    #[cfg_attr(feature = "database", sqlx(skip))]
    pub certificates: Vec<Certificate>,
}

impl Folio {
    pub const SLOTS: usize = 3;

    /// Shareholder id referenced in slot 1..=3
    pub fn shareholder_ref(&self, slot: usize) -> Option<i64> {
        match slot {
            1 => self.shareholder_name1,
            2 => self.shareholder_name2,
            3 => self.shareholder_name3,
            _ => None,
        }
    }

    pub fn shareholder_refs(&self) -> Vec<i64> {
        (1..=Self::SLOTS)
            .filter_map(|slot| self.shareholder_ref(slot))
            .collect()
    }

    /// Directory name for this folio inside a generation run.
    ///
    /// Always a single plain path component: separators become `_`, and a
    /// label that is empty or only dots falls back to `folio_<id>`.
    pub fn folder_name(&self) -> String {
        let name: String = self
            .folio
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        if name.is_empty() || name.chars().all(|c| c == '.') {
            format!("folio_{}", self.id)
        } else {
            name
        }
    }
}

/// Security master: links a folio to its issuing company and project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct SecurityMaster {
    pub id: i64,
    pub company_id: Option<i64>,
    pub project_id: Option<i64>,
    pub isin: Option<String>,
    pub security_type: Option<String>,
}

/// A recorded change of company name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CompanyNameChange {
    pub id: i64,
    pub current_name: Option<String>,
    pub previous_name: Option<String>,
    pub date_of_change: Option<NaiveDate>,
}

/// Company master with registrar contact data and name history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CompanyMaster {
    pub id: i64,
    pub cin: Option<String>,
    pub registered_office: Option<String>,
    pub rta_name: Option<String>,
    pub rta_address: Option<String>,
    pub rta_contact: Option<String>,
    pub rta_email: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "database", sqlx(skip))]
    pub name_changes: Vec<CompanyNameChange>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl CompanyMaster {
    /// Most recent name change by date, later ids winning ties
    pub fn latest_name_change(&self) -> Option<&CompanyNameChange> {
        self.name_changes
            .iter()
            .max_by_key(|change| (change.date_of_change, change.id))
    }

    /// Display name: current name, else previous name, else empty
    pub fn display_name(&self) -> String {
        self.latest_name_change()
            .and_then(|change| {
                non_empty(change.current_name.as_deref())
                    .or_else(|| non_empty(change.previous_name.as_deref()))
            })
            .unwrap_or("")
            .to_string()
    }

    pub fn previous_name(&self) -> String {
        self.latest_name_change()
            .and_then(|change| non_empty(change.previous_name.as_deref()))
            .unwrap_or("")
            .to_string()
    }
}
