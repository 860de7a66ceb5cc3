//! Shareholders, legal heirs and nominees

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered shareholder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ShareHolderDetail {
    pub id: i64,
    pub name: Option<String>,
    pub father_name: Option<String>,
    pub pan: Option<String>,
    pub aadhaar: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub occupation: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account_no: Option<String>,
    pub bank_ifsc: Option<String>,
    pub bank_micr: Option<String>,
    pub bank_branch: Option<String>,
    pub bank_address: Option<String>,
    pub account_type: Option<String>,
    pub account_opening_date: Option<NaiveDate>,
    pub dp_id: Option<String>,
    pub client_id: Option<String>,
}

impl ShareHolderDetail {
    pub const DATE_FIELDS: &'static [&'static str] = &["dob", "accountOpeningDate"];
    pub const FLAG_FIELDS: &'static [&'static str] = &[];
}

/// A legal heir recorded against a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct LegalHeirDetail {
    pub id: i64,
    pub project_id: Option<i64>,
    pub name: Option<String>,
    pub relation_with_deceased: Option<String>,
    pub father_name: Option<String>,
    pub pan: Option<String>,
    pub aadhaar: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub occupation: Option<String>,
    pub bank_name: Option<String>,
    pub bank_account_no: Option<String>,
    pub bank_ifsc: Option<String>,
    pub bank_micr: Option<String>,
    pub bank_branch: Option<String>,
    pub account_type: Option<String>,
    pub account_opening_date: Option<NaiveDate>,
    pub is_minor: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_relation: Option<String>,
    pub guardian_pan: Option<String>,
    pub is_deceased: Option<String>,
    pub date_of_death: Option<NaiveDate>,
}

impl LegalHeirDetail {
    pub const DATE_FIELDS: &'static [&'static str] =
        &["dob", "accountOpeningDate", "dateOfDeath"];
    pub const FLAG_FIELDS: &'static [&'static str] = &["isMinor", "isDeceased"];
}

/// A nomination made by a shareholder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Nomination {
    pub id: i64,
    /// The shareholder who made the nomination
    pub shareholder_id: Option<i64>,
    pub nominee_name: Option<String>,
    pub relation: Option<String>,
    pub father_name: Option<String>,
    pub pan: Option<String>,
    pub dob: Option<NaiveDate>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub percentage: Option<String>,
    pub is_minor: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_address: Option<String>,
    pub guardian_relation: Option<String>,
    pub date_of_majority: Option<NaiveDate>,
}

impl Nomination {
    pub const DATE_FIELDS: &'static [&'static str] = &["dob", "dateOfMajority"];
    pub const FLAG_FIELDS: &'static [&'static str] = &["isMinor"];
}
