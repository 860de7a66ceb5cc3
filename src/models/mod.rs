//! Registrar record types
//!
//! Read-only views of the records the document pipeline consumes. Field names
//! serialise in camelCase because the serialised form is what template
//! designers address as merge fields.

mod case;
mod folio;
mod party;

pub use case::{CaseFamily, CaseRecord, CaseType, DeadShareholder, ParseCaseTypeError};
pub use folio::{Certificate, CompanyMaster, CompanyNameChange, Folio, SecurityMaster};
pub use party::{LegalHeirDetail, Nomination, ShareHolderDetail};

/// Registrar records store flags as `"Yes"` / `"No"` text
pub fn is_yes(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("yes"))
}
