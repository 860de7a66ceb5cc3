//! PostgreSQL store
//!
//! Reads the registrar tables in the `rta` schema. All queries are plain
//! reads; the pipeline never writes through this store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, warn};

use super::{CaseStore, ReferenceStore, StoreError, StoreResult};
use crate::models::{
    CaseRecord, Certificate, CompanyMaster, CompanyNameChange, DeadShareholder, Folio,
    LegalHeirDetail, Nomination, SecurityMaster, ShareHolderDetail,
};

/// Connection settings taken from the server command line
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
}

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Hide the password when logging a connection string
fn mask_database_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

/// Store backed by a Postgres connection pool
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            "Connecting to database: {}",
            mask_database_url(&config.database_url)
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&config.database_url)
            .await
            .inspect_err(|e| warn!("Failed to connect to database: {}", e))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Test database connectivity
    pub async fn test_connection(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }
}

#[derive(FromRow)]
struct CaseRow {
    id: i64,
    case_number: Option<String>,
    case_type: String,
    folios: Option<String>,
    select_claimant: Option<String>,
    select_affidavit_shareholder: Option<String>,
    select_affidavit_legal_heir: Option<String>,
    select_nomination: Option<String>,
    allow_affidavit: Option<String>,
    document_date: Option<NaiveDate>,
    is_deceased: Option<String>,
    dead_shareholder: Option<Json<DeadShareholder>>,
    shareholder_name_death: Option<String>,
    date_of_death: Option<NaiveDate>,
    place_of_death: Option<String>,
    is_testate: Option<String>,
    proof_of_succession: Option<String>,
    is_minor: Option<String>,
    minor_dob: Option<NaiveDate>,
    guardian_name: Option<String>,
    guardian_relation: Option<String>,
    guardian_pan: Option<String>,
    tax_status: Option<String>,
    occupation: Option<String>,
    political_exposure: Option<String>,
    annual_income: Option<String>,
    percentage: Option<String>,
    remarks: Option<String>,
}

impl TryFrom<CaseRow> for CaseRecord {
    type Error = StoreError;

    fn try_from(row: CaseRow) -> Result<Self, Self::Error> {
        let case_type = row.case_type.parse().map_err(|e| StoreError::InvalidValue {
            field: "cases.case_type".to_string(),
            message: format!("{}", e),
        })?;

        Ok(CaseRecord {
            id: row.id,
            case_number: row.case_number,
            case_type,
            folios: row.folios,
            select_claimant: row.select_claimant,
            select_affidavit_shareholder: row.select_affidavit_shareholder,
            select_affidavit_legal_heir: row.select_affidavit_legal_heir,
            select_nomination: row.select_nomination,
            allow_affidavit: row.allow_affidavit,
            document_date: row.document_date,
            is_deceased: row.is_deceased,
            dead_shareholder: row.dead_shareholder.map(|Json(d)| d),
            shareholder_name_death: row.shareholder_name_death,
            date_of_death: row.date_of_death,
            place_of_death: row.place_of_death,
            is_testate: row.is_testate,
            proof_of_succession: row.proof_of_succession,
            is_minor: row.is_minor,
            minor_dob: row.minor_dob,
            guardian_name: row.guardian_name,
            guardian_relation: row.guardian_relation,
            guardian_pan: row.guardian_pan,
            tax_status: row.tax_status,
            occupation: row.occupation,
            political_exposure: row.political_exposure,
            annual_income: row.annual_income,
            percentage: row.percentage,
            remarks: row.remarks,
        })
    }
}

const SHAREHOLDER_COLUMNS: &str = r#"
    id, name, father_name, pan, aadhaar, dob, gender, address, city, state, pincode,
    email, mobile, occupation, bank_name, bank_account_no, bank_ifsc, bank_micr,
    bank_branch, bank_address, account_type, account_opening_date, dp_id, client_id
"#;

const LEGAL_HEIR_COLUMNS: &str = r#"
    id, project_id, name, relation_with_deceased, father_name, pan, aadhaar, dob, gender,
    address, city, state, pincode, email, mobile, occupation, bank_name, bank_account_no,
    bank_ifsc, bank_micr, bank_branch, account_type, account_opening_date, is_minor,
    guardian_name, guardian_relation, guardian_pan, is_deceased, date_of_death
"#;

#[async_trait]
impl CaseStore for PgStore {
    async fn case_by_id(&self, case_id: i64) -> StoreResult<Option<CaseRecord>> {
        let row = sqlx::query_as::<_, CaseRow>(
            r#"
            SELECT id, case_number, case_type, folios, select_claimant,
                   select_affidavit_shareholder, select_affidavit_legal_heir, select_nomination,
                   allow_affidavit, document_date, is_deceased, dead_shareholder,
                   shareholder_name_death, date_of_death, place_of_death, is_testate,
                   proof_of_succession, is_minor, minor_dob, guardian_name, guardian_relation,
                   guardian_pan, tax_status, occupation, political_exposure, annual_income,
                   percentage, remarks
            FROM rta.cases
            WHERE id = $1
            "#,
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CaseRecord::try_from).transpose()
    }

    async fn folios_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Folio>> {
        let mut folios = sqlx::query_as::<_, Folio>(
            r#"
            SELECT id, folio, security_id, shareholder_name1, shareholder_name2, shareholder_name3
            FROM rta.folios
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let certificates = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT id, folio_id, certificate_no, distinctive_no_from, distinctive_no_to,
                   face_value, no_of_shares, equity_type, allotment_date, endorsement,
                   endorsement_folio, endorsement_date, holder_name1, holder_name2, holder_name3
            FROM rta.certificates
            WHERE folio_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_folio: HashMap<i64, Vec<Certificate>> = HashMap::new();
        for certificate in certificates {
            by_folio
                .entry(certificate.folio_id)
                .or_default()
                .push(certificate);
        }
        for folio in &mut folios {
            folio.certificates = by_folio.remove(&folio.id).unwrap_or_default();
        }

        debug!("Loaded {} folios for {} requested ids", folios.len(), ids.len());
        Ok(folios)
    }
}

#[async_trait]
impl ReferenceStore for PgStore {
    async fn shareholders_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<ShareHolderDetail>> {
        let sql = format!(
            "SELECT {} FROM rta.shareholder_details WHERE id = ANY($1)",
            SHAREHOLDER_COLUMNS
        );
        Ok(sqlx::query_as::<_, ShareHolderDetail>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn legal_heirs_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<LegalHeirDetail>> {
        let sql = format!(
            "SELECT {} FROM rta.legal_heir_details WHERE id = ANY($1)",
            LEGAL_HEIR_COLUMNS
        );
        Ok(sqlx::query_as::<_, LegalHeirDetail>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn legal_heirs_by_project(&self, project_id: i64) -> StoreResult<Vec<LegalHeirDetail>> {
        let sql = format!(
            "SELECT {} FROM rta.legal_heir_details WHERE project_id = $1 ORDER BY id",
            LEGAL_HEIR_COLUMNS
        );
        Ok(sqlx::query_as::<_, LegalHeirDetail>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn nominations_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Nomination>> {
        Ok(sqlx::query_as::<_, Nomination>(
            r#"
            SELECT id, shareholder_id, nominee_name, relation, father_name, pan, dob, address,
                   city, state, pincode, email, mobile, percentage, is_minor, guardian_name,
                   guardian_address, guardian_relation, date_of_majority
            FROM rta.nominations
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn security_by_id(&self, security_id: i64) -> StoreResult<Option<SecurityMaster>> {
        Ok(sqlx::query_as::<_, SecurityMaster>(
            r#"
            SELECT id, company_id, project_id, isin, security_type
            FROM rta.security_masters
            WHERE id = $1
            "#,
        )
        .bind(security_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn company_by_id(&self, company_id: i64) -> StoreResult<Option<CompanyMaster>> {
        let Some(mut company) = sqlx::query_as::<_, CompanyMaster>(
            r#"
            SELECT id, cin, registered_office, rta_name, rta_address, rta_contact, rta_email
            FROM rta.company_masters
            WHERE id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        company.name_changes = sqlx::query_as::<_, CompanyNameChange>(
            r#"
            SELECT id, current_name, previous_name, date_of_change
            FROM rta.company_name_changes
            WHERE company_id = $1
            ORDER BY date_of_change DESC NULLS LAST, id DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(company))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgRow;

    fn decodes_from_row<T: for<'r> FromRow<'r, PgRow>>() {}

    #[test]
    fn test_models_decode_straight_from_rows() {
        decodes_from_row::<Folio>();
        decodes_from_row::<Certificate>();
        decodes_from_row::<ShareHolderDetail>();
        decodes_from_row::<LegalHeirDetail>();
        decodes_from_row::<Nomination>();
        decodes_from_row::<SecurityMaster>();
        decodes_from_row::<CompanyMaster>();
        decodes_from_row::<CompanyNameChange>();
    }

    #[test]
    fn test_mask_database_url() {
        assert_eq!(
            mask_database_url("postgresql://rta:secret@db:5432/rta"),
            "postgresql://rta:***@db:5432/rta"
        );
        assert_eq!(
            mask_database_url("postgresql://localhost:5432/rta"),
            "postgresql://localhost:5432/rta"
        );
        assert_eq!(mask_database_url("not a url"), "***");
    }
}
