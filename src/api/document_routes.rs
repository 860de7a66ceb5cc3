//! Case document API endpoints

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::case_documents::{CaseDocumentService, TemplateId, TemplateLibrary, TemplateVariant};
use crate::error::CaseDocumentError;
use crate::models::CaseType;

/// Number of documents that could not be generated
pub const GENERATION_FAILURES_HEADER: &str = "x-generation-failures";

#[derive(Clone)]
pub struct DocumentState {
    service: Arc<CaseDocumentService>,
}

impl DocumentState {
    pub fn new(service: Arc<CaseDocumentService>) -> Self {
        Self { service }
    }
}

// Response types
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseTypeTemplates {
    pub case_type: CaseType,
    pub bundle: Option<String>,
    pub templates: Vec<TemplateSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: TemplateId,
    pub display_name: String,
    pub files: BTreeMap<TemplateVariant, String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub case_types: Vec<CaseTypeTemplates>,
}

#[derive(Debug, Serialize)]
pub struct TemplateFieldsResponse {
    pub template: TemplateId,
    pub fields: BTreeMap<TemplateVariant, Vec<String>>,
}

/// Error type mapped onto HTTP status codes
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl From<CaseDocumentError> for ApiError {
    fn from(e: CaseDocumentError) -> Self {
        match e {
            CaseDocumentError::CaseNotFound(_) => ApiError::NotFound(e.to_string()),
            other => {
                error!("Document generation failed: {}", other);
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/cases/:case_id/documents
async fn download_case_documents(
    State(state): State<DocumentState>,
    Path(case_id): Path<i64>,
) -> Result<Response, ApiError> {
    let outcome = state.service.generate(case_id).await?;

    let bytes = tokio::fs::read(&outcome.archive_path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to read archive: {}", e)))?;
    if let Err(e) = tokio::fs::remove_file(&outcome.archive_path).await {
        warn!("Failed to remove archive {:?}: {}", outcome.archive_path, e);
    }

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.zip\"", case_id),
        ),
        (
            HeaderName::from_static(GENERATION_FAILURES_HEADER),
            outcome.failures.len().to_string(),
        ),
    ];
    Ok((StatusCode::OK, headers, bytes).into_response())
}

fn case_type_templates(service: &CaseDocumentService, case_type: CaseType) -> CaseTypeTemplates {
    let catalog = service.catalog();
    let templates = catalog
        .templates_for(case_type)
        .iter()
        .filter_map(|id| catalog.template(*id))
        .map(|def| TemplateSummary {
            id: def.id,
            display_name: def.display_name.clone(),
            files: def.files.clone(),
        })
        .collect();

    CaseTypeTemplates {
        case_type,
        bundle: catalog.bundle_for(case_type).map(|b| b.id.clone()),
        templates,
    }
}

/// GET /api/catalog
async fn list_catalog(State(state): State<DocumentState>) -> Json<CatalogResponse> {
    let case_types = CaseType::all()
        .iter()
        .map(|case_type| case_type_templates(&state.service, *case_type))
        .collect();
    Json(CatalogResponse { case_types })
}

/// GET /api/catalog/:case_type
async fn get_case_type(
    State(state): State<DocumentState>,
    Path(case_type): Path<String>,
) -> Result<Json<CaseTypeTemplates>, ApiError> {
    let case_type: CaseType = case_type
        .parse()
        .map_err(|e: crate::models::ParseCaseTypeError| ApiError::NotFound(e.to_string()))?;
    Ok(Json(case_type_templates(&state.service, case_type)))
}

/// GET /api/templates/:template_id/fields
async fn get_template_fields(
    State(state): State<DocumentState>,
    Path(template_id): Path<String>,
) -> Result<Json<TemplateFieldsResponse>, ApiError> {
    let template: TemplateId = template_id.parse().map_err(ApiError::NotFound)?;

    let service = Arc::clone(&state.service);
    let fields = tokio::task::spawn_blocking(move || {
        let mut library = TemplateLibrary::new(service.config().template_dir.clone());
        library.merge_fields(service.catalog(), template)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TemplateFieldsResponse {
        template,
        fields: fields
            .into_iter()
            .map(|(variant, names)| (variant, names.into_iter().collect()))
            .collect(),
    }))
}

/// Create router for case document endpoints
pub fn create_document_router(service: Arc<CaseDocumentService>) -> Router {
    let state = DocumentState::new(service);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/cases/:case_id/documents", get(download_case_documents))
        .route("/api/catalog", get(list_catalog))
        .route("/api/catalog/:case_type", get(get_case_type))
        .route("/api/templates/:template_id/fields", get(get_template_fields))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case_documents::TemplateCatalog;
    use crate::config::PipelineConfig;
    use crate::store::InMemoryStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn router(output: &TempDir) -> Router {
        let store = Arc::new(InMemoryStore::new());
        let service = CaseDocumentService::new(
            store.clone(),
            store,
            Arc::new(TemplateCatalog::builtin().unwrap()),
            PipelineConfig::new(output.path().join("templates"), output.path().join("out")),
        );
        create_document_router(Arc::new(service))
    }

    async fn fetch(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_unknown_case_is_404() {
        let output = TempDir::new().unwrap();
        let (status, body) = fetch(router(&output), "/api/cases/404/documents").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Case 404 not found");
        assert!(!output.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_health() {
        let output = TempDir::new().unwrap();
        let (status, body) = fetch(router(&output), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_catalog_for_case_type() {
        let output = TempDir::new().unwrap();
        let (status, body) = fetch(router(&output), "/api/catalog/Deletion").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bundle"], "case.bundle.deletion");
        let ids: Vec<_> = body["templates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            ids,
            vec!["isr1", "isr2", "isr3", "isr4", "sh13", "sh14", "affidavit", "deletion"]
        );

        let (status, _) = fetch(router(&output), "/api/catalog/Transfer").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_full_catalog_lists_every_case_type() {
        let output = TempDir::new().unwrap();
        let (status, body) = fetch(router(&output), "/api/catalog").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["case_types"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn test_api_error_status_codes() {
        let not_found = ApiError::from(CaseDocumentError::CaseNotFound(7)).into_response();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let internal = ApiError::Internal("boom".into()).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
