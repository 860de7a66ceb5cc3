//! Case document service
//!
//! Serves generated case archives over HTTP. Configuration comes from flags
//! or the environment (a `.env` file is honoured).

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rta_cases::api::create_document_router;
use rta_cases::case_documents::{CaseDocumentService, TemplateCatalog, TemplateLibrary};
use rta_cases::config::ServerArgs;
use rta_cases::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rta_cases=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ServerArgs::parse();
    info!("Starting RTA case document service");

    let store = Arc::new(
        PgStore::connect(&args.database_config())
            .await
            .context("Failed to connect to database")?,
    );
    store
        .test_connection()
        .await
        .context("Database connectivity check failed")?;

    let catalog = TemplateCatalog::load(args.catalog.as_deref()).context("Failed to load catalog")?;
    let config = args.pipeline_config();

    let missing = TemplateLibrary::new(&config.template_dir).missing_files(&catalog);
    for path in &missing {
        warn!("Template file not found: {:?}", path);
    }
    if missing.is_empty() {
        info!("All catalog templates present in {:?}", config.template_dir);
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", config.output_dir))?;

    let service = CaseDocumentService::new(store.clone(), store, Arc::new(catalog), config);

    let app = create_document_router(Arc::new(service)).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
    );

    info!("Starting server on {}", args.bind);
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}
