//! Runtime configuration
//!
//! `PipelineConfig` is what the document pipeline needs. `ServerArgs` is the
//! command line of the server binary; every flag falls back to an environment
//! variable so the service can be configured from a `.env` file.

use std::path::PathBuf;

use clap::Parser;

/// Filesystem locations used by a generation run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding the `.docx` templates named in the catalog
    pub template_dir: PathBuf,
    /// Working directories and archives are created here
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    pub fn new(template_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            output_dir: output_dir.into(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("templates"),
            output_dir: std::env::temp_dir().join("rta-cases"),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "rta_server")]
#[command(about = "Case document generation service for share-certificate cases")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "RTA_BIND", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum pooled database connections
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 10)]
    pub pool_size: u32,

    /// Directory holding the .docx templates
    #[arg(long, env = "RTA_TEMPLATE_DIR", default_value = "templates")]
    pub template_dir: PathBuf,

    /// Where working directories and archives are written
    #[arg(long, env = "RTA_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Catalog override (YAML); the built-in catalog is used when absent
    #[arg(long, env = "RTA_CATALOG")]
    pub catalog: Option<PathBuf>,
}

impl ServerArgs {
    pub fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            template_dir: self.template_dir.clone(),
            output_dir: self.output_dir.clone().unwrap_or(defaults.output_dir),
        }
    }

    #[cfg(feature = "database")]
    pub fn database_config(&self) -> crate::store::DatabaseConfig {
        crate::store::DatabaseConfig {
            database_url: self.database_url.clone(),
            max_connections: self.pool_size,
        }
    }
}
