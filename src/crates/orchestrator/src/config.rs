//! Runtime settings.
//!
//! Everything comes from environment variables with working defaults, so the
//! server runs out of a checkout with `config/` in the working directory.

use std::path::PathBuf;

/// Process-level settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the configuration tree (flows, rule fragments, loader file).
    pub config_dir: PathBuf,

    /// Bind address for the HTTP server.
    pub host: String,

    /// Bind port for the HTTP server.
    pub port: u16,

    /// Domain database connection string (consumed by SQL-backed stores).
    pub database_url: Option<String>,

    /// Vector database connection string (consumed by SQL-backed indexes).
    pub vector_database_url: Option<String>,

    /// Counterparty id used when `create_session` gets none.
    pub default_counterparty_id: String,

    /// Per-turn execution budget in seconds.
    pub turn_timeout_secs: u64,
}

impl Settings {
    /// Load settings from the environment.
    pub fn from_env() -> Self {
        let config_dir = std::env::var("CAREFLOW_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        Self {
            config_dir,
            host: std::env::var("CAREFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("CAREFLOW_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            database_url: std::env::var("DATABASE_URL").ok(),
            vector_database_url: std::env::var("VECTOR_DATABASE_URL").ok(),
            default_counterparty_id: std::env::var("CAREFLOW_COUNTERPARTY_ID")
                .unwrap_or_else(|_| "doctorId001".to_string()),
            turn_timeout_secs: std::env::var("CAREFLOW_TURN_TIMEOUT_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(120),
        }
    }

    /// Directory containing one subdirectory per flow.
    pub fn flows_dir(&self) -> PathBuf {
        self.config_dir.join("flows")
    }

    /// Directory of shared rule fragments inlined into prompt templates.
    pub fn flow_rule_dir(&self) -> PathBuf {
        self.config_dir.join("flows").join("flow_rule")
    }

    /// Path of the preload/lazy-load flow loader file.
    pub fn flow_loader_path(&self) -> PathBuf {
        self.config_dir.join("flow_loader.yaml")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("config"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            vector_database_url: None,
            default_counterparty_id: "doctorId001".to_string(),
            turn_timeout_secs: 120,
        }
    }
}
