//! Configuration loader for the `painel-analytics` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional path environment variable; blank values count as unset.
macro_rules! optional_path {
    ($var_name:expr) => {
        env::var($var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    };
}

/// Read a string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Complaint table (CSV). Missing or unreadable is fatal.
    pub complaints_csv: PathBuf,

    /// Assessment table (CSV). The assessment dashboard is disabled when unset.
    pub assessments_csv: Option<PathBuf>,

    /// State boundaries (GeoJSON) for the complaints map. Unreadable only
    /// disables the map.
    pub states_geojson: PathBuf,

    /// Feature property holding the state code.
    pub states_key_property: String,

    /// Municipality boundaries (GeoJSON) for the assessment maps.
    pub municipalities_geojson: Option<PathBuf>,

    /// Feature property holding the municipality name.
    pub municipalities_key_property: String,

    /// Extra `ALIAS,CANONICO` region name corrections.
    pub region_aliases_csv: Option<PathBuf>,

    /// TCP port to listen on.
    pub bind_port: u16,

    /// Number of terms returned for the word cloud.
    pub top_terms: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `COMPLAINTS_CSV` – complaint table (default: `dataset/RECLAMEAQUI_NAGEM.csv`)
/// - `ASSESSMENTS_CSV` – assessment table (default: unset)
/// - `STATES_GEOJSON` – state boundaries (default: `mapa_data/brasil_estados.json`)
/// - `STATES_KEY_PROPERTY` – (default: `sigla`)
/// - `MUNICIPALITIES_GEOJSON` – municipality boundaries (default: unset)
/// - `MUNICIPALITIES_KEY_PROPERTY` – (default: `name`)
/// - `REGION_ALIASES_CSV` – extra alias pairs (default: unset)
/// - `BIND_PORT` – listen port (default: 8080)
/// - `TOP_TERMS` – word-cloud terms (default: 100)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let complaints_csv = PathBuf::from(env_or!("COMPLAINTS_CSV", "dataset/RECLAMEAQUI_NAGEM.csv"));
    let states_geojson = PathBuf::from(env_or!("STATES_GEOJSON", "mapa_data/brasil_estados.json"));
    let bind_port = parse_env_u32!("BIND_PORT", 8080);
    let bind_port =
        u16::try_from(bind_port).map_err(|_| anyhow!("Invalid BIND_PORT: {}", bind_port))?;

    Ok(Config {
        complaints_csv,
        assessments_csv: optional_path!("ASSESSMENTS_CSV"),
        states_geojson,
        states_key_property: env_or!("STATES_KEY_PROPERTY", "sigla"),
        municipalities_geojson: optional_path!("MUNICIPALITIES_GEOJSON"),
        municipalities_key_property: env_or!("MUNICIPALITIES_KEY_PROPERTY", "name"),
        region_aliases_csv: optional_path!("REGION_ALIASES_CSV"),
        bind_port,
        top_terms: parse_env_u32!("TOP_TERMS", 100),
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map_or_else(|| "(unset)".to_string(), |p| p.display().to_string())
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  COMPLAINTS_CSV         : {}", self.complaints_csv.display());
        tracing::info!("  ASSESSMENTS_CSV        : {}", show(&self.assessments_csv));
        tracing::info!(
            "  STATES_GEOJSON         : {} (key: {})",
            self.states_geojson.display(),
            self.states_key_property
        );
        tracing::info!(
            "  MUNICIPALITIES_GEOJSON : {} (key: {})",
            show(&self.municipalities_geojson),
            self.municipalities_key_property
        );
        tracing::info!("  REGION_ALIASES_CSV     : {}", show(&self.region_aliases_csv));
        tracing::info!("  BIND_PORT              : {}", self.bind_port);
        tracing::info!("  TOP_TERMS              : {}", self.top_terms);
    }
}
