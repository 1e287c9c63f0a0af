//! Application entry point for the `painel-analytics` service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Loading the complaint (and optionally assessment) record stores
//! - Loading the boundary layers for the maps (non-fatal on failure)
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! See [`painel_analytics::config::load_from_env`] for the data locations, plus:
//! - `AXUM_LOG_LEVEL` (optional) – verbosity of this crate (default: `debug`)
//! - `DEPS_LOG_LEVEL` (optional) – verbosity of dependencies (default: `warn`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, net::SocketAddr, path::Path, sync::Arc};

use anyhow::{Context, Result};
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use painel_analytics::{
    config, routes, store, AppState, AssessmentsDashboard, ComplaintsDashboard, GeometryTable,
    RegionAliases,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let mut aliases = RegionAliases::with_defaults();
    if let Some(path) = &cfg.region_aliases_csv {
        aliases
            .extend_from_csv(path)
            .with_context(|| format!("Failed to load region aliases from '{}'", path.display()))?;
    }
    tracing::info!("Using {} region aliases", aliases.len());

    tracing::info!("Loading complaints from {}", cfg.complaints_csv.display());
    let complaints = store::load_complaints(&cfg.complaints_csv).with_context(|| {
        format!("Failed to load complaints from '{}'", cfg.complaints_csv.display())
    })?;
    let states = load_layer(&cfg.states_geojson, &cfg.states_key_property, &aliases);
    let complaints = ComplaintsDashboard::new(
        complaints,
        states,
        aliases.clone(),
        cfg.top_terms as usize,
    );

    let assessments = match &cfg.assessments_csv {
        Some(path) => {
            tracing::info!("Loading assessments from {}", path.display());
            let store = store::load_assessments(path).with_context(|| {
                format!("Failed to load assessments from '{}'", path.display())
            })?;
            let municipalities = cfg
                .municipalities_geojson
                .as_deref()
                .and_then(|p| load_layer(p, &cfg.municipalities_key_property, &aliases));
            Some(Arc::new(AssessmentsDashboard::new(
                store,
                municipalities,
                aliases,
            )))
        }
        None => {
            tracing::info!("ASSESSMENTS_CSV not set, assessment dashboard disabled");
            None
        }
    };

    // Build app from routes gateway (EMBP)
    let app = routes::router(AppState {
        complaints: Arc::new(complaints),
        assessments,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.bind_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load a boundary layer. A failure only disables the maps that need it.
fn load_layer(path: &Path, key_property: &str, aliases: &RegionAliases) -> Option<GeometryTable> {
    // ---
    match GeometryTable::load(path, key_property, aliases) {
        Ok(table) => Some(table),
        Err(e) => {
            tracing::warn!(
                "Map layer '{}' unavailable, map charts disabled: {}",
                path.display(),
                e
            );
            None
        }
    }
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, or else per crate: `AXUM_LOG_LEVEL`
///   for `painel_analytics` and `DEPS_LOG_LEVEL` for everything else. Axum's
///   extractor rejections (malformed chart requests) follow the crate level.
///
/// Called once at startup, before any data is loaded.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let app = log_level("AXUM_LOG_LEVEL", "debug");
        let deps = log_level("DEPS_LOG_LEVEL", "warn");
        EnvFilter::new(format!(
            "{deps},painel_analytics={app},axum::rejection={app}"
        ))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

/// Read a level name from `var`, falling back to `default` when unset or invalid.
fn log_level(var: &str, default: &'static str) -> &'static str {
    // ---
    match env::var(var).ok().as_deref().map(str::trim) {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_log_level_accepts_known_names_only() {
        // ---
        env::set_var("PAINEL_TEST_LEVEL_OK", " info ");
        env::set_var("PAINEL_TEST_LEVEL_BAD", "loud");

        assert_eq!(log_level("PAINEL_TEST_LEVEL_OK", "warn"), "info");
        assert_eq!(log_level("PAINEL_TEST_LEVEL_BAD", "warn"), "warn");
        assert_eq!(log_level("PAINEL_TEST_LEVEL_UNSET", "debug"), "debug");
    }
}
