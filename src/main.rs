use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tabledesk::{Settings, Workbench, server};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load();
    if let Some(path) = Settings::default_path() {
        if !path.exists() {
            // First run: write the defaults out so they can be edited
            settings.save().context("Failed to write default settings")?;
            info!(path = %path.display(), "Wrote default settings");
        }
    }
    let workbench = Arc::new(Workbench::from_settings(&settings));

    // Any file arguments are ingested up front so they can be opened right away
    for path in std::env::args_os().skip(1).map(PathBuf::from) {
        let summary = workbench
            .ingest_file(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        info!(key = %summary.key, rows = summary.rows, path = %path.display(), "Preloaded dataset");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    server::serve(&settings, workbench, shutdown)
        .with_context(|| format!("Server on {} failed", settings.server.addr))?;
    Ok(())
}
