//! `sofia_audit`: audit the collector ecosystem and gate on core health.
//!
//! Takes no arguments. Database settings and the project root come from the
//! environment; reports land in `output/audit/`. Exits 0 when the core
//! health gate passes, 1 when it fails or the audit cannot complete.

use anyhow::{Context, Result};
use sofia_audit::report::console::print_summary;
use sofia_audit::{run_audit, write_reports, AuditSettings};
use sofia_db::{create_pool, CatalogProber, DbConfig};
use sofia_logging::LogConfig;
use std::process::ExitCode;
use tracing::{error, info};

async fn run() -> Result<bool> {
    let settings = AuditSettings::from_env();
    let db_config = DbConfig::from_env().context("Invalid database configuration")?;
    info!(root = %settings.root.display(), db = ?db_config, "starting collector audit");

    let pool = create_pool(&db_config);
    let prober = CatalogProber::new(pool, settings.probe.clone(), db_config.connect_timeout);

    let report = run_audit(&settings, &prober)
        .await
        .context("Collector audit failed")?;
    prober.pool().close().await;

    let output_dir = settings.output_dir();
    let paths = write_reports(&report, &output_dir)
        .with_context(|| format!("Failed to write reports to {}", output_dir.display()))?;
    print_summary(&report, &paths);

    Ok(report.summary.core_health.passed)
}

fn main() -> ExitCode {
    let verbose = std::env::var_os("RUST_LOG").is_some();
    if let Err(err) = sofia_logging::init_logging(LogConfig {
        app_name: "sofia_audit",
        verbose,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("Failed to start async runtime: {}", err);
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!("{:#}", err);
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}
