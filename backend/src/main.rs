mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::Instrument;

use leadflow::{
    config::AppConfig,
    db::Db,
    intake::{Workbook, load_leads, load_upload},
    logger::{LogFormat, TraceId, init_tracing, root_span},
    metrics::counters::Counters,
    notify::TracingNotifier,
    runner::BatchRunner,
    store::SqlxLeadStore,
};

use cli::Cli;

/// Connects, runs migrations and wraps the pool in the lead store.
async fn init_store(cfg: &AppConfig) -> anyhow::Result<Arc<SqlxLeadStore>> {
    let db = Db::connect(&cfg.database_url)
        .await
        .with_context(|| format!("failed to connect to {}", cfg.database_url))?;
    db.migrate().await?;

    Ok(Arc::new(SqlxLeadStore::new(db.pool.clone())))
}

/// Reports what a run would process without writing anything.
fn dry_run(files: &[Workbook]) -> ExitCode {
    let Some(first) = files.first() else {
        eprintln!("{}", leadflow::error::InputError::NoFile);
        return ExitCode::FAILURE;
    };

    match load_leads(first, Utc::now()) {
        Ok(leads) => {
            let missing = leads.iter().filter(|l| l.category().is_err()).count();
            println!(
                "{}: {} leads, {} missing 'Service_Category'",
                first.name,
                leads.len(),
                missing
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, cfg: AppConfig) -> anyhow::Result<ExitCode> {
    let mut files = load_upload(&cli.workbook)?;
    cli.rename_upload(&mut files);

    if cli.dry_run {
        return Ok(dry_run(&files));
    }

    let store = init_store(&cfg).await?;
    let counters = Counters::default();
    let runner = BatchRunner::from_config(store, Arc::new(TracingNotifier), &cfg)
        .with_counters(counters.clone());

    let code = match runner.run_upload(&files, Utc::now()).await {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    };

    tracing::info!(counters = ?counters.snapshot(), "run counters");
    Ok(code)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = AppConfig::from_env()?;

    init_tracing(LogFormat::from_json_flag(cfg.json_logs));
    tracing::info!(workbook = %cli.workbook.display(), "Starting leadflow...");

    let trace_id = TraceId::default();
    run(cli, cfg)
        .instrument(root_span("distribute_upload", &trace_id))
        .await
}
