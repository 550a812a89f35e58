//! Cadence Batch Service - Main Entry Point
//! Composition root: configuration, logging, signals, wiring

mod cli;
mod logging;
mod settings;
mod signals;
mod units;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use cadence_core::application::{
    shutdown_channel, BatchService, CycleOrchestrator, ServiceSummary, ShutdownToken,
};
use cadence_core::domain::{format_duration, CycleStatus};
use cadence_core::port::{ReportSink, SystemTimeProvider, TimeProvider};
use cadence_infra_sqlite::{create_pool, run_migrations, SqliteHistory, SqliteReportSink};

use cli::{Cli, Command, HistoryArgs, RunArgs};
use settings::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status when a single-shot run's cycle failed entirely
const EXIT_CYCLE_FAILED: u8 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Flushes file logs on drop; keep alive until exit
    let _log_guard = match logging::init_logging(cli.log_format, cli.resolved_log_dir().as_deref())
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("cadenced: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "cadenced failed");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let (config_path, required) = cli.config_source();
    let settings = Settings::load(&config_path, required)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    match cli.command.unwrap_or_default() {
        Command::Run(args) => run_service(settings, args).await,
        Command::Check => check(&settings),
        Command::History(args) => show_history(&settings, args).await,
    }
}

async fn run_service(mut settings: Settings, args: RunArgs) -> Result<ExitCode> {
    if args.once {
        settings.service.continuous = false;
    }
    settings
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    info!("Cadence v{} starting...", VERSION);

    // 1. Signals -> graceful shutdown; a stop during startup means no cycle runs
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_task = signals::spawn_signal_listener(shutdown_tx)
        .context("Failed to install signal handlers")?;

    let result = start_and_run(&settings, shutdown_rx).await;
    signal_task.abort();
    let (single_shot, summary) = result?;

    if args.print_report {
        if let Some(report) = &summary.last_report {
            println!("{}", report.to_json()?);
        }
    }

    info!("Shutdown complete.");
    Ok(ExitCode::from(exit_status(single_shot, &summary)))
}

/// Wire the service and run it until it stops; returns whether it was single-shot
async fn start_and_run(
    settings: &Settings,
    shutdown: ShutdownToken,
) -> Result<(bool, ServiceSummary)> {
    // 2. History database (optional)
    let pool = match settings.history.resolved_database_url() {
        Some(url) => {
            info!(database_url = %url, "Initializing history database...");
            let pool = create_pool(&url).await.context("DB pool creation failed")?;
            run_migrations(&pool).await.context("Migration failed")?;
            Some(pool)
        }
        None => None,
    };

    // 3. Units and orchestrator (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let unit_specs = units::build_units(settings, pool.as_ref(), time_provider.clone())?;
    let mode = settings.execution_mode().map_err(|e| anyhow!(e))?;
    let orchestrator =
        CycleOrchestrator::new(unit_specs, mode)?.with_time_provider(time_provider.clone());

    let mut sinks: Vec<Arc<dyn ReportSink>> = Vec::new();
    if let Some(pool) = &pool {
        sinks.push(Arc::new(SqliteReportSink::new(pool.clone())));
    }

    let service_config = settings.service_config().map_err(|e| anyhow!(e))?;
    let single_shot = !service_config.continuous;
    let service = BatchService::new(orchestrator, service_config, sinks)
        .with_time_provider(time_provider);
    if !single_shot {
        info!("Press Ctrl+C to shutdown");
    }

    // 4. Run until stopped
    let summary = service.run(shutdown).await?;
    Ok((single_shot, summary))
}

fn exit_status(single_shot: bool, summary: &ServiceSummary) -> u8 {
    let failed = summary
        .last_report
        .as_ref()
        .is_some_and(|r| r.status() == CycleStatus::Failed);
    if single_shot && failed {
        EXIT_CYCLE_FAILED
    } else {
        0
    }
}

fn check(settings: &Settings) -> Result<ExitCode> {
    settings
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    let mode = settings.execution_mode().map_err(|e| anyhow!(e))?;
    let service = settings.service_config().map_err(|e| anyhow!(e))?;

    println!("Configuration OK");
    let schedule = match (&service.schedule, service.continuous) {
        (_, false) => "single cycle".to_string(),
        (Some(cron), true) => format!("cron '{}' (UTC)", cron),
        (None, true) => format!("every {}", format_duration(service.interval)),
    };
    println!("  schedule: {}", schedule);
    println!("  mode:     {}", mode);
    println!(
        "  history:  {}",
        settings
            .history
            .resolved_database_url()
            .unwrap_or_else(|| "disabled".to_string())
    );
    for unit in &settings.units {
        let policy = settings.retry_policy(unit);
        println!(
            "  - {} ({:?}): {} attempt(s), first retry after {}",
            unit.name,
            unit.kind,
            policy.max_attempts,
            format_duration(policy.initial_delay)
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn show_history(settings: &Settings, args: HistoryArgs) -> Result<ExitCode> {
    let url = settings
        .history
        .resolved_database_url()
        .ok_or_else(|| anyhow!("history.database_url is not configured"))?;
    let pool = create_pool(&url).await.context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    let history = SqliteHistory::new(pool);
    let reports = history.recent(args.limit).await?;

    if args.json {
        for report in &reports {
            println!("{}", report.to_json()?);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let stats = history.stats().await?;
    println!(
        "Cycles: {} (success {}, degraded {}, failed {}), success rate {:.1}%",
        stats.total_cycles,
        stats.successful,
        stats.degraded,
        stats.failed,
        stats.success_rate()
    );
    if let Some(last) = stats.last_finished_at {
        println!("Last finished: {}", last.to_rfc3339());
    }
    for report in &reports {
        println!(
            "  #{} {} {} ({} units, {})",
            report.cycle_id(),
            report.started_at().to_rfc3339(),
            report.status(),
            report.results().len(),
            format_duration(report.elapsed())
        );
        for result in report.results().iter().filter(|r| !r.is_success()) {
            println!(
                "      {} {} after {} attempt(s){}",
                result.unit(),
                result.status(),
                result.attempts(),
                result
                    .error()
                    .map(|e| format!(": {}", e))
                    .unwrap_or_default()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
