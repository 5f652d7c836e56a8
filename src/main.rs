use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod clock;
mod config;
mod controller;
mod error;
mod notify;
mod pomodoro;
mod scheduler;
mod store;
mod visibility;
mod ws;

use clock::{Clock, SystemClock};
use config::{Cli, Command};
use controller::{SettingsController, TimerStatus};
use notify::gateway::DesktopGateway;
use notify::prompt::TerminalPrompt;
use scheduler::acknowledgment::AcknowledgmentHandler;
use scheduler::poller::Poller;
use store::kv::JsonFileStore;
use store::repository::TimerRepository;
use visibility::{AlwaysVisible, BrowserVisibility, Visibility};

fn init_tracing(verbose: bool, log_dir: Option<PathBuf>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "tomato_timer.log"));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    Ok(Some(guard))
}

fn print_status(status: &TimerStatus) {
    let phase = status.phase;
    println!(
        "{} {} (pomodoro counter {})",
        phase.stage.emoji(),
        phase.stage.label(),
        phase.pomodoro_counter
    );
    println!(
        "Durations: {}min pomodoro / {}min short break / {}min long break",
        status.durations.pomodoro / 60,
        status.durations.short_break / 60,
        status.durations.long_break / 60
    );
    if status.remaining > 0 {
        println!(
            "Next notification in {}m {}s",
            status.remaining / 60,
            status.remaining % 60
        );
    } else {
        println!("Notification due now");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command();
    let log_dir = (command == Command::Run).then(|| cli.log_dir());
    let _guard = init_tracing(cli.verbose, log_dir)?;

    let store_path = cli.store_path();
    let repo = TimerRepository::new(Arc::new(JsonFileStore::new(&store_path)));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let controller = SettingsController::new(repo.clone(), clock.clone());

    if command == Command::Run {
        return run_daemon(&cli, store_path, controller).await;
    }

    repo.initialize(clock.now())
        .await
        .with_context(|| format!("failed to open settings at {}", store_path.display()))?;

    match command {
        Command::Status => {}
        Command::Skip => {
            controller.skip().await.context("failed to skip phase")?;
        }
        Command::Reset => {
            controller.reset().await.context("failed to reset timer")?;
        }
        Command::Customize { minutes } => {
            controller
                .apply_custom_settings(&minutes)
                .await
                .context("failed to save durations")?;
        }
        Command::Run => unreachable!("handled above"),
    }

    print_status(&controller.status().await?);
    Ok(())
}

/// Run in daemon mode - WebSocket server for browser visibility + Pomodoro poller
async fn run_daemon(
    cli: &Cli,
    store_path: PathBuf,
    controller: SettingsController,
) -> anyhow::Result<()> {
    println!("🍅 Tomato Timer - Daemon Mode");
    println!("======================================================");

    let visibility: Arc<dyn Visibility> = if cli.no_browser {
        Arc::new(AlwaysVisible)
    } else {
        println!("Running WebSocket server on ws://{}", cli.ws_addr);
        let browser = Arc::new(BrowserVisibility::default());
        let server_visibility = browser.clone();
        let ws_addr = cli.ws_addr;
        tokio::spawn(async move {
            if let Err(e) =
                ws::websocket_server::start_websocket_server(ws_addr, server_visibility).await
            {
                error!(addr = %ws_addr, error = %e, "WebSocket server error");
            }
        });
        browser
    };

    let acknowledgment =
        AcknowledgmentHandler::new(controller.clone(), Arc::new(TerminalPrompt), cli.grace());
    let poller = Poller::new(
        controller.repository().clone(),
        controller.clock().clone(),
        visibility,
        Arc::new(DesktopGateway),
        acknowledgment,
    )
    .with_icon(cli.icon.clone())
    .with_period(cli.tick_period());

    // On failure the poller retries initialize before each tick.
    if let Err(e) = poller.initialize().await {
        error!(store = %store_path.display(), error = %e, "failed to initialize settings");
    }

    match controller.status().await {
        Ok(status) => print_status(&status),
        Err(e) => error!(error = %e, "failed to read timer status"),
    }
    info!(store = %store_path.display(), tick_secs = cli.tick_secs, "timer started");

    poller.run().await;
    Ok(())
}
