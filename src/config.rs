use crate::scheduler::acknowledgment::DEFAULT_GRACE;
use crate::scheduler::poller::DEFAULT_TICK;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "tomato_timer", version, about = "🍅 Pomodoro reminder daemon")]
pub struct Cli {
    /// Settings file (default: <data dir>/tomato_timer/settings.json)
    #[arg(long, env = "TOMATO_TIMER_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Seconds between two checks of the current phase
    #[arg(long, default_value_t = DEFAULT_TICK.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_secs: u64,

    /// Delay before an acknowledged notification advances the phase
    #[arg(long, default_value_t = DEFAULT_GRACE.as_millis() as u64)]
    pub grace_ms: u64,

    /// Address of the WebSocket server browser tabs report visibility to
    #[arg(long, env = "TOMATO_TIMER_WS_ADDR", default_value = "127.0.0.1:8765")]
    pub ws_addr: SocketAddr,

    /// Do not listen for browsers; always treat the host as visible
    #[arg(long)]
    pub no_browser: bool,

    /// Icon name or path shown with notifications
    #[arg(long, default_value = "appointment-soon")]
    pub icon: String,

    /// Directory for the daily log file (default: <data dir>/tomato_timer)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the reminder daemon (default)
    Run,
    /// Show the current phase and time left
    Status,
    /// End the current phase now
    Skip,
    /// Restore default durations and start a fresh cycle
    Reset,
    /// Set durations in minutes, e.g. "25 5 10"
    Customize { minutes: String },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn store_path(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| data_dir().join("settings.json"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(data_dir)
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tomato_timer")
}
