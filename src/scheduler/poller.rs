use crate::clock::Clock;
use crate::error::Result;
use crate::notify::gateway::{Notice, NotificationGateway};
use crate::pomodoro::pomodoro::PhaseState;
use crate::scheduler::acknowledgment::AcknowledgmentHandler;
use crate::store::repository::TimerRepository;
use crate::visibility::Visibility;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The host is in the background; nothing was read or written.
    Hidden,
    NotDue { remaining: i64 },
    Notified(PhaseState),
}

pub struct Poller {
    repo: TimerRepository,
    clock: Arc<dyn Clock>,
    visibility: Arc<dyn Visibility>,
    gateway: Arc<dyn NotificationGateway>,
    acknowledgment: AcknowledgmentHandler,
    icon: String,
    period: Duration,
    initialized: AtomicBool,
}

impl Poller {
    pub fn new(
        repo: TimerRepository,
        clock: Arc<dyn Clock>,
        visibility: Arc<dyn Visibility>,
        gateway: Arc<dyn NotificationGateway>,
        acknowledgment: AcknowledgmentHandler,
    ) -> Self {
        Self {
            repo,
            clock,
            visibility,
            gateway,
            acknowledgment,
            icon: "appointment-soon".to_string(),
            period: DEFAULT_TICK,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Fills in every missing setting. Safe on every start. Until it has
    /// succeeded once, every tick runs it again first.
    pub async fn initialize(&self) -> Result<()> {
        let written = self.repo.initialize(self.clock.now()).await?;
        self.initialized.store(true, Ordering::SeqCst);
        debug!(written = written.len(), "settings initialized");
        Ok(())
    }

    /// One polling step: notify when the current phase has run its full duration.
    ///
    /// The timestamp is written before the notification is shown, so a slow
    /// or failing gateway loses a notification rather than repeating it.
    pub async fn tick(&self) -> Result<TickOutcome> {
        if !self.visibility.is_active() {
            return Ok(TickOutcome::Hidden);
        }
        if !self.initialized.load(Ordering::SeqCst) {
            self.initialize().await?;
        }

        let phase = self.repo.phase_state().await?;
        let duration = self.repo.duration_for(phase.stage).await?;
        let now = self.clock.now();

        let Some(last_notified) = self.repo.last_notified().await? else {
            warn!("last-notified timestamp missing, restarting the current phase");
            self.repo.put_last_notified(now).await?;
            return Ok(TickOutcome::NotDue {
                remaining: duration,
            });
        };

        let elapsed = now - last_notified;
        if elapsed < duration {
            return Ok(TickOutcome::NotDue {
                remaining: duration - elapsed,
            });
        }

        self.repo.put_last_notified(now).await?;
        info!(
            stage = phase.stage.as_str(),
            pomodoro_counter = phase.pomodoro_counter,
            elapsed,
            "🔔 {} is over",
            phase.stage.label()
        );

        let notice = Notice::phase_finished(phase, &self.icon);
        self.gateway.show(notice, self.acknowledgment.callbacks(phase))?;
        Ok(TickOutcome::Notified(phase))
    }

    /// Polls forever. Failed ticks are logged and retried on the next period.
    pub async fn run(self) {
        let mut timer_interval = interval(self.period);
        timer_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer_interval.tick().await;

            match self.tick().await {
                Ok(TickOutcome::NotDue { remaining }) => debug!(remaining, "not due yet"),
                Ok(TickOutcome::Hidden) => debug!("host hidden, tick skipped"),
                Ok(TickOutcome::Notified(_)) => {}
                Err(e) => error!(error = %e, "tick failed"),
            }
        }
    }
}
