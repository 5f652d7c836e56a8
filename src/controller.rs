//! User overrides of the schedule: custom durations, skip and reset.
//!
//! Every mutation of the phase goes through [`SettingsController`], which
//! always persists stage, counter and timestamp in a single write.

use crate::clock::Clock;
use crate::error::StoreError;
use crate::notify::prompt::{CUSTOMIZE_QUESTION, SettingsPrompt};
use crate::pomodoro::pomodoro::{Durations, PhaseState, next_phase};
use crate::store::repository::TimerRepository;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Customize,
    Skip,
    Reset,
}

impl UserAction {
    /// Parses the settings menu answer: `"1"`, `"2"` or `"3"`.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(UserAction::Customize),
            "2" => Some(UserAction::Skip),
            "3" => Some(UserAction::Reset),
            _ => None,
        }
    }
}

/// Snapshot of the persisted timer, as shown by `tomato_timer status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerStatus {
    pub phase: PhaseState,
    pub durations: Durations,
    pub last_notified: Option<i64>,
    /// Seconds until the current phase is due; zero or negative means due.
    pub remaining: i64,
}

#[derive(Clone)]
pub struct SettingsController {
    repo: TimerRepository,
    clock: Arc<dyn Clock>,
}

impl SettingsController {
    pub fn new(repo: TimerRepository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn repository(&self) -> &TimerRepository {
        &self.repo
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Moves to the next phase and restarts its clock.
    pub async fn advance_phase(&self) -> Result<PhaseState, StoreError> {
        let current = self.repo.phase_state().await?;
        self.advance(current).await
    }

    /// Advances only while the stored phase is still `expected`. Returns
    /// `None` without writing once the phase has moved on.
    pub async fn advance_from(
        &self,
        expected: PhaseState,
    ) -> Result<Option<PhaseState>, StoreError> {
        let current = self.repo.phase_state().await?;
        if current != expected {
            debug!(
                expected = expected.stage.as_str(),
                expected_counter = expected.pomodoro_counter,
                stored = current.stage.as_str(),
                stored_counter = current.pomodoro_counter,
                "phase already moved on, advance dropped"
            );
            return Ok(None);
        }
        self.advance(current).await.map(Some)
    }

    async fn advance(&self, current: PhaseState) -> Result<PhaseState, StoreError> {
        let next = next_phase(current);
        self.repo.put_phase_state(next, self.clock.now()).await?;
        info!(
            from = current.stage.as_str(),
            to = next.stage.as_str(),
            pomodoro_counter = next.pomodoro_counter,
            "{} {} started",
            next.stage.emoji(),
            next.stage.label()
        );
        Ok(next)
    }

    /// Ends the current phase early.
    pub async fn skip(&self) -> Result<PhaseState, StoreError> {
        debug!("skipping current phase");
        self.advance_phase().await
    }

    /// Overwrites the three durations from a `"pomodoro short long"` line in
    /// minutes. Phase and timestamp are untouched.
    pub async fn apply_custom_settings(&self, input: &str) -> Result<Durations, StoreError> {
        let durations = Durations::from_minutes_input(input);
        self.repo.put_durations(durations).await?;
        info!(
            pomodoro = durations.pomodoro,
            short_break = durations.short_break,
            long_break = durations.long_break,
            "custom durations saved"
        );
        Ok(durations)
    }

    /// Default durations, first pomodoro of a fresh cycle, clock restarted now.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.repo.reset(self.clock.now()).await?;
        info!("timer reset to defaults");
        Ok(())
    }

    /// Applies a menu choice, asking for the minute triple when customizing.
    pub async fn apply(
        &self,
        action: UserAction,
        prompt: &dyn SettingsPrompt,
    ) -> Result<(), StoreError> {
        match action {
            UserAction::Customize => {
                match prompt.ask(CUSTOMIZE_QUESTION).await {
                    Some(input) if !input.trim().is_empty() => {
                        self.apply_custom_settings(&input).await?;
                    }
                    _ => debug!("custom times prompt left empty, durations unchanged"),
                }
            }
            UserAction::Skip => {
                self.skip().await?;
            }
            UserAction::Reset => self.reset().await?,
        }
        Ok(())
    }

    pub async fn status(&self) -> Result<TimerStatus, StoreError> {
        let phase = self.repo.phase_state().await?;
        let durations = self.repo.durations().await?;
        let last_notified = self.repo.last_notified().await?;
        let now = self.clock.now();
        let elapsed = last_notified.map(|at| now - at).unwrap_or(0);
        Ok(TimerStatus {
            phase,
            durations,
            last_notified,
            remaining: durations.for_stage(phase.stage) - elapsed,
        })
    }
}
