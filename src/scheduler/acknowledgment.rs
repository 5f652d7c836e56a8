//! What happens after a notification is answered.
//!
//! Acknowledging a notification advances the phase after a short grace
//! delay. Clicking through to the settings takes that advance over: the
//! click handler cancels the deferred task, performs the advance itself and
//! then applies the chosen override, so the override always lands after the
//! advance and is never lost. Each notification carries a one-shot claim, so
//! the advance happens once even when the click arrives after the grace
//! delay has already run out. The advance is tied to the phase the
//! notification was raised for: answering a notice after the phase has
//! moved on writes nothing.

use crate::controller::{SettingsController, UserAction};
use crate::notify::gateway::NotificationCallbacks;
use crate::notify::prompt::{MENU_QUESTION, SettingsPrompt};
use crate::pomodoro::pomodoro::PhaseState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const DEFAULT_GRACE: Duration = Duration::from_millis(750);

/// Per-notification coordination between the acknowledgment and the click.
#[derive(Debug)]
pub struct PendingAdvance {
    notified: PhaseState,
    clicked: CancellationToken,
    claimed: AtomicBool,
}

impl PendingAdvance {
    fn new(notified: PhaseState) -> Self {
        Self {
            notified,
            clicked: CancellationToken::new(),
            claimed: AtomicBool::new(false),
        }
    }

    /// True for exactly one caller.
    fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct AcknowledgmentHandler {
    controller: SettingsController,
    prompt: Arc<dyn SettingsPrompt>,
    grace: Duration,
}

impl AcknowledgmentHandler {
    pub fn new(
        controller: SettingsController,
        prompt: Arc<dyn SettingsPrompt>,
        grace: Duration,
    ) -> Self {
        Self {
            controller,
            prompt,
            grace,
        }
    }

    /// Builds the callbacks for the notification raised at the end of
    /// `notified`. Must be called from within a tokio runtime; the callbacks
    /// themselves may run on any thread.
    pub fn callbacks(&self, notified: PhaseState) -> NotificationCallbacks {
        let pending = Arc::new(PendingAdvance::new(notified));
        let runtime = Handle::current();

        let on_acknowledged = {
            let handler = self.clone();
            let pending = pending.clone();
            let runtime = runtime.clone();
            Box::new(move || {
                runtime.spawn(async move { handler.auto_advance(pending).await });
            })
        };

        let on_action = {
            let handler = self.clone();
            Box::new(move || {
                pending.clicked.cancel();
                runtime.spawn(async move { handler.handle_click(pending).await });
            })
        };

        NotificationCallbacks {
            on_acknowledged,
            on_action,
        }
    }

    async fn auto_advance(&self, pending: Arc<PendingAdvance>) {
        tokio::select! {
            _ = pending.clicked.cancelled() => {
                debug!("settings click took over the phase advance");
                return;
            }
            _ = tokio::time::sleep(self.grace) => {}
        }

        if !pending.claim() {
            return;
        }
        if let Err(e) = self.controller.advance_from(pending.notified).await {
            error!(error = %e, "failed to advance phase after acknowledgment");
        }
    }

    async fn handle_click(&self, pending: Arc<PendingAdvance>) {
        if pending.claim() {
            if let Err(e) = self.controller.advance_from(pending.notified).await {
                error!(error = %e, "failed to advance phase after settings click");
            }
        }

        let answer = self.prompt.ask(MENU_QUESTION).await;
        let Some(action) = answer.as_deref().and_then(UserAction::parse) else {
            debug!(answer = ?answer, "no settings change selected");
            return;
        };

        info!(action = ?action, "applying settings override");
        if let Err(e) = self.controller.apply(action, self.prompt.as_ref()).await {
            error!(error = %e, action = ?action, "failed to apply settings override");
        }
    }
}
