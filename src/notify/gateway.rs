use crate::error::GatewayError;
use crate::pomodoro::pomodoro::{MAX_POMODORO_COUNTER, PhaseState, Stage, next_phase};
use notify_rust::Notification;

pub const NOTIFICATION_TITLE: &str = "Tomato Timer";
const DEFAULT_ACTION: &str = "default";
const SETTINGS_ACTION: &str = "settings";

/// Action ids and button labels. The default action is the click on the
/// notification body, so it carries no label of its own.
const ACTIONS: [(&str, &str); 2] = [(DEFAULT_ACTION, ""), (SETTINGS_ACTION, "Settings")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl Notice {
    /// Notice raised when `current` has run for its full duration.
    pub fn phase_finished(current: PhaseState, icon: &str) -> Self {
        let cycle = u32::from(MAX_POMODORO_COUNTER) + 1;
        let finished = match current.stage {
            Stage::Pomodoro => format!(
                "Pomodoro {}/{} finished.",
                current.pomodoro_counter + 1,
                cycle
            ),
            stage => format!("{} finished.", stage.label()),
        };

        let next = next_phase(current);
        let upcoming = match next.stage {
            Stage::Pomodoro => format!(
                "Back to work: pomodoro {}/{}.",
                next.pomodoro_counter + 1,
                cycle
            ),
            Stage::ShortBreak => "Time for a short break.".to_string(),
            Stage::LongBreak => "Time for a long break.".to_string(),
        };

        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: format!(
                "{} {} {} Click for settings.",
                current.stage.emoji(),
                finished,
                upcoming
            ),
            icon: icon.to_string(),
        }
    }
}

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Callbacks handed to the gateway with each notification.
///
/// `on_acknowledged` must be called exactly once, whenever the user dismisses
/// or interacts with the notification, however late. `on_action` is called
/// at most once, before `on_acknowledged`, when the user clicks through to
/// the settings.
pub struct NotificationCallbacks {
    pub on_acknowledged: Callback,
    pub on_action: Callback,
}

pub trait NotificationGateway: Send + Sync {
    /// Presents `notice` without blocking the caller.
    fn show(&self, notice: Notice, callbacks: NotificationCallbacks) -> Result<(), GatewayError>;
}

/// Desktop notifications through the platform notification server.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopGateway;

impl NotificationGateway for DesktopGateway {
    fn show(&self, notice: Notice, callbacks: NotificationCallbacks) -> Result<(), GatewayError> {
        let mut notification = Notification::new();
        notification
            .summary(&notice.title)
            .body(&notice.body)
            .icon(&notice.icon)
            .timeout(0); // No auto-dismiss
        for (id, label) in ACTIONS {
            notification.action(id, label);
        }

        dispatch(&notification, callbacks)
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn dispatch(
    notification: &Notification,
    callbacks: NotificationCallbacks,
) -> Result<(), GatewayError> {
    let handle = notification
        .show()
        .map_err(|e| GatewayError::Backend(e.to_string()))?;

    // wait_for_action blocks until the notification is closed or clicked.
    std::thread::spawn(move || {
        handle.wait_for_action(move |action| match action {
            DEFAULT_ACTION | SETTINGS_ACTION => {
                (callbacks.on_action)();
                (callbacks.on_acknowledged)();
            }
            _ => (callbacks.on_acknowledged)(),
        });
    });
    Ok(())
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn dispatch(
    notification: &Notification,
    callbacks: NotificationCallbacks,
) -> Result<(), GatewayError> {
    // No action support here: treat the notification as acknowledged once shown.
    notification
        .show()
        .map(|_| ())
        .map_err(|e| GatewayError::Backend(e.to_string()))?;
    (callbacks.on_acknowledged)();
    Ok(())
}

/// Gateway that keeps every notification so tests can play the user.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingGateway {
    shown: std::sync::Mutex<Vec<(Notice, Option<NotificationCallbacks>)>>,
    failing: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl RecordingGateway {
    pub fn count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .map(|(notice, _)| notice.clone())
            .collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    /// Takes the callbacks of the most recent notification.
    pub fn take_latest(&self) -> NotificationCallbacks {
        let index = self.count().checked_sub(1).expect("no notification shown");
        self.take(index)
    }

    /// Takes the callbacks of the `index`-th notification shown.
    pub fn take(&self, index: usize) -> NotificationCallbacks {
        self.shown
            .lock()
            .unwrap()
            .get_mut(index)
            .and_then(|(_, callbacks)| callbacks.take())
            .expect("no pending notification")
    }
}

#[cfg(test)]
impl NotificationGateway for RecordingGateway {
    fn show(&self, notice: Notice, callbacks: NotificationCallbacks) -> Result<(), GatewayError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(GatewayError::Backend("no notification server".into()));
        }
        self.shown.lock().unwrap().push((notice, Some(callbacks)));
        Ok(())
    }
}
