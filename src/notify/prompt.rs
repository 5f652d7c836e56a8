use async_trait::async_trait;
use dialoguer::Input;
use tracing::warn;

pub const MENU_QUESTION: &str =
    "Settings: 1) custom times  2) skip current phase  3) reset to defaults";
pub const CUSTOMIZE_QUESTION: &str = "Set custom times in the following order: pomodoro + short break + long break.\n Each follows by space (in mins)";

/// Free-text question to the user. `None` means the prompt was dismissed.
#[async_trait]
pub trait SettingsPrompt: Send + Sync {
    async fn ask(&self, question: &str) -> Option<String>;
}

/// Reads answers from the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

#[async_trait]
impl SettingsPrompt for TerminalPrompt {
    async fn ask(&self, question: &str) -> Option<String> {
        let question = question.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(question)
                .allow_empty(true)
                .interact_text()
        })
        .await;

        match answer {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                warn!(error = %e, "settings prompt unavailable");
                None
            }
            Err(e) => {
                warn!(error = %e, "settings prompt task failed");
                None
            }
        }
    }
}

/// Prompt that replays canned answers and records the questions it was asked.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: std::sync::Mutex<std::collections::VecDeque<Option<String>>>,
    asked: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            answers: std::sync::Mutex::new(
                answers.into_iter().map(|a| a.map(Into::into)).collect(),
            ),
            asked: std::sync::Mutex::default(),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl SettingsPrompt for ScriptedPrompt {
    async fn ask(&self, question: &str) -> Option<String> {
        self.asked.lock().unwrap().push(question.to_string());
        self.answers.lock().unwrap().pop_front().flatten()
    }
}
