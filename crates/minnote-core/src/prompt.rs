//! User interaction contract
//!
//! Dialogs and confirmations belong to the UI. The core only awaits their
//! answers; each call suspends the calling flow until the user responds.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Answer to the unsaved-changes question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Save,
    Discard,
    Cancel,
}

#[async_trait]
pub trait UserPrompts: Send + Sync {
    /// Ask where to save. `None` means the user cancelled.
    async fn choose_save_destination(&self, suggested_name: &str) -> Option<PathBuf>;

    /// Ask which file to open. `None` means the user cancelled.
    async fn choose_open_source(&self) -> Option<PathBuf>;

    /// Ask a question with a fixed set of answers
    async fn prompt_user(&self, question: &str, options: &[Choice]) -> Choice;
}

#[derive(Debug, Default)]
struct Script {
    destinations: VecDeque<PathBuf>,
    open_sources: VecDeque<PathBuf>,
    choices: VecDeque<Choice>,
    questions: Vec<String>,
}

/// Prompts answered from a pre-loaded script, for headless runs.
///
/// An exhausted script cancels: no destination, no source, `Choice::Cancel`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompts {
    script: Arc<Mutex<Script>>,
}

impl ScriptedPrompts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_destination(&self, path: impl Into<PathBuf>) {
        self.script.lock().destinations.push_back(path.into());
    }

    pub fn push_open_source(&self, path: impl Into<PathBuf>) {
        self.script.lock().open_sources.push_back(path.into());
    }

    pub fn push_choice(&self, choice: Choice) {
        self.script.lock().choices.push_back(choice);
    }

    /// Questions asked through `prompt_user`, oldest first
    pub fn questions(&self) -> Vec<String> {
        self.script.lock().questions.clone()
    }
}

#[async_trait]
impl UserPrompts for ScriptedPrompts {
    async fn choose_save_destination(&self, suggested_name: &str) -> Option<PathBuf> {
        let destination = self.script.lock().destinations.pop_front();
        tracing::debug!(suggested = %suggested_name, ?destination, "Scripted save destination");
        destination
    }

    async fn choose_open_source(&self) -> Option<PathBuf> {
        self.script.lock().open_sources.pop_front()
    }

    async fn prompt_user(&self, question: &str, options: &[Choice]) -> Choice {
        let mut script = self.script.lock();
        script.questions.push(question.to_string());

        match script.choices.pop_front() {
            Some(choice) if options.contains(&choice) => choice,
            _ => Choice::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_runs_in_order_then_cancels() {
        let prompts = ScriptedPrompts::new();
        prompts.push_choice(Choice::Save);
        prompts.push_destination("/notes/a.txt");

        let options = [Choice::Save, Choice::Discard, Choice::Cancel];
        assert_eq!(prompts.prompt_user("Save?", &options).await, Choice::Save);
        assert_eq!(prompts.prompt_user("Save?", &options).await, Choice::Cancel);
        assert_eq!(
            prompts.choose_save_destination("a").await,
            Some(PathBuf::from("/notes/a.txt"))
        );
        assert_eq!(prompts.choose_save_destination("a").await, None);
        assert_eq!(prompts.questions().len(), 2);
    }
}
