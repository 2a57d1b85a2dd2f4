//! Reading comprehension: a passage plus multiple-choice questions, answered
//! by a reader and saved together. Previously saved records are listed
//! alongside.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::alert::Alert;
use crate::backend::{ComprehensionPayload, QuestionStore, SavedComprehension, StoreError};

pub const OPTION_SLOTS: usize = 4;
pub const SAVED_MESSAGE: &str = "Comprehension saved successfully!";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensionQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Always the trimmed text of the first option slot, even when that slot
    /// was blank and therefore left out of `options`.
    pub correct_answer: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComprehensionStep {
    Create,
    Attempt,
}

#[derive(Debug)]
pub struct ComprehensionBuilder {
    step: ComprehensionStep,
    passage: String,
    questions: Vec<ComprehensionQuestion>,
    current_question: String,
    option_slots: [String; OPTION_SLOTS],
    user_answers: BTreeMap<usize, String>,
    saved: Vec<SavedComprehension>,
    alert: Option<Alert>,
}

impl ComprehensionBuilder {
    pub fn new() -> Self {
        Self {
            step: ComprehensionStep::Create,
            passage: String::new(),
            questions: Vec::new(),
            current_question: String::new(),
            option_slots: Default::default(),
            user_answers: BTreeMap::new(),
            saved: Vec::new(),
            alert: None,
        }
    }

    pub fn step(&self) -> ComprehensionStep {
        self.step
    }

    pub fn passage(&self) -> &str {
        &self.passage
    }

    pub fn questions(&self) -> &[ComprehensionQuestion] {
        &self.questions
    }

    pub fn current_question(&self) -> &str {
        &self.current_question
    }

    pub fn option_slots(&self) -> &[String; OPTION_SLOTS] {
        &self.option_slots
    }

    pub fn user_answers(&self) -> &BTreeMap<usize, String> {
        &self.user_answers
    }

    pub fn saved(&self) -> &[SavedComprehension] {
        &self.saved
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn set_passage(&mut self, passage: &str) -> bool {
        if self.step != ComprehensionStep::Create {
            return false;
        }
        self.passage = passage.to_string();
        true
    }

    pub fn set_current_question(&mut self, question: &str) -> bool {
        if self.step != ComprehensionStep::Create {
            return false;
        }
        self.current_question = question.to_string();
        true
    }

    pub fn set_option_slot(&mut self, slot: usize, text: &str) -> bool {
        if self.step != ComprehensionStep::Create || slot >= OPTION_SLOTS {
            return false;
        }
        self.option_slots[slot] = text.to_string();
        true
    }

    /// Adds the question being edited. Blank slots are dropped from the
    /// options; the correct answer is bound to the first slot regardless.
    pub fn add_question(&mut self) -> bool {
        if self.step != ComprehensionStep::Create {
            return false;
        }
        let slots = std::mem::take(&mut self.option_slots);
        let correct_answer = slots[0].trim().to_string();
        let options = slots
            .into_iter()
            .filter(|option| !option.trim().is_empty())
            .collect();

        self.questions.push(ComprehensionQuestion {
            question: std::mem::take(&mut self.current_question),
            options,
            correct_answer,
        });
        debug!(questions = self.questions.len(), "comprehension question added");
        true
    }

    /// Moves to the reader's view. Nothing checks that questions exist.
    pub fn start_attempt(&mut self) {
        self.step = ComprehensionStep::Attempt;
    }

    /// Records the reader's choice for question `index`, replacing any earlier
    /// one. The choice is stored as given; the screen only offers the
    /// question's own options.
    pub fn handle_answer(&mut self, index: usize, option: &str) -> bool {
        if self.step != ComprehensionStep::Attempt {
            return false;
        }
        self.user_answers.insert(index, option.to_string());
        true
    }

    pub fn payload(&self) -> ComprehensionPayload {
        ComprehensionPayload {
            passage: self.passage.clone(),
            questions: self.questions.clone(),
            user_answers: self.user_answers.clone(),
        }
    }

    /// On success the builder starts over from scratch, saved list included.
    /// On failure everything is kept and the server's reason is alerted.
    pub async fn submit<S: QuestionStore>(&mut self, store: &S) -> bool {
        if self.step != ComprehensionStep::Attempt {
            return false;
        }
        let result = store.save_comprehension(&self.payload()).await;
        self.apply_submit(result)
    }

    pub fn apply_submit(&mut self, result: Result<(), StoreError>) -> bool {
        match result {
            Ok(()) => {
                info!(questions = self.questions.len(), "comprehension saved");
                *self = Self::new();
                self.alert = Some(Alert::success(SAVED_MESSAGE));
                true
            }
            Err(err) => {
                error!(error = %err, "failed to save comprehension");
                self.alert = Some(Alert::failure(format!("Error: {}", err.user_message())));
                false
            }
        }
    }

    /// Loads saved records. A failure leaves the list empty and is only logged.
    pub async fn fetch_saved<S: QuestionStore>(&mut self, store: &S) {
        let result = store.fetch_comprehensions().await;
        self.apply_fetch(result);
    }

    pub fn apply_fetch(&mut self, result: Result<Vec<SavedComprehension>, StoreError>) {
        match result {
            Ok(saved) => {
                info!(records = saved.len(), "saved comprehensions loaded");
                self.saved = saved;
            }
            Err(err) => {
                error!(error = %err, "failed to fetch comprehensions");
            }
        }
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }
}

impl Default for ComprehensionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
