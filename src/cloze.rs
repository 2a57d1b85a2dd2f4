//! Cloze questions: the author writes a sentence, marks words as blanks and
//! lists candidate options per blank. In attempt mode options are dragged onto
//! blanks; the filled question is saved in one request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::assignment::{
    Assignments, DragPayload, ReplaceAssignments, accept_transfer, begin_transfer,
};
use crate::backend::{ClozePayload, QuestionStore, StoreError};
use crate::cloze_utils::{fill_word, mask_word, split_options, split_words};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClozeWord {
    pub index: usize,
    pub text: String,
    pub is_blank: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClozePhase {
    Input,
    Editing,
    Attempt,
    /// Saved. Nothing can change any more.
    Finished,
}

/// What travels with a dragged option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionToken {
    pub text: String,
}

#[derive(Debug)]
pub struct ClozeBuilder {
    phase: ClozePhase,
    sentence: String,
    words: Vec<ClozeWord>,
    blanks: Vec<usize>,
    options: BTreeMap<usize, Vec<String>>,
    answers: ReplaceAssignments<usize, String>,
}

impl ClozeBuilder {
    pub fn new() -> Self {
        Self {
            phase: ClozePhase::Input,
            sentence: String::new(),
            words: Vec::new(),
            blanks: Vec::new(),
            options: BTreeMap::new(),
            answers: ReplaceAssignments::new(),
        }
    }

    pub fn phase(&self) -> ClozePhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == ClozePhase::Finished
    }

    pub fn sentence(&self) -> &str {
        &self.sentence
    }

    pub fn words(&self) -> &[ClozeWord] {
        &self.words
    }

    /// Blank indices in the order they were marked.
    pub fn blanks(&self) -> &[usize] {
        &self.blanks
    }

    pub fn blank_options(&self, index: usize) -> Option<&[String]> {
        self.options.get(&index).map(Vec::as_slice)
    }

    pub fn answer(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    pub fn answers(&self) -> &BTreeMap<usize, String> {
        self.answers.as_map()
    }

    fn is_authoring(&self) -> bool {
        matches!(self.phase, ClozePhase::Input | ClozePhase::Editing)
    }

    pub fn set_sentence(&mut self, sentence: &str) -> bool {
        if !self.is_authoring() {
            return false;
        }
        self.sentence = sentence.to_string();
        true
    }

    /// Re-tokenizes the sentence. Any marking, options and answers from an
    /// earlier generation are thrown away.
    pub fn generate_question(&mut self) -> bool {
        if !self.is_authoring() {
            return false;
        }
        self.words = split_words(&self.sentence)
            .into_iter()
            .enumerate()
            .map(|(index, text)| ClozeWord {
                index,
                text: text.to_string(),
                is_blank: false,
            })
            .collect();
        self.blanks.clear();
        self.options.clear();
        self.answers.clear();
        self.phase = ClozePhase::Editing;
        debug!(words = self.words.len(), "cloze question generated");
        true
    }

    /// Marking the same word twice has no further effect.
    pub fn mark_blank(&mut self, index: usize) -> bool {
        if self.phase != ClozePhase::Editing {
            return false;
        }
        let Some(word) = self.words.get_mut(index) else {
            return false;
        };
        word.is_blank = true;
        if !self.blanks.contains(&index) {
            self.blanks.push(index);
            self.options.insert(index, Vec::new());
        }
        true
    }

    pub fn set_blank_options(&mut self, index: usize, csv: &str) -> bool {
        if self.phase != ClozePhase::Editing || !self.blanks.contains(&index) {
            return false;
        }
        self.options.insert(index, split_options(csv));
        true
    }

    pub fn switch_to_attempt(&mut self) -> bool {
        if self.phase != ClozePhase::Editing {
            return false;
        }
        self.phase = ClozePhase::Attempt;
        debug!(blanks = self.blanks.len(), "cloze attempt started");
        true
    }

    pub fn begin_drag(&self, text: &str) -> Option<DragPayload> {
        if self.phase != ClozePhase::Attempt {
            return None;
        }
        begin_transfer(&OptionToken {
            text: text.to_string(),
        })
    }

    pub fn drop_option(&mut self, blank: usize, payload: &DragPayload) -> bool {
        match accept_transfer::<OptionToken>(payload) {
            Some(token) => self.drop_text(blank, &token.text),
            None => {
                debug!(blank, "rejected malformed drag payload");
                false
            }
        }
    }

    /// Places `text` on a blank, replacing whatever was there.
    pub fn drop_text(&mut self, blank: usize, text: &str) -> bool {
        if self.phase != ClozePhase::Attempt || !self.blanks.contains(&blank) {
            return false;
        }
        self.answers.assign(blank, text.to_string())
    }

    pub fn payload(&self) -> ClozePayload {
        ClozePayload {
            question: self.sentence.clone(),
            blanks: self.blanks.clone(),
            options: self.options.clone(),
            answers: self.answers.as_map().clone(),
        }
    }

    /// Sends the question. Failures are only logged; the builder stays in
    /// attempt mode so the save can be repeated.
    pub async fn save<S: QuestionStore>(&mut self, store: &S) -> bool {
        if self.phase != ClozePhase::Attempt {
            return false;
        }
        let result = store.save_cloze(&self.payload()).await;
        self.apply_save(result)
    }

    /// Applies the outcome of a save request. A reply that arrives after the
    /// question already finished is only logged.
    pub fn apply_save(&mut self, result: Result<Option<String>, StoreError>) -> bool {
        match result {
            Ok(message) => {
                info!(
                    server_message = message.as_deref().unwrap_or_default(),
                    sentence = %self.rendered_sentence(),
                    "cloze question saved"
                );
                if self.phase != ClozePhase::Attempt {
                    return false;
                }
                self.phase = ClozePhase::Finished;
                true
            }
            Err(err) => {
                error!(error = %err, "failed to save cloze question");
                false
            }
        }
    }

    /// How `word` reads right now: a blank is masked, or shows its answer.
    pub fn render_word(&self, word: &ClozeWord) -> String {
        if !word.is_blank {
            return word.text.clone();
        }
        match self.answer(word.index) {
            Some(answer) => fill_word(answer),
            None => mask_word(&word.text),
        }
    }

    pub fn rendered_sentence(&self) -> String {
        self.words
            .iter()
            .map(|word| self.render_word(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for ClozeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
