use std::sync::Arc;

use crate::backend::{QuestionStore, SavedComprehension, StoreError};
use crate::comprehension::{ComprehensionBuilder, ComprehensionStep, OPTION_SLOTS};
use crate::tui::terminal::{self, Tui, is_ctrl, is_quit};
use crate::tui::{ScreenAction, TextInput, Theme};
use crate::utils::pluralize;

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

use tokio::sync::mpsc;

/// Answers from the store, delivered to the screen between key presses.
enum Reply {
    Submitted(Result<(), StoreError>),
    Fetched(Result<Vec<SavedComprehension>, StoreError>),
}

pub fn run<S: QuestionStore + 'static>(store: Arc<S>) -> Result<()> {
    let mut terminal = terminal::setup()?;
    let result = event_loop(&mut terminal, &store);
    terminal::teardown(&mut terminal)?;
    result
}

fn event_loop<S: QuestionStore + 'static>(terminal: &mut Tui, store: &Arc<S>) -> Result<()> {
    let mut screen = ComprehensionScreen::new();
    screen.start_fetch(store);
    loop {
        screen.poll_replies();
        terminal
            .draw(|frame| screen.draw(frame))
            .context("failed to render frame")?;

        let Some(key) = terminal::next_key()? else {
            continue;
        };
        if is_quit(&key) {
            return Ok(());
        }
        match screen.handle_key(key) {
            ScreenAction::Continue => {}
            ScreenAction::Save => screen.start_submit(store),
            ScreenAction::Exit => return Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Passage,
    Question,
    Slot(usize),
}

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Passage => Field::Question,
            Field::Question => Field::Slot(0),
            Field::Slot(slot) if slot + 1 < OPTION_SLOTS => Field::Slot(slot + 1),
            Field::Slot(_) => Field::Passage,
        }
    }

    fn prev(self) -> Self {
        match self {
            Field::Passage => Field::Slot(OPTION_SLOTS - 1),
            Field::Question => Field::Passage,
            Field::Slot(0) => Field::Question,
            Field::Slot(slot) => Field::Slot(slot - 1),
        }
    }
}

struct ComprehensionScreen {
    builder: ComprehensionBuilder,
    passage_input: TextInput,
    question_input: TextInput,
    slot_inputs: [TextInput; OPTION_SLOTS],
    field: Field,
    selected_question: usize,
    selected_option: usize,
    replies_tx: mpsc::UnboundedSender<Reply>,
    replies: mpsc::UnboundedReceiver<Reply>,
}

impl ComprehensionScreen {
    fn new() -> Self {
        let (replies_tx, replies) = mpsc::unbounded_channel();
        Self {
            builder: ComprehensionBuilder::new(),
            passage_input: TextInput::multiline(),
            question_input: TextInput::new(),
            slot_inputs: Default::default(),
            field: Field::Passage,
            selected_question: 0,
            selected_option: 0,
            replies_tx,
            replies,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        if self.builder.alert().is_some() {
            self.builder.dismiss_alert();
            return ScreenAction::Continue;
        }
        match self.builder.step() {
            ComprehensionStep::Create => self.handle_create_key(key),
            ComprehensionStep::Attempt => self.handle_attempt_key(key),
        }
    }

    fn handle_create_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_ctrl(&key, 't') {
            self.builder.start_attempt();
            self.selected_question = 0;
            self.selected_option = 0;
            return ScreenAction::Continue;
        }
        if is_ctrl(&key, 'a') {
            self.add_question();
            return ScreenAction::Continue;
        }
        match key.code {
            KeyCode::Esc => return ScreenAction::Exit,
            KeyCode::Tab => self.field = self.field.next(),
            KeyCode::BackTab => self.field = self.field.prev(),
            KeyCode::Enter if self.field != Field::Passage => self.add_question(),
            _ => self.edit_field(key),
        }
        ScreenAction::Continue
    }

    fn edit_field(&mut self, key: KeyEvent) {
        match self.field {
            Field::Passage => {
                if self.passage_input.handle_key(key) {
                    self.builder.set_passage(self.passage_input.content());
                }
            }
            Field::Question => {
                if self.question_input.handle_key(key) {
                    self.builder
                        .set_current_question(self.question_input.content());
                }
            }
            Field::Slot(slot) => {
                if let Some(input) = self.slot_inputs.get_mut(slot)
                    && input.handle_key(key)
                {
                    self.builder.set_option_slot(slot, input.content());
                }
            }
        }
    }

    fn add_question(&mut self) {
        if self.builder.add_question() {
            self.question_input.clear();
            for input in &mut self.slot_inputs {
                input.clear();
            }
            self.field = Field::Question;
        }
    }

    fn handle_attempt_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_ctrl(&key, 's') {
            return ScreenAction::Save;
        }
        let question_count = self.builder.questions().len();
        let option_count = self
            .builder
            .questions()
            .get(self.selected_question)
            .map_or(0, |question| question.options.len());
        match key.code {
            KeyCode::Esc => return ScreenAction::Exit,
            KeyCode::Up if question_count > 0 => {
                self.selected_question = (self.selected_question + question_count - 1) % question_count;
                self.selected_option = 0;
            }
            KeyCode::Down if question_count > 0 => {
                self.selected_question = (self.selected_question + 1) % question_count;
                self.selected_option = 0;
            }
            KeyCode::Left if option_count > 0 => {
                self.selected_option = (self.selected_option + option_count - 1) % option_count;
            }
            KeyCode::Right if option_count > 0 => {
                self.selected_option = (self.selected_option + 1) % option_count;
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let choice = self
                    .builder
                    .questions()
                    .get(self.selected_question)
                    .and_then(|question| question.options.get(self.selected_option))
                    .cloned();
                if let Some(option) = choice {
                    self.builder.handle_answer(self.selected_question, &option);
                }
            }
            _ => {}
        }
        ScreenAction::Continue
    }

    fn start_fetch<S: QuestionStore + 'static>(&self, store: &Arc<S>) {
        let store = Arc::clone(store);
        let replies = self.replies_tx.clone();
        tokio::spawn(async move {
            let result = store.fetch_comprehensions().await;
            let _ = replies.send(Reply::Fetched(result));
        });
    }

    fn start_submit<S: QuestionStore + 'static>(&self, store: &Arc<S>) {
        if self.builder.step() != ComprehensionStep::Attempt {
            return;
        }
        let payload = self.builder.payload();
        let store = Arc::clone(store);
        let replies = self.replies_tx.clone();
        tokio::spawn(async move {
            let result = store.save_comprehension(&payload).await;
            let _ = replies.send(Reply::Submitted(result));
        });
    }

    fn poll_replies(&mut self) {
        while let Ok(reply) = self.replies.try_recv() {
            self.apply(reply);
        }
    }

    fn apply(&mut self, reply: Reply) {
        match reply {
            Reply::Fetched(result) => self.builder.apply_fetch(result),
            Reply::Submitted(result) => {
                if self.builder.apply_submit(result) {
                    self.passage_input.clear();
                    self.question_input.clear();
                    for input in &mut self.slot_inputs {
                        input.clear();
                    }
                    self.field = Field::Passage;
                    self.selected_question = 0;
                    self.selected_option = 0;
                }
            }
        }
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let area = frame.area();
        frame.render_widget(Theme::backdrop(), area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(10), Constraint::Length(5)])
            .split(area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(chunks[0]);

        match self.builder.step() {
            ComprehensionStep::Create => self.draw_create(frame, columns[0]),
            ComprehensionStep::Attempt => self.draw_attempt(frame, columns[0]),
        }
        frame.render_widget(
            Paragraph::new(saved_lines(self.builder.saved()))
                .block(Theme::panel("Saved comprehensions"))
                .wrap(Wrap { trim: true }),
            columns[1],
        );

        let help = Paragraph::new(self.instructions())
            .block(Theme::panel_with_line(Theme::section_header("Help")))
            .wrap(Wrap { trim: true });
        frame.render_widget(help, chunks[1]);

        if let Some(alert) = self.builder.alert() {
            Theme::draw_alert(frame, area, alert);
        }
    }

    fn draw_create(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut constraints = vec![Constraint::Length(5), Constraint::Length(3)];
        constraints.extend([Constraint::Length(3); OPTION_SLOTS]);
        constraints.push(Constraint::Min(0));
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        frame.render_widget(
            self.passage_input
                .widget("Passage", self.field == Field::Passage),
            rows[0],
        );
        frame.render_widget(
            self.question_input.widget(
                format!("Question {}", self.builder.questions().len() + 1).as_str(),
                self.field == Field::Question,
            ),
            rows[1],
        );
        for (slot, input) in self.slot_inputs.iter().enumerate() {
            let title = if slot == 0 {
                "Option 1 (correct answer)".to_string()
            } else {
                format!("Option {}", slot + 1)
            };
            frame.render_widget(
                input.widget(&title, self.field == Field::Slot(slot)),
                rows[2 + slot],
            );
        }

        let (input, input_area) = match self.field {
            Field::Passage => (&self.passage_input, rows[0]),
            Field::Question => (&self.question_input, rows[1]),
            Field::Slot(slot) => (&self.slot_inputs[slot], rows[2 + slot]),
        };
        if self.builder.alert().is_none() {
            frame.set_cursor_position(input.cursor_position(input_area));
        }
    }

    fn draw_attempt(&self, frame: &mut Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);

        frame.render_widget(
            Paragraph::new(self.builder.passage().to_string())
                .block(Theme::panel("Comprehension"))
                .wrap(Wrap { trim: false }),
            rows[0],
        );

        let mut lines = Vec::new();
        for (q_idx, question) in self.builder.questions().iter().enumerate() {
            let current = q_idx == self.selected_question;
            let header_style = if current {
                Theme::label()
            } else {
                Theme::emphasis()
            };
            lines.push(Line::from(Span::styled(
                format!("{}. {}", q_idx + 1, question.question),
                header_style,
            )));
            let chosen = self.builder.user_answers().get(&q_idx);
            let mut spans = Vec::with_capacity(question.options.len() * 2);
            for (o_idx, option) in question.options.iter().enumerate() {
                let mark = if chosen == Some(option) { "(•)" } else { "( )" };
                let style = if current && o_idx == self.selected_option {
                    Theme::selected()
                } else {
                    Theme::muted()
                };
                spans.push(Span::styled(format!("{mark} {option}"), style));
                spans.push(Theme::span("   "));
            }
            lines.push(Line::from(spans));
        }
        if lines.is_empty() {
            lines.push(Line::from(Span::styled(
                "No questions were added.",
                Theme::muted(),
            )));
        }
        frame.render_widget(
            Paragraph::new(lines)
                .block(Theme::panel("Questions"))
                .wrap(Wrap { trim: false }),
            rows[1],
        );
    }

    fn instructions(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        match self.builder.step() {
            ComprehensionStep::Create => {
                lines.push(Theme::key_hints(&[
                    ("Tab", "next field"),
                    ("Enter", "new line / add question"),
                    ("Ctrl+A", "add question"),
                    ("Ctrl+T", "start attempting"),
                    ("Esc", "exit"),
                ]));
                lines.push(Line::from(vec![
                    Theme::span("Added:"),
                    Theme::label_span(format!(
                        " {}",
                        pluralize("question", self.builder.questions().len())
                    )),
                ]));
            }
            ComprehensionStep::Attempt => {
                lines.push(Theme::key_hints(&[
                    ("↑/↓", "question"),
                    ("←/→", "option"),
                    ("Space", "answer"),
                    ("Ctrl+S", "submit answers"),
                    ("Esc", "exit"),
                ]));
            }
        }
        lines
    }
}

fn saved_lines(saved: &[SavedComprehension]) -> Vec<Line<'static>> {
    if saved.is_empty() {
        return vec![Line::from(Span::styled("Nothing saved yet.", Theme::muted()))];
    }
    let mut lines = Vec::new();
    for record in saved {
        lines.push(Line::from(Span::styled(
            record.passage.clone(),
            Theme::emphasis(),
        )));
        for (idx, question) in record.questions.iter().enumerate() {
            lines.push(Line::from(format!("{}. {}", idx + 1, question.question)));
            for option in &question.options {
                lines.push(Line::from(vec![Theme::bullet(), Theme::span(option.clone())]));
            }
        }
        lines.push(Line::from(""));
    }
    lines
}
