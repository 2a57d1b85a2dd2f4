use std::sync::Arc;

use crate::assignment::DragSession;
use crate::backend::{QuestionStore, StoreError};
use crate::cloze::{ClozeBuilder, ClozePhase};
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

pub const FINISHED_MESSAGE: &str = "Answers saved successfully!";

type SaveReply = Result<Option<String>, StoreError>;

pub fn run<S: QuestionStore + 'static>(store: Arc<S>) -> Result<()> {
    let mut terminal = terminal::setup()?;
    let result = event_loop(&mut terminal, &store);
    terminal::teardown(&mut terminal)?;
    result
}

fn event_loop<S: QuestionStore + 'static>(terminal: &mut Tui, store: &Arc<S>) -> Result<()> {
    let mut screen = ClozeScreen::new();
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
            ScreenAction::Save => screen.start_save(store),
            ScreenAction::Exit => return Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Focus {
    Sentence,
    Words,
    BlankOptions,
}

struct ClozeScreen {
    builder: ClozeBuilder,
    sentence_input: TextInput,
    focus: Focus,
    selected_word: usize,
    /// One field per marked blank, in marking order.
    option_inputs: Vec<TextInput>,
    selected_blank: usize,
    selected_token: usize,
    hovered_blank: usize,
    /// Keyed by the blank's word index.
    drag: DragSession<usize>,
    replies_tx: mpsc::UnboundedSender<SaveReply>,
    replies: mpsc::UnboundedReceiver<SaveReply>,
}

impl ClozeScreen {
    fn new() -> Self {
        let (replies_tx, replies) = mpsc::unbounded_channel();
        Self {
            builder: ClozeBuilder::new(),
            sentence_input: TextInput::new(),
            focus: Focus::Sentence,
            selected_word: 0,
            option_inputs: Vec::new(),
            selected_blank: 0,
            selected_token: 0,
            hovered_blank: 0,
            drag: DragSession::new(),
            replies_tx,
            replies,
        }
    }

    /// Sends the question unless it already finished. While a request is
    /// pending the reader can keep moving answers, and saving again sends
    /// another request.
    fn start_save<S: QuestionStore + 'static>(&self, store: &Arc<S>) {
        if self.builder.phase() != ClozePhase::Attempt {
            return;
        }
        let payload = self.builder.payload();
        let store = Arc::clone(store);
        let replies = self.replies_tx.clone();
        tokio::spawn(async move {
            let result = store.save_cloze(&payload).await;
            let _ = replies.send(result);
        });
    }

    fn poll_replies(&mut self) {
        while let Ok(result) = self.replies.try_recv() {
            if self.builder.apply_save(result) {
                self.drag.cancel();
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        match self.builder.phase() {
            ClozePhase::Input | ClozePhase::Editing => self.handle_authoring_key(key),
            ClozePhase::Attempt => self.handle_attempt_key(key),
            ClozePhase::Finished => match key.code {
                KeyCode::Esc | KeyCode::Enter => ScreenAction::Exit,
                _ => ScreenAction::Continue,
            },
        }
    }

    fn handle_authoring_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_ctrl(&key, 't') {
            self.apply_blank_options();
            if self.builder.switch_to_attempt() {
                self.selected_token = 0;
                self.hovered_blank = 0;
            }
            return ScreenAction::Continue;
        }
        match key.code {
            KeyCode::Esc => return ScreenAction::Exit,
            KeyCode::Tab => self.cycle_focus(),
            _ => match self.focus {
                Focus::Sentence => self.handle_sentence_key(key),
                Focus::Words => self.handle_words_key(key),
                Focus::BlankOptions => self.handle_options_key(key),
            },
        }
        ScreenAction::Continue
    }

    fn handle_sentence_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Enter {
            if self.builder.generate_question() {
                self.option_inputs.clear();
                self.selected_word = 0;
                self.selected_blank = 0;
                if !self.builder.words().is_empty() {
                    self.focus = Focus::Words;
                }
            }
            return;
        }
        if self.sentence_input.handle_key(key) {
            self.builder.set_sentence(self.sentence_input.content());
        }
    }

    fn handle_words_key(&mut self, key: KeyEvent) {
        let count = self.builder.words().len();
        if count == 0 {
            return;
        }
        match key.code {
            KeyCode::Left => self.selected_word = (self.selected_word + count - 1) % count,
            KeyCode::Right => self.selected_word = (self.selected_word + 1) % count,
            KeyCode::Char(' ') | KeyCode::Enter => {
                let before = self.builder.blanks().len();
                if self.builder.mark_blank(self.selected_word)
                    && self.builder.blanks().len() > before
                {
                    self.option_inputs.push(TextInput::new());
                }
            }
            _ => {}
        }
    }

    fn handle_options_key(&mut self, key: KeyEvent) {
        let count = self.option_inputs.len();
        if count == 0 {
            return;
        }
        match key.code {
            KeyCode::Up => {
                self.apply_blank_options();
                self.selected_blank = (self.selected_blank + count - 1) % count;
            }
            KeyCode::Down => {
                self.apply_blank_options();
                self.selected_blank = (self.selected_blank + 1) % count;
            }
            KeyCode::Enter => self.apply_blank_options(),
            _ => {
                if let Some(input) = self.option_inputs.get_mut(self.selected_blank) {
                    input.handle_key(key);
                }
            }
        }
    }

    /// Leaving a blank's options field commits what was typed there.
    fn apply_blank_options(&mut self) {
        if self.focus != Focus::BlankOptions {
            return;
        }
        if let Some(&blank) = self.builder.blanks().get(self.selected_blank)
            && let Some(input) = self.option_inputs.get(self.selected_blank)
        {
            let csv = input.content().to_string();
            self.builder.set_blank_options(blank, &csv);
        }
    }

    fn cycle_focus(&mut self) {
        self.apply_blank_options();
        let has_words = !self.builder.words().is_empty();
        let has_blanks = !self.option_inputs.is_empty();
        self.focus = match self.focus {
            Focus::Sentence if has_words => Focus::Words,
            Focus::Words if has_blanks => Focus::BlankOptions,
            _ => Focus::Sentence,
        };
    }

    /// Every option of every blank, grouped by blank.
    fn tokens(&self) -> Vec<(usize, &str)> {
        self.builder
            .blanks()
            .iter()
            .flat_map(|&blank| {
                self.builder
                    .blank_options(blank)
                    .unwrap_or_default()
                    .iter()
                    .map(move |option| (blank, option.as_str()))
            })
            .collect()
    }

    fn handle_attempt_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_ctrl(&key, 's') {
            self.drag.cancel();
            return ScreenAction::Save;
        }
        let token_count = self.tokens().len();
        match key.code {
            KeyCode::Esc => {
                if !self.drag.is_dragging() {
                    return ScreenAction::Exit;
                }
                self.drag.cancel();
            }
            KeyCode::Up if token_count > 0 => {
                self.selected_token = (self.selected_token + token_count - 1) % token_count;
            }
            KeyCode::Down if token_count > 0 => {
                self.selected_token = (self.selected_token + 1) % token_count;
            }
            KeyCode::Char(' ') if !self.drag.is_dragging() => {
                let payload = self
                    .tokens()
                    .get(self.selected_token)
                    .and_then(|(_, text)| self.builder.begin_drag(text));
                if let Some(payload) = payload {
                    self.drag.begin(payload);
                    self.hover_current();
                }
            }
            KeyCode::Left | KeyCode::BackTab => self.move_hover(false),
            KeyCode::Right | KeyCode::Tab => self.move_hover(true),
            KeyCode::Enter => {
                if let Some((blank, payload)) = self.drag.release() {
                    self.builder.drop_option(blank, &payload);
                }
            }
            _ => {}
        }
        ScreenAction::Continue
    }

    fn move_hover(&mut self, forward: bool) {
        let count = self.builder.blanks().len();
        if count == 0 {
            return;
        }
        self.hovered_blank = if forward {
            (self.hovered_blank + 1) % count
        } else {
            (self.hovered_blank + count - 1) % count
        };
        self.hover_current();
    }

    fn hover_current(&mut self) {
        if !self.drag.is_dragging() {
            return;
        }
        match self.builder.blanks().get(self.hovered_blank) {
            Some(&blank) => {
                self.drag.drag_over(blank);
            }
            None => self.drag.drag_leave(),
        }
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let area = frame.area();
        frame.render_widget(Theme::backdrop(), area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(5)])
            .split(area);

        match self.builder.phase() {
            ClozePhase::Input | ClozePhase::Editing => self.draw_authoring(frame, chunks[0]),
            ClozePhase::Attempt | ClozePhase::Finished => self.draw_attempt(frame, chunks[0]),
        }

        let help = Paragraph::new(self.instructions())
            .block(Theme::panel_with_line(Theme::section_header("Help")))
            .wrap(Wrap { trim: true });
        frame.render_widget(help, chunks[1]);
    }

    fn draw_authoring(&self, frame: &mut Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(4),
                Constraint::Min(3),
            ])
            .split(area);

        frame.render_widget(
            self.sentence_input
                .widget("Question", self.focus == Focus::Sentence),
            rows[0],
        );

        let words: Vec<Span> = self
            .builder
            .words()
            .iter()
            .flat_map(|word| {
                let style = if self.focus == Focus::Words && word.index == self.selected_word {
                    Theme::selected()
                } else if word.is_blank {
                    Theme::blank()
                } else {
                    Theme::emphasis()
                };
                [Span::styled(word.text.clone(), style), Theme::span(" ")]
            })
            .collect();
        frame.render_widget(
            Paragraph::new(Line::from(words))
                .block(Theme::highlighted_panel(
                    "Mark blanks",
                    self.focus == Focus::Words,
                ))
                .wrap(Wrap { trim: false }),
            rows[1],
        );

        let mut option_lines = Vec::with_capacity(self.option_inputs.len());
        let mut cursor = None;
        for (pos, (blank, input)) in self
            .builder
            .blanks()
            .iter()
            .zip(&self.option_inputs)
            .enumerate()
        {
            let prefix = format!("Blank {}: ", pos + 1);
            let editing = self.focus == Focus::BlankOptions && pos == self.selected_blank;
            if editing {
                let x = rows[2].x + 1 + (prefix.chars().count() + input.cursor()) as u16;
                let y = rows[2].y + 1 + pos as u16;
                cursor = Some((x, y));
            }
            let word = self
                .builder
                .words()
                .get(*blank)
                .map(|word| word.text.as_str())
                .unwrap_or_default();
            option_lines.push(Line::from(vec![
                Theme::label_span(prefix),
                Span::styled(
                    input.content().to_string(),
                    if editing {
                        Theme::emphasis()
                    } else {
                        Theme::muted()
                    },
                ),
                Span::styled(format!("  ({word})"), Theme::muted()),
            ]));
        }
        if option_lines.is_empty() {
            option_lines.push(Line::from(Span::styled(
                "Mark a word to give it options, separated by commas.",
                Theme::muted(),
            )));
        }
        frame.render_widget(
            Paragraph::new(option_lines).block(Theme::highlighted_panel(
                "Options per blank",
                self.focus == Focus::BlankOptions,
            )),
            rows[2],
        );

        match self.focus {
            Focus::Sentence => {
                frame.set_cursor_position(self.sentence_input.cursor_position(rows[0]));
            }
            Focus::BlankOptions => {
                if let Some(position) = cursor {
                    frame.set_cursor_position(position);
                }
            }
            Focus::Words => {}
        }
    }

    fn draw_attempt(&self, frame: &mut Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(3)])
            .split(area);

        let sentence: Vec<Span> = self
            .builder
            .words()
            .iter()
            .flat_map(|word| {
                let text = self.builder.render_word(word);
                let span = if !word.is_blank {
                    Theme::span(text)
                } else if self.drag.is_over(&word.index) {
                    Span::styled(text, Theme::selected())
                } else {
                    Span::styled(text, Theme::blank())
                };
                [span, Theme::span(" ")]
            })
            .collect();
        frame.render_widget(
            Paragraph::new(Line::from(sentence))
                .block(Theme::panel("Attempt the question"))
                .wrap(Wrap { trim: false }),
            rows[0],
        );

        let mut lines = Vec::new();
        let mut flat_idx = 0;
        for (pos, &blank) in self.builder.blanks().iter().enumerate() {
            let mut spans = vec![Theme::label_span(format!("Blank {} options: ", pos + 1))];
            for option in self.builder.blank_options(blank).unwrap_or_default() {
                let style = if flat_idx != self.selected_token {
                    Theme::emphasis()
                } else if self.drag.is_dragging() {
                    Theme::carried()
                } else {
                    Theme::selected()
                };
                spans.push(Span::styled(format!(" {option} "), style));
                spans.push(Theme::span(" "));
                flat_idx += 1;
            }
            lines.push(Line::from(spans));
        }
        if self.builder.is_finished() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(FINISHED_MESSAGE, Theme::success())));
            lines.push(Line::from(vec![
                Theme::span("Saved as: "),
                Theme::label_span(self.builder.rendered_sentence()),
            ]));
        }
        frame.render_widget(
            Paragraph::new(lines)
                .block(Theme::panel("Options"))
                .wrap(Wrap { trim: false }),
            rows[1],
        );
    }

    fn instructions(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        match self.builder.phase() {
            ClozePhase::Input | ClozePhase::Editing => {
                let hints: &[(&str, &str)] = match self.focus {
                    Focus::Sentence => &[("Enter", "generate question"), ("Tab", "next")],
                    Focus::Words => &[("←/→", "choose word"), ("Space", "mark blank"), ("Tab", "next")],
                    Focus::BlankOptions => &[("↑/↓", "choose blank"), ("Enter", "apply"), ("Tab", "next")],
                };
                lines.push(Theme::key_hints(hints));
                lines.push(Line::from(vec![
                    Theme::key_chip("Ctrl+T"),
                    Theme::span(" attempt mode"),
                    Theme::bullet(),
                    Theme::key_chip("Esc"),
                    Theme::span(" / "),
                    Theme::key_chip("Ctrl+C"),
                    Theme::span(" exit"),
                    Theme::bullet(),
                    Theme::label_span(pluralize("blank", self.builder.blanks().len())),
                ]));
            }
            ClozePhase::Attempt if self.drag.is_dragging() => {
                lines.push(Theme::key_hints(&[
                    ("←/→", "choose blank"),
                    ("Enter", "drop"),
                    ("Esc", "cancel drag"),
                ]));
            }
            ClozePhase::Attempt => {
                lines.push(Theme::key_hints(&[
                    ("↑/↓", "choose option"),
                    ("Space", "pick up"),
                    ("Ctrl+S", "save answers"),
                    ("Esc", "exit"),
                ]));
            }
            ClozePhase::Finished => {
                lines.push(Theme::key_hints(&[("Esc", "exit")]));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::backend::fake::FakeStore;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(screen: &mut ClozeScreen, text: &str) {
        for ch in text.chars() {
            screen.handle_key(key(KeyCode::Char(ch)));
        }
    }

    /// "the cat sat" with "cat" marked and options "cat, dog".
    fn edited_screen() -> ClozeScreen {
        let mut screen = ClozeScreen::new();
        type_text(&mut screen, "the cat sat");
        screen.handle_key(key(KeyCode::Enter));
        screen.handle_key(key(KeyCode::Right));
        screen.handle_key(key(KeyCode::Char(' ')));
        screen.handle_key(key(KeyCode::Tab));
        type_text(&mut screen, "cat, dog");
        screen
    }

    #[test]
    fn enter_generates_and_moves_to_the_word_strip() {
        let mut screen = ClozeScreen::new();
        type_text(&mut screen, "the cat sat");
        assert_eq!(screen.builder.sentence(), "the cat sat");
        screen.handle_key(key(KeyCode::Enter));
        assert_eq!(screen.builder.phase(), ClozePhase::Editing);
        assert_eq!(screen.builder.words().len(), 3);
        assert_eq!(screen.focus, Focus::Words);
    }

    #[test]
    fn marking_twice_keeps_one_options_field() {
        let mut screen = ClozeScreen::new();
        type_text(&mut screen, "the cat sat");
        screen.handle_key(key(KeyCode::Enter));
        screen.handle_key(key(KeyCode::Right));
        screen.handle_key(key(KeyCode::Char(' ')));
        screen.handle_key(key(KeyCode::Enter));
        assert_eq!(screen.builder.blanks(), [1]);
        assert_eq!(screen.option_inputs.len(), 1);
    }

    #[test]
    fn options_are_applied_when_the_field_is_left() {
        let mut screen = edited_screen();
        assert_eq!(screen.builder.blank_options(1), Some(&[][..]));
        screen.handle_key(key(KeyCode::Tab));
        assert_eq!(screen.focus, Focus::Sentence);
        assert_eq!(
            screen.builder.blank_options(1),
            Some(&["cat".to_string(), "dog".to_string()][..])
        );
    }

    #[test]
    fn dropping_onto_a_blank_replaces_its_answer() {
        let mut screen = edited_screen();
        screen.handle_key(ctrl('t'));
        assert_eq!(screen.builder.phase(), ClozePhase::Attempt);
        assert_eq!(screen.tokens(), [(1, "cat"), (1, "dog")]);

        screen.handle_key(key(KeyCode::Char(' ')));
        assert!(screen.drag.is_over(&1));
        screen.handle_key(key(KeyCode::Enter));
        assert_eq!(screen.builder.answer(1), Some("cat"));

        screen.handle_key(key(KeyCode::Down));
        screen.handle_key(key(KeyCode::Char(' ')));
        screen.handle_key(key(KeyCode::Enter));
        assert_eq!(screen.builder.answer(1), Some("dog"));
        assert_eq!(screen.builder.rendered_sentence(), "the [dog] sat");
    }

    #[test]
    fn sentence_is_frozen_in_attempt_mode() {
        let mut screen = edited_screen();
        screen.handle_key(ctrl('t'));
        type_text(&mut screen, "x");
        assert_eq!(screen.builder.sentence(), "the cat sat");
        assert_eq!(screen.handle_key(ctrl('s')), ScreenAction::Save);
    }

    #[tokio::test]
    async fn saving_finishes_the_question() {
        let mut screen = edited_screen();
        screen.handle_key(ctrl('t'));
        screen.handle_key(key(KeyCode::Char(' ')));
        screen.handle_key(key(KeyCode::Enter));

        let store = Arc::new(FakeStore::ok());
        screen.start_save(&store);
        let reply = screen.replies.recv().await.unwrap();
        assert!(screen.builder.apply_save(reply));
        assert!(screen.builder.is_finished());
        assert_eq!(store.last_body().unwrap()["answers"]["1"], "cat");

        screen.start_save(&store);
        tokio::task::yield_now().await;
        assert_eq!(store.request_count(), 1);
        assert_eq!(screen.handle_key(key(KeyCode::Char(' '))), ScreenAction::Continue);
        assert_eq!(screen.handle_key(key(KeyCode::Esc)), ScreenAction::Exit);
    }

    #[test]
    fn attempt_view_shows_masked_then_filled_blanks() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let mut screen = edited_screen();
        screen.handle_key(ctrl('t'));
        let drawn = |terminal: &mut Terminal<TestBackend>, screen: &ClozeScreen| {
            terminal.draw(|frame| screen.draw(frame)).unwrap();
            let buffer = terminal.backend().buffer();
            buffer.content.iter().map(|cell| cell.symbol()).collect::<String>()
        };

        assert!(drawn(&mut terminal, &screen).contains("the [___] sat"));
        screen.handle_key(key(KeyCode::Char(' ')));
        screen.handle_key(key(KeyCode::Enter));
        assert!(drawn(&mut terminal, &screen).contains("the [cat] sat"));

        assert!(screen.builder.apply_save(Ok(None)));
        assert!(drawn(&mut terminal, &screen).contains("Saved as: the [cat] sat"));
    }

    #[tokio::test]
    async fn answers_can_move_while_a_save_is_pending() {
        let mut screen = edited_screen();
        screen.handle_key(ctrl('t'));
        screen.handle_key(key(KeyCode::Char(' ')));
        screen.handle_key(key(KeyCode::Enter));

        let store = Arc::new(FakeStore::pending());
        screen.start_save(&store);
        tokio::task::yield_now().await;
        assert_eq!(store.request_count(), 1);

        screen.handle_key(key(KeyCode::Down));
        screen.handle_key(key(KeyCode::Char(' ')));
        screen.handle_key(key(KeyCode::Enter));
        screen.poll_replies();
        assert_eq!(screen.builder.phase(), ClozePhase::Attempt);
        assert_eq!(screen.builder.answer(1), Some("dog"));
    }
}
