use std::sync::Arc;

use crate::assignment::DragSession;
use crate::backend::{QuestionStore, StoreError};
use crate::categorization::{CategorizationBuilder, CategorizationPhase};
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

/// Runs the categorization screen. Saves go out on their own task, so keys
/// keep being handled while a request is pending.
pub fn run<S: QuestionStore + 'static>(store: Arc<S>) -> Result<()> {
    let mut terminal = terminal::setup()?;
    let result = event_loop(&mut terminal, &store);
    terminal::teardown(&mut terminal)?;
    result
}

fn event_loop<S: QuestionStore + 'static>(terminal: &mut Tui, store: &Arc<S>) -> Result<()> {
    let mut screen = CategorizeScreen::new();
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
enum Field {
    Category,
    Option,
}

struct CategorizeScreen {
    builder: CategorizationBuilder,
    category_input: TextInput,
    option_input: TextInput,
    focus: Field,
    selected_option: usize,
    hovered_category: usize,
    drag: DragSession<usize>,
    replies_tx: mpsc::UnboundedSender<Result<(), StoreError>>,
    replies: mpsc::UnboundedReceiver<Result<(), StoreError>>,
}

impl CategorizeScreen {
    fn new() -> Self {
        let (replies_tx, replies) = mpsc::unbounded_channel();
        Self {
            builder: CategorizationBuilder::new(),
            category_input: TextInput::new(),
            option_input: TextInput::new(),
            focus: Field::Category,
            selected_option: 0,
            hovered_category: 0,
            drag: DragSession::new(),
            replies_tx,
            replies,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> ScreenAction {
        if self.builder.alert().is_some() {
            self.builder.dismiss_alert();
            return ScreenAction::Continue;
        }
        match self.builder.phase() {
            CategorizationPhase::Authoring => self.handle_authoring_key(key),
            CategorizationPhase::Categorizing => self.handle_categorizing_key(key),
        }
    }

    fn handle_authoring_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_ctrl(&key, 't') {
            self.builder.start_categorization();
            return ScreenAction::Continue;
        }
        match key.code {
            KeyCode::Esc => return ScreenAction::Exit,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Field::Category => Field::Option,
                    Field::Option => Field::Category,
                };
            }
            KeyCode::Enter => match self.focus {
                Field::Category => {
                    if self.builder.add_category_from_form() {
                        self.category_input.clear();
                    }
                }
                Field::Option => {
                    if self.builder.add_option_from_form() {
                        self.option_input.clear();
                    }
                }
            },
            _ => match self.focus {
                Field::Category => {
                    if self.category_input.handle_key(key) {
                        self.builder.form.category_name = self.category_input.content().to_string();
                    }
                }
                Field::Option => {
                    if self.option_input.handle_key(key) {
                        self.builder.form.option_name = self.option_input.content().to_string();
                    }
                }
            },
        }
        ScreenAction::Continue
    }

    fn handle_categorizing_key(&mut self, key: KeyEvent) -> ScreenAction {
        if is_ctrl(&key, 's') {
            self.drag.cancel();
            return ScreenAction::Save;
        }
        let option_count = self.builder.options().len();
        match key.code {
            KeyCode::Esc => {
                if !self.drag.is_dragging() {
                    return ScreenAction::Exit;
                }
                self.drag.cancel();
            }
            KeyCode::Up if option_count > 0 => {
                self.selected_option = (self.selected_option + option_count - 1) % option_count;
            }
            KeyCode::Down if option_count > 0 => {
                self.selected_option = (self.selected_option + 1) % option_count;
            }
            KeyCode::Char(' ') if !self.drag.is_dragging() => {
                if let Some(payload) = self.builder.begin_drag(self.selected_option) {
                    self.drag.begin(payload);
                    self.hover_current();
                }
            }
            KeyCode::Left | KeyCode::BackTab => self.move_hover(false),
            KeyCode::Right | KeyCode::Tab => self.move_hover(true),
            KeyCode::Enter => {
                if let Some((target, payload)) = self.drag.release()
                    && let Some(category) = self.builder.categories().get(target)
                {
                    let name = category.name.clone();
                    self.builder.drop_option(&name, &payload);
                }
            }
            _ => {}
        }
        ScreenAction::Continue
    }

    fn move_hover(&mut self, forward: bool) {
        let count = self.builder.categories().len();
        if count == 0 {
            return;
        }
        self.hovered_category = if forward {
            (self.hovered_category + 1) % count
        } else {
            (self.hovered_category + count - 1) % count
        };
        self.hover_current();
    }

    fn hover_current(&mut self) {
        if !self.drag.is_dragging() {
            return;
        }
        if self.hovered_category < self.builder.categories().len() {
            self.drag.drag_over(self.hovered_category);
        } else {
            self.drag.drag_leave();
        }
    }

    /// Sends the board as it is now. Every call is a new request.
    fn start_save<S: QuestionStore + 'static>(&self, store: &Arc<S>) {
        let payload = self.builder.payload();
        let store = Arc::clone(store);
        let replies = self.replies_tx.clone();
        tokio::spawn(async move {
            let result = store.save_categorization(&payload).await;
            let _ = replies.send(result);
        });
    }

    fn poll_replies(&mut self) {
        while let Ok(result) = self.replies.try_recv() {
            self.apply_save(result);
        }
    }

    fn apply_save(&mut self, result: Result<(), StoreError>) {
        if self.builder.apply_save(result) {
            self.category_input.clear();
            self.option_input.clear();
            self.focus = Field::Category;
            self.selected_option = 0;
            self.hovered_category = 0;
            self.drag.cancel();
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
            CategorizationPhase::Authoring => self.draw_authoring(frame, chunks[0]),
            CategorizationPhase::Categorizing => self.draw_board(frame, chunks[0]),
        }

        let help = Paragraph::new(self.instructions())
            .block(Theme::panel_with_line(Theme::section_header("Help")))
            .wrap(Wrap { trim: true });
        frame.render_widget(help, chunks[1]);

        if let Some(alert) = self.builder.alert() {
            Theme::draw_alert(frame, area, alert);
        }
    }

    fn draw_authoring(&self, frame: &mut Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(3),
            ])
            .split(area);

        let category_focused = self.focus == Field::Category;
        frame.render_widget(
            self.category_input.widget("Category name", category_focused),
            rows[0],
        );
        frame.render_widget(
            self.option_input.widget("Option name", !category_focused),
            rows[1],
        );

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[2]);
        let categories: Vec<Line> = self
            .builder
            .categories()
            .iter()
            .map(|category| Line::from(vec![Theme::bullet(), Theme::span(category.name.clone())]))
            .collect();
        let options: Vec<Line> = self
            .builder
            .options()
            .iter()
            .map(|option| Line::from(vec![Theme::bullet(), Theme::span(option.name.clone())]))
            .collect();
        frame.render_widget(
            Paragraph::new(categories).block(Theme::panel("Categories")),
            columns[0],
        );
        frame.render_widget(
            Paragraph::new(options).block(Theme::panel("Options")),
            columns[1],
        );

        let (input, input_area) = match self.focus {
            Field::Category => (&self.category_input, rows[0]),
            Field::Option => (&self.option_input, rows[1]),
        };
        if self.builder.alert().is_none() {
            frame.set_cursor_position(input.cursor_position(input_area));
        }
    }

    fn draw_board(&self, frame: &mut Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(area);

        let pool: Vec<Line> = self
            .builder
            .options()
            .iter()
            .enumerate()
            .map(|(idx, option)| {
                let style = if idx != self.selected_option {
                    Theme::emphasis()
                } else if self.drag.is_dragging() {
                    Theme::carried()
                } else {
                    Theme::selected()
                };
                Line::from(Span::styled(option.name.clone(), style))
            })
            .collect();
        frame.render_widget(
            Paragraph::new(pool).block(Theme::panel("Options")),
            columns[0],
        );

        let categories = self.builder.categories();
        if categories.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "No categories were added.",
                    Theme::muted(),
                )))
                .block(Theme::panel("Categories")),
                columns[1],
            );
            return;
        }
        let constraints = vec![Constraint::Ratio(1, categories.len() as u32); categories.len()];
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(columns[1]);
        for (idx, category) in categories.iter().enumerate() {
            let items: Vec<Line> = self
                .builder
                .category_items(&category.name)
                .iter()
                .map(|option| Line::from(vec![Theme::bullet(), Theme::span(option.name.clone())]))
                .collect();
            let active = self.drag.is_over(&idx)
                || (!self.drag.is_dragging() && idx == self.hovered_category);
            let widget = Paragraph::new(items)
                .block(Theme::highlighted_panel(category.name.clone(), active))
                .wrap(Wrap { trim: true });
            frame.render_widget(widget, cells[idx]);
        }
    }

    fn instructions(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        match self.builder.phase() {
            CategorizationPhase::Authoring => {
                lines.push(Theme::key_hints(&[
                    ("Enter", "add"),
                    ("Tab", "switch field"),
                    ("Ctrl+T", "start categorizing"),
                    ("Esc", "exit"),
                ]));
                lines.push(Line::from(vec![
                    Theme::span("Board:"),
                    Theme::label_span(format!(
                        " {}",
                        pluralize("category", self.builder.categories().len())
                    )),
                    Theme::bullet(),
                    Theme::label_span(pluralize("option", self.builder.options().len())),
                ]));
            }
            CategorizationPhase::Categorizing if self.drag.is_dragging() => {
                lines.push(Theme::key_hints(&[
                    ("←/→", "choose category"),
                    ("Enter", "drop"),
                    ("Esc", "cancel drag"),
                ]));
            }
            CategorizationPhase::Categorizing => {
                lines.push(Theme::key_hints(&[
                    ("↑/↓", "choose option"),
                    ("Space", "pick up"),
                    ("Ctrl+S", "save"),
                    ("Esc", "exit"),
                ]));
            }
        }
        lines
    }
}
