use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    widgets::{Paragraph, Wrap},
};

use super::Theme;

/// Text field with a character cursor. Single-line unless built with
/// [`TextInput::multiline`], where Enter breaks the line.
#[derive(Clone, Debug, Default)]
pub struct TextInput {
    text: String,
    cursor: usize,
    multiline: bool,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multiline() -> Self {
        Self {
            multiline: true,
            ..Self::default()
        }
    }

    pub fn content(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn widget<'a>(&'a self, title: &str, focused: bool) -> Paragraph<'a> {
        Paragraph::new(self.text.as_str())
            .block(Theme::highlighted_panel(title, focused))
            .wrap(Wrap { trim: false })
    }

    /// Where the terminal cursor goes when this field, drawn in `area`, has
    /// focus. Long text wraps onto following rows, and so does a line break.
    pub fn cursor_position(&self, area: Rect) -> (u16, u16) {
        let inner_width = area.width.saturating_sub(2).max(1) as usize;
        let (mut row, mut col) = (0usize, 0usize);
        for ch in self.text.chars().take(self.cursor) {
            if ch == '\n' {
                row += 1;
                col = 0;
            } else {
                col += 1;
                if col == inner_width {
                    row += 1;
                    col = 0;
                }
            }
        }
        let x = area.x + 1 + col as u16;
        let y = area.y + 1 + (row as u16).min(area.height.saturating_sub(3));
        (x, y)
    }

    /// Applies an editing key. Returns `true` when the text changed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.insert_char(c);
                true
            }
            KeyCode::Enter if self.multiline => {
                self.insert_char('\n');
                true
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.len());
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = self.len();
                false
            }
            _ => false,
        }
    }

    fn insert_char(&mut self, ch: char) {
        let idx = self.byte_index(self.cursor);
        self.text.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let end = self.byte_index(self.cursor);
        let start = self.byte_index(self.cursor - 1);
        self.text.drain(start..end);
        self.cursor -= 1;
        true
    }

    fn delete(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        let start = self.byte_index(self.cursor);
        let end = self.byte_index(self.cursor + 1);
        self.text.drain(start..end);
        true
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_index(&self, column: usize) -> usize {
        self.text
            .char_indices()
            .nth(column)
            .map(|(idx, _)| idx)
            .unwrap_or_else(|| self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(input: &mut TextInput, text: &str) {
        for ch in text.chars() {
            input.handle_key(key(KeyCode::Char(ch)));
        }
    }

    #[test]
    fn typing_and_editing_in_the_middle() {
        let mut input = TextInput::new();
        type_text(&mut input, "cat");
        input.handle_key(key(KeyCode::Left));
        input.handle_key(key(KeyCode::Left));
        input.handle_key(key(KeyCode::Char('h')));
        assert_eq!(input.content(), "chat");

        input.handle_key(key(KeyCode::End));
        assert!(input.handle_key(key(KeyCode::Backspace)));
        assert_eq!(input.content(), "cha");

        input.handle_key(key(KeyCode::Home));
        assert!(input.handle_key(key(KeyCode::Delete)));
        assert_eq!(input.content(), "ha");
        assert!(!input.handle_key(key(KeyCode::Left)));
        assert!(!input.backspace());
    }

    #[test]
    fn multibyte_characters_are_one_column() {
        let mut input = TextInput::new();
        type_text(&mut input, "東京");
        assert_eq!(input.cursor(), 2);
        input.backspace();
        assert_eq!(input.content(), "東");
    }

    #[test]
    fn control_chords_are_not_text() {
        let mut input = TextInput::new();
        let changed = input.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(!changed);
        assert_eq!(input.content(), "");
    }

    #[test]
    fn cursor_wraps_inside_the_panel() {
        let mut input = TextInput::new();
        type_text(&mut input, "abcdef");
        let area = Rect::new(10, 5, 6, 4);
        // Four columns inside the border: "abcd" then "ef".
        assert_eq!(input.cursor_position(area), (13, 7));
        input.handle_key(key(KeyCode::Home));
        assert_eq!(input.cursor_position(area), (11, 6));
        input.handle_key(key(KeyCode::End));
        input.handle_key(key(KeyCode::Backspace));
        input.handle_key(key(KeyCode::Backspace));
        assert_eq!(input.cursor_position(area), (11, 7));
    }

    #[test]
    fn enter_breaks_the_line_only_when_multiline() {
        let mut single = TextInput::new();
        type_text(&mut single, "ab");
        assert!(!single.handle_key(key(KeyCode::Enter)));
        assert_eq!(single.content(), "ab");

        let mut input = TextInput::multiline();
        type_text(&mut input, "ab");
        assert!(input.handle_key(key(KeyCode::Enter)));
        type_text(&mut input, "c");
        assert_eq!(input.content(), "ab\nc");
        let area = Rect::new(0, 0, 20, 6);
        assert_eq!(input.cursor_position(area), (2, 2));
    }

    #[test]
    fn clear_resets_text_and_cursor() {
        let mut input = TextInput::new();
        type_text(&mut input, "a, b");
        assert_eq!(input.cursor(), 4);
        input.clear();
        assert_eq!(input.content(), "");
        assert_eq!(input.cursor(), 0);
    }
}
