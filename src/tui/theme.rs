use crate::alert::Alert;
use crate::palette::Palette;

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

/// Shared styles and widget helpers so every builder screen looks alike.
pub struct Theme;

impl Theme {
    pub const KEY_FG: Color = Color::Rgb(255, 255, 255);

    pub fn label() -> Style {
        Style::default()
            .fg(Palette::ACCENT.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn success() -> Style {
        Style::default()
            .fg(Palette::SUCCESS.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn danger() -> Style {
        Style::default()
            .fg(Palette::DANGER.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn muted() -> Style {
        Style::default().fg(Palette::BORDER.tui())
    }

    pub fn emphasis() -> Style {
        Style::default().add_modifier(Modifier::BOLD)
    }

    pub fn selected() -> Style {
        Style::default().add_modifier(Modifier::REVERSED)
    }

    pub fn blank() -> Style {
        Style::default()
            .fg(Palette::BLANK.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn carried() -> Style {
        Style::default()
            .fg(Palette::CARRIED.tui())
            .add_modifier(Modifier::BOLD | Modifier::DIM)
    }

    pub fn panel<'a>(title: impl Into<String>) -> Block<'a> {
        Self::panel_with_line(Self::title_line(title))
    }

    /// A panel whose border lights up while it is the hovered drop target or
    /// the focused field.
    pub fn highlighted_panel<'a>(title: impl Into<String>, active: bool) -> Block<'a> {
        let block = Self::panel(title);
        if active {
            block.border_style(Style::default().fg(Palette::TARGET.tui()))
        } else {
            block
        }
    }

    pub fn backdrop<'a>() -> Block<'a> {
        Block::default()
    }

    pub fn panel_with_line<'a>(title: Line<'a>) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Palette::BORDER.tui()))
            .title(title)
            .title_alignment(Alignment::Left)
    }

    pub fn title_line(title: impl Into<String>) -> Line<'static> {
        Line::from(vec![Span::styled(
            format!(" {} ", title.into()),
            Self::label(),
        )])
    }

    pub fn label_span(text: impl Into<String>) -> Span<'static> {
        Span::styled(text.into(), Self::label())
    }

    pub fn span(text: impl Into<String>) -> Span<'static> {
        Span::raw(text.into())
    }

    pub fn key_chip(text: impl Into<String>) -> Span<'static> {
        Span::styled(
            format!(" {} ", text.into()),
            Style::default()
                .fg(Self::KEY_FG)
                .bg(Palette::ACCENT.tui())
                .add_modifier(Modifier::BOLD),
        )
    }

    pub fn bullet() -> Span<'static> {
        Self::span(" • ")
    }

    pub fn section_header(text: impl Into<String>) -> Line<'static> {
        Line::from(vec![Span::styled(text.into(), Self::emphasis())])
    }

    /// Key chips separated by bullets, e.g. `[("Tab", "next field"), ...]`.
    pub fn key_hints(hints: &[(&str, &str)]) -> Line<'static> {
        let mut spans = Vec::with_capacity(hints.len() * 3);
        for (i, (key, action)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Self::bullet());
            }
            spans.push(Self::key_chip(*key));
            spans.push(Self::span(format!(" {action}")));
        }
        Line::from(spans)
    }

    /// Draws `alert` as a popup over the middle of `area`.
    pub fn draw_alert(frame: &mut Frame, area: Rect, alert: &Alert) {
        let (title, style) = if alert.is_failure() {
            ("Error", Self::danger())
        } else {
            ("Saved", Self::success())
        };
        let popup = Self::centered(area, 60, 6);
        let body = vec![
            Line::from(Span::styled(alert.message.clone(), style)),
            Line::default(),
            Line::from(Span::styled("Press any key to continue", Self::muted())),
        ];
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(body)
                .wrap(Wrap { trim: true })
                .block(Self::panel(title)),
            popup,
        );
    }

    fn centered(area: Rect, max_width: u16, height: u16) -> Rect {
        let width = area.width.saturating_sub(4).min(max_width);
        let height = height.min(area.height);
        Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        )
    }
}
