//! Status bar: bottom lines with connection state, player summary and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app_state::{AppState, RendererLabel};
use crate::history::Widget;
use crate::render::truncate;
use crate::theme::{C_ACCENT, C_LOADING, C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY, C_SEPARATOR};

fn dot(up: bool) -> Span<'static> {
    if up {
        Span::styled("●", Style::default().fg(C_PLAYING))
    } else {
        Span::styled("○", Style::default().fg(C_ACCENT))
    }
}

/// Connection dots, renderer, player summary and the last log line.
pub fn draw_status_line(frame: &mut Frame, area: Rect, state: &AppState) {
    let renderer = match &state.renderer {
        RendererLabel::Local => "local".to_string(),
        RendererLabel::Remote(addr) => addr.clone(),
        RendererLabel::Searching => "searching…".to_string(),
    };
    let renderer_color = match state.renderer {
        RendererLabel::Searching => C_LOADING,
        _ => C_SECONDARY,
    };
    let mut spans = vec![
        Span::raw(" "),
        dot(state.server_connected),
        Span::styled(" server ", Style::default().fg(C_MUTED)),
        dot(state.player_connected),
        Span::styled(format!(" {} ", renderer), Style::default().fg(renderer_color)),
        Span::styled("│ ", Style::default().fg(C_SEPARATOR)),
        Span::styled(state.player.summary(), Style::default().fg(C_PRIMARY)),
    ];
    if let Some(entry) = state.logs.last() {
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let room = (area.width as usize).saturating_sub(used + 3);
        if room > 8 {
            spans.push(Span::styled("  │ ", Style::default().fg(C_SEPARATOR)));
            spans.push(Span::styled(
                truncate(&entry.message, room),
                Style::default().fg(C_MUTED),
            ));
        }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw a horizontal separator line.
pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn keys_for(widget: Widget) -> &'static str {
    match widget {
        Widget::Browser => {
            " ↑↓/jk select  Enter open/play  ← up  / search  i info  a/r queue  A/R album  f fav  c current  g go  Tab menu  ? help  q quit"
        }
        Widget::ItemInfo => " ←→ prev/next  Enter open/play  i/Esc close  ? help",
        Widget::ImageViewer => " ←→ prev/next  i info  Esc close",
        Widget::Settings => " ↑↓ choose renderer  Enter switch  o/Esc close",
        Widget::LogViewer => " ↑↓ scroll  g/G top/tail  l/Esc close",
        Widget::Help => " ↑↓ scroll  ?/Esc close",
        Widget::Player => " ←→ seek  ↑↓ volume  Enter pause  n/p next/prev  M mode  P/Esc close",
    }
}

/// Keybindings footer for the active widget.
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, widget: Widget) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", widget.name().to_uppercase()),
            Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys_for(widget), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
