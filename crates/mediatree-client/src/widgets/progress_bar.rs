//! Smooth Unicode progress bar widget.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_SECONDARY};

/// Render a smooth progress bar in `area`.
/// `progress` is 0.0..=1.0; the labels are drawn left and right of the bar.
pub fn draw_progress(
    frame: &mut Frame,
    area: Rect,
    progress: f64,
    left_label: &str,
    right_label: &str,
    color: ratatui::style::Color,
) {
    if area.width < 4 || area.height == 0 {
        return;
    }

    let label_w = (left_label.chars().count() + right_label.chars().count() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    let mut spans = Vec::new();
    if !left_label.is_empty() {
        spans.push(Span::styled(
            format!("{} ", left_label),
            Style::default().fg(C_SECONDARY),
        ));
    }
    spans.push(Span::styled(bar(progress, bar_w), Style::default().fg(color)));
    if !right_label.is_empty() {
        spans.push(Span::styled(
            format!(" {}", right_label),
            Style::default().fg(C_MUTED),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Eighth-block fill of `width` cells.
pub fn bar(progress: f64, width: usize) -> String {
    const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

    let eighths = (progress.clamp(0.0, 1.0) * width as f64 * 8.0) as usize;
    let full_blocks = eighths / 8;
    let partial = eighths % 8;

    let mut out = String::with_capacity(width + 4);
    for _ in 0..full_blocks {
        out.push('█');
    }
    if full_blocks < width {
        out.push(BLOCKS[partial]);
        for _ in (full_blocks + 1)..width {
            out.push(' ');
        }
    }
    out
}

/// `m:ss` or `h:mm:ss` from microseconds.
pub fn fmt_time_us(us: i64) -> String {
    if us <= 0 {
        return "0:00".to_string();
    }
    let s = (us / 1_000_000) as u64;
    let h = s / 3600;
    let m = (s % 3600) / 60;
    let s = s % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
