//! Row rendering seam: what a list row shows for one object.
//!
//! Components never read metadata keys directly for display; they build a
//! [`Row`] and hand it to the list drawing code.

use mediatree_proto::tree::{meta, playqueue_track_id, MediaClass};
use mediatree_proto::ObjectNode;
use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::theme::{
    style_default, style_muted, style_playing, style_secondary, C_CONTAINER, C_IMAGE, C_LOCKED,
};
use crate::widgets::progress_bar::fmt_time_us;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Container,
    Audio,
    Video,
    Image,
    Other,
}

impl RowKind {
    pub fn of(class: MediaClass) -> Self {
        match class {
            c if c.is_container() => RowKind::Container,
            MediaClass::Audio | MediaClass::Song => RowKind::Audio,
            MediaClass::Video | MediaClass::Movie => RowKind::Video,
            MediaClass::Image => RowKind::Image,
            _ => RowKind::Other,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            RowKind::Container => "▸",
            RowKind::Audio => "♪",
            RowKind::Video => "▶",
            RowKind::Image => "▣",
            RowKind::Other => "·",
        }
    }
}

/// The player's current track.  Library items carry the same hash as
/// their queue copy, so the track is marked wherever it is listed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Playing<'a> {
    pub id: Option<&'a str>,
    pub hash: Option<&'a str>,
}

impl Playing<'_> {
    pub fn matches(&self, node: &ObjectNode) -> bool {
        let Some(id) = self.id else {
            return false;
        };
        if node.id() == Some(id) {
            return true;
        }
        if !node.class().is_item() {
            return false;
        }
        match (self.hash, node.metadata.get_str(meta::HASH)) {
            (Some(playing), Some(hash)) => playing == hash,
            _ => playqueue_track_id(&node.metadata) == id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub label: String,
    pub kind: RowKind,
    /// Child count for containers, duration for media items.
    pub detail: Option<String>,
    pub locked: bool,
    /// The player's current track, independent of the selection.
    pub current: bool,
}

impl Row {
    pub fn from_node(node: &ObjectNode, playing: Playing<'_>) -> Self {
        let id = node.id().unwrap_or_default().to_string();
        let kind = RowKind::of(node.class());
        let detail = match kind {
            RowKind::Container => node.num_children().map(|n| n.to_string()),
            _ => node
                .metadata
                .get_int(meta::APPROX_DURATION)
                .filter(|d| *d > 0)
                .map(fmt_time_us),
        };
        Self {
            current: playing.matches(node),
            label: display_label(node),
            locked: node.is_locked(),
            id,
            kind,
            detail,
        }
    }

    pub fn to_line(&self, width: usize) -> Line<'static> {
        let label_style = if self.current {
            style_playing()
        } else if self.locked {
            Style::default().fg(C_LOCKED)
        } else {
            style_default()
        };
        let marker_style = match self.kind {
            RowKind::Container => Style::default().fg(C_CONTAINER),
            RowKind::Image => Style::default().fg(C_IMAGE),
            _ => style_muted(),
        };
        let detail = self.detail.clone().unwrap_or_default();
        let prefix = if self.current { "● " } else { "  " };
        // prefix, marker and a space take four cells
        let room = width.saturating_sub(4 + detail.chars().count() + 1);
        let label = truncate(&self.label, room);
        let pad = room.saturating_sub(label.chars().count());
        Line::from(vec![
            Span::styled(prefix, style_playing()),
            Span::styled(format!("{} ", self.kind.marker()), marker_style),
            Span::styled(label, label_style),
            Span::raw(" ".repeat(pad + 1)),
            Span::styled(detail, style_secondary()),
        ])
    }
}

/// Label, then title, then the last id segment.
pub fn display_label(node: &ObjectNode) -> String {
    node.label()
        .or_else(|| node.metadata.get_str(meta::TITLE))
        .map(str::to_string)
        .or_else(|| node.id().and_then(|id| id.rsplit('/').next()).map(str::to_string))
        .unwrap_or_default()
}

pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediatree_proto::Dict;

    fn node(id: &str, class: &str) -> ObjectNode {
        let mut md = Dict::new();
        md.set(meta::ID, id);
        md.set(meta::CLASS, class);
        ObjectNode {
            metadata: md,
            children: None,
        }
    }

    #[test]
    fn test_row_marks_current_track() {
        let mut n = node("/playqueue/abc", "item.audio.song");
        n.metadata.set(meta::LABEL, "Song");
        n.metadata.set(meta::APPROX_DURATION, 125_000_000i64);
        let playing = Playing {
            id: Some("/playqueue/abc"),
            hash: None,
        };
        let row = Row::from_node(&n, playing);
        assert!(row.current);
        assert_eq!(row.kind, RowKind::Audio);
        assert_eq!(row.detail.as_deref(), Some("2:05"));
        assert!(!Row::from_node(&n, Playing::default()).current);
    }

    #[test]
    fn test_library_copy_of_current_track_is_marked() {
        let mut n = node("/music/albums/7/3", "item.audio.song");
        n.metadata.set(meta::HASH, "abc");
        let playing = Playing {
            id: Some("/playqueue/abc"),
            hash: Some("abc"),
        };
        assert!(Row::from_node(&n, playing).current);

        n.metadata.set(meta::HASH, "def");
        assert!(!Row::from_node(&n, playing).current);

        let other = node("/music/abc", "container.album");
        assert!(!Row::from_node(&other, playing).current);
    }

    #[test]
    fn test_track_without_hash_matches_by_queue_id() {
        let n = node("/a/t1", "item.audio.song");
        let playing = Playing {
            id: Some("/playqueue/_a_t1"),
            hash: None,
        };
        assert!(Row::from_node(&n, playing).current);
    }

    #[test]
    fn test_label_falls_back_to_id_segment() {
        let row = Row::from_node(&node("/music/albums", "container.directory"), Playing::default());
        assert_eq!(row.label, "albums");
        assert_eq!(row.kind, RowKind::Container);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
