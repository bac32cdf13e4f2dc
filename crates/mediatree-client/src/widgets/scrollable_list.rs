//! Cursor and scroll window over a list whose rows live elsewhere.
//!
//! The list only knows its length; callers map indices to rows.  Splices
//! shift the cursor so the same row stays selected while rows stream in
//! above it.

use std::ops::Range;

#[derive(Debug, Clone, Default)]
pub struct ScrollableList {
    pub selected: Option<usize>,
    pub scroll_offset: usize,
    len: usize,
}

impl ScrollableList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.selected = None;
        self.scroll_offset = 0;
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index.filter(|i| *i < self.len);
    }

    /// Cursor one row up, or the last row when nothing is selected.
    pub fn select_up(&mut self, n: usize) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.selected = Some(match self.selected {
            Some(i) => i.saturating_sub(n),
            None => self.len - 1,
        });
        self.selected
    }

    /// Cursor down, or the first row when nothing is selected.
    pub fn select_down(&mut self, n: usize) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.selected = Some(match self.selected {
            Some(i) => (i + n).min(self.len - 1),
            None => 0,
        });
        self.selected
    }

    pub fn select_first(&mut self) -> Option<usize> {
        self.scroll_offset = 0;
        self.selected = (self.len > 0).then_some(0);
        self.selected
    }

    pub fn select_last(&mut self) -> Option<usize> {
        self.selected = self.len.checked_sub(1);
        self.selected
    }

    /// Apply a splice of the underlying rows.
    pub fn splice(&mut self, index: usize, deleted: usize, inserted: usize) {
        self.len = self.len + inserted - deleted.min(self.len);
        if let Some(sel) = self.selected {
            self.selected = if sel < index {
                Some(sel)
            } else if sel < index + deleted {
                None
            } else {
                Some(sel + inserted - deleted)
            };
        }
        if self.scroll_offset >= self.len {
            self.scroll_offset = self.len.saturating_sub(1);
        }
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        let Some(selected) = self.selected else {
            return;
        };
        if selected < self.scroll_offset {
            self.scroll_offset = selected;
        } else if selected >= self.scroll_offset + height {
            self.scroll_offset = selected.saturating_sub(height - 1);
        }
    }

    /// Indices of the rows visible in `height` rows.
    pub fn visible_range(&self, height: usize) -> Range<usize> {
        let start = self.scroll_offset.min(self.len);
        start..(start + height).min(self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_clamps() {
        let mut list = ScrollableList::new();
        list.reset(3);
        assert_eq!(list.select_down(1), Some(0));
        assert_eq!(list.select_down(10), Some(2));
        assert_eq!(list.select_up(1), Some(1));
        list.reset(0);
        assert_eq!(list.select_down(1), None);
    }

    #[test]
    fn test_splice_keeps_selected_row() {
        let mut list = ScrollableList::new();
        list.reset(5);
        list.select(Some(3));
        list.splice(0, 0, 2);
        assert_eq!(list.selected, Some(5));
        list.splice(4, 2, 0);
        assert_eq!(list.selected, None);
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn test_scroll_window_follows_cursor() {
        let mut list = ScrollableList::new();
        list.reset(100);
        list.select(Some(50));
        list.ensure_visible(10);
        assert_eq!(list.visible_range(10), 41..51);
        list.select(Some(20));
        list.ensure_visible(10);
        assert_eq!(list.visible_range(10), 20..30);
    }
}
