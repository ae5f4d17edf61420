use crate::grid::{CharCode, Point};
use crate::term::Term;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    #[default]
    None,
    Char,
    Word,
    Line,
}

/// Selection endpoints in ring-absolute rows, so the selection stays put as
/// scrollback grows. Unset endpoints are `None`; reflow rewrites set ones
/// through the tracking-point mechanism.
#[derive(Debug, Default)]
pub struct Selection {
    pub start: Option<Point>,
    pub end: Option<Point>,
    pub kind: SelectionKind,
}

impl Selection {
    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    pub(crate) fn endpoints(&self) -> Vec<Point> {
        self.start.iter().chain(self.end.iter()).copied().collect()
    }

    pub(crate) fn set_endpoints(&mut self, points: &[Point]) {
        let mut it = points.iter().copied();
        if self.start.is_some() {
            self.start = it.next();
        }
        if self.end.is_some() {
            self.end = it.next();
        }
    }
}

impl Term {
    /// Begin a selection at a view cell, cancelling any previous one.
    pub fn selection_start(&mut self, col: usize, screen_row: usize) {
        self.selection_cancel();
        let row = self.grid.view_index(screen_row);
        tracing::debug!("selection started at {},{}", row, col);
        self.selection.start = Some(Point::new(row, col));
        self.selection.end = None;
        self.selection.kind = SelectionKind::Char;
    }

    /// Extend the selection to a view cell and damage the affected rows.
    /// A motion before any start is a no-op.
    pub fn selection_update(&mut self, col: usize, screen_row: usize) {
        let Some(start) = self.selection.start else {
            return;
        };
        let new_end = Point::new(self.grid.view_index(screen_row), col);
        let old_end_row = self.selection.end.map(|e| e.row).unwrap_or(new_end.row);
        self.selection.end = Some(new_end);

        let from = start.row.min(old_end_row).min(new_end.row);
        let to = start.row.max(old_end_row).max(new_end.row);
        self.damage_rows_in_view(from, to);
    }

    /// Order the endpoints and publish the selection to the primary channel.
    pub fn selection_finalize(&mut self) {
        let (Some(start), Some(end)) = (self.selection.start, self.selection.end) else {
            return;
        };
        if start > end {
            self.selection.start = Some(end);
            self.selection.end = Some(start);
        }
        if let Some(text) = self.extract_selection() {
            if let Some(sink) = self.sink.as_mut() {
                sink.publish_primary(text.as_bytes());
            }
        }
    }

    /// Drop the selection, repainting the rows it covered.
    pub fn selection_cancel(&mut self) {
        let start = self.selection.start;
        let end = self.selection.end;
        self.selection = Selection::default();
        if let (Some(s), Some(e)) = (start, end) {
            self.damage_rows_in_view(s.row.min(e.row), s.row.max(e.row));
        }
    }

    /// Publish the current selection to the clipboard channel.
    pub fn selection_to_clipboard(&mut self) {
        if let Some(text) = self.extract_selection() {
            if let Some(sink) = self.sink.as_mut() {
                sink.publish_clipboard(text.as_bytes());
            }
        }
    }

    /// Select the word under a view cell, expanding in both directions and
    /// following line wraps. With `spaces_only` the word predicate is simply
    /// "not whitespace".
    pub fn selection_mark_word(&mut self, col: usize, screen_row: usize, spaces_only: bool) {
        self.selection_cancel();

        let screen = self.grid.screen_rows();
        let cols = self.grid.num_cols();
        let mut start = (screen_row, col);
        let mut end = (screen_row, col);

        if self.is_word_cell(screen_row, col, spaces_only) {
            loop {
                let (mut row, mut c) = start;
                if c == 0 {
                    if row == 0 {
                        break;
                    }
                    row -= 1;
                    c = cols - 1;
                } else {
                    c -= 1;
                }
                if !self.is_word_cell(row, c, spaces_only) {
                    break;
                }
                start = (row, c);
            }
            loop {
                let (mut row, mut c) = end;
                if c + 1 >= cols {
                    if row + 1 >= screen {
                        break;
                    }
                    row += 1;
                    c = 0;
                } else {
                    c += 1;
                }
                if !self.is_word_cell(row, c, spaces_only) {
                    break;
                }
                end = (row, c);
            }
        }

        self.selection_start(start.1, start.0);
        self.selection_update(end.1, end.0);
        self.selection.kind = SelectionKind::Word;
        self.selection_finalize();
    }

    /// Select a whole view row.
    pub fn selection_mark_row(&mut self, screen_row: usize) {
        self.selection_start(0, screen_row);
        self.selection_update(self.grid.num_cols() - 1, screen_row);
        self.selection.kind = SelectionKind::Line;
        self.selection_finalize();
    }

    fn is_word_cell(&self, screen_row: usize, col: usize, spaces_only: bool) -> bool {
        let idx = self.grid.view_index(screen_row);
        let Some(row) = self.grid.abs_row(idx) else {
            return false;
        };
        let Some(cell) = row.cells.get(col) else {
            return false;
        };
        let wc: CharCode = cell.wc;
        if wc == 0 {
            return false;
        }
        if cell.is_spacer() {
            // Continuation of a wide head; part of the same word.
            return true;
        }
        let Some(c) = self.composed.base_char(wc) else {
            return false;
        };
        if spaces_only {
            !c.is_whitespace()
        } else {
            c.is_alphanumeric() || self.word_chars.contains(c)
        }
    }

    /// Extract the selection as UTF-8. Wrapped physical rows collapse back
    /// into logical lines: a newline is committed only where a row ends its
    /// logical line. Empty cells between content become spaces; trailing
    /// empty cells are never emitted. Does not mutate the grid.
    pub fn extract_selection(&self) -> Option<String> {
        let (start, end) = match (self.selection.start, self.selection.end) {
            (Some(s), Some(e)) => {
                if s <= e {
                    (s, e)
                } else {
                    (e, s)
                }
            }
            _ => return None,
        };

        let cols = self.grid.num_cols();
        let mut text = String::new();
        let mut start_col = start.col;

        for r in start.row..=end.row {
            let Some(row) = self.grid.abs_row(r) else {
                start_col = 0;
                continue;
            };
            let last_col = if r == end.row { end.col } else { cols - 1 };

            let mut empty_count = 0usize;
            for col in start_col..=last_col.min(cols - 1) {
                let cell = &row.cells[col];
                if cell.is_spacer() {
                    continue;
                }
                if cell.is_empty() {
                    empty_count += 1;
                    continue;
                }
                for _ in 0..empty_count {
                    text.push(' ');
                }
                empty_count = 0;
                self.composed.encode_utf8(cell.wc, &mut text);
            }

            if r != end.row && row.linebreak {
                text.push('\n');
            }
            start_col = 0;
        }

        if text.ends_with('\n') {
            text.pop();
        }
        Some(text)
    }

    /// Damage a span of ring rows where it intersects the current view.
    fn damage_rows_in_view(&mut self, from: usize, to: usize) {
        let screen = self.grid.screen_rows();
        let cols = self.grid.num_cols();
        let mut lo = None;
        let mut hi = 0;
        for r in 0..screen {
            let abs = self.grid.view_index(r);
            if abs >= from && abs <= to {
                lo.get_or_insert(r);
                hi = r;
            }
        }
        if let Some(lo) = lo {
            self.grid.damage_update(lo * cols, (hi - lo + 1) * cols);
        }
    }
}
