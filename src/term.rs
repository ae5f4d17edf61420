use unicode_width::UnicodeWidthChar;

use crate::color::Color;
use crate::config::Config;
use crate::grid::{Cell, CellAttrs, CharCode, ComposedTable, Damage, Grid, Point, Row};
use crate::modes::Modes;
use crate::selection::Selection;
use crate::transfer::TransferSink;

/// Colors and attributes applied to cells as they are written.
#[derive(Debug, Clone, Copy)]
pub struct Pen {
    pub fg: Color,
    pub bg: Color,
    pub attrs: CellAttrs,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            fg: Color::Default,
            bg: Color::Default,
            attrs: CellAttrs::empty(),
        }
    }
}

/// The terminal facade the escape-sequence interpreter writes through: grid
/// ring, pen, modes, composed-character table, and selection state.
///
/// Everything here runs on one terminal thread; operations are synchronous
/// and bounded (renderers are handed a consistent view between them).
pub struct Term {
    pub grid: Grid,
    pub modes: Modes,
    pub pen: Pen,
    pub selection: Selection,
    pub composed: ComposedTable,
    pub(crate) scrollback_lines: usize,
    pub(crate) word_chars: String,
    pub(crate) sink: Option<Box<dyn TransferSink>>,
}

impl Term {
    pub fn new(screen_rows: usize, num_cols: usize, config: &Config) -> Self {
        let mut grid = Grid::new(screen_rows, num_cols, config.scrollback_lines);
        grid.default_fg = config.default_fg;
        grid.default_bg = config.default_bg;

        Self {
            grid,
            modes: Modes::default(),
            pen: Pen::default(),
            selection: Selection::default(),
            composed: ComposedTable::new(),
            scrollback_lines: config.scrollback_lines,
            word_chars: config.word_chars.clone(),
            sink: None,
        }
    }

    /// Install the channel finalized selections are published through.
    pub fn set_transfer_sink(&mut self, sink: Box<dyn TransferSink>) {
        self.sink = Some(sink);
    }

    // --- VT write primitives ---

    /// Write a printable character at the cursor with the current pen and
    /// advance. Wide characters occupy their own cell plus spacer cells;
    /// zero-width characters fold onto the preceding cell through the
    /// composed-character table. Wrapping at the last column is deferred via
    /// the cursor's last-column flag.
    pub fn put_char(&mut self, c: char) {
        let width = match UnicodeWidthChar::width(c) {
            Some(0) => return self.put_combining(c),
            Some(w) => w,
            None => 1,
        };
        let cols = self.grid.num_cols();
        let width = width.min(cols);

        if self.grid.cursor.lcf && self.modes.autowrap {
            self.soft_wrap();
        }
        self.grid.cursor.lcf = false;

        // A wide head that does not fit in the remaining columns wraps early.
        if self.grid.cursor.point.col + width > cols {
            if self.modes.autowrap {
                self.soft_wrap();
            } else {
                self.grid.cursor.point.col = cols - width;
            }
        }

        let col = self.grid.cursor.point.col;
        if self.modes.insert {
            self.grid.cur_row_mut().insert_blanks(col, width);
        }

        let cell = Cell {
            wc: c as CharCode,
            fg: self.pen.fg,
            bg: self.pen.bg,
            attrs: self.pen.attrs & !CellAttrs::CLEAN,
        };
        let row = self.grid.cursor.point.row;
        let cur = self.grid.cur_row_mut();
        cur.cells[col] = cell.clone();
        for k in 1..width {
            cur.cells[col + k] = Cell::spacer_for(&cell);
        }
        cur.dirty = true;
        let start = self.grid.linear(row, col);
        self.grid.damage_update(start, width);

        let next = col + width;
        if next >= cols {
            self.grid.cursor.point.col = cols - 1;
            self.grid.cursor.lcf = true;
        } else {
            self.grid.cursor.point.col = next;
        }
    }

    /// Fold a zero-width combining character onto the cell before the cursor.
    fn put_combining(&mut self, c: char) {
        let col = self.grid.cursor.point.col;
        let mut target = if self.grid.cursor.lcf {
            col
        } else if col > 0 {
            col - 1
        } else {
            return;
        };
        if self.grid.cur_row().cells[target].is_spacer() && target > 0 {
            target -= 1;
        }

        let wc = self.grid.cur_row().cells[target].wc;
        if wc == 0 {
            return;
        }
        let composed = self.composed.compose(wc, c);
        let row = self.grid.cursor.point.row;
        let cur = self.grid.cur_row_mut();
        cur.cells[target].wc = composed;
        cur.cells[target].attrs &= !CellAttrs::CLEAN;
        cur.dirty = true;
        let start = self.grid.linear(row, target);
        self.grid.damage_update(start, 1);
    }

    /// Deferred wrap: the row being left is a soft continuation.
    fn soft_wrap(&mut self) {
        self.grid.cur_row_mut().linebreak = false;
        self.carriage_return();
        self.cursor_down_or_scroll();
    }

    pub fn cursor_to(&mut self, row: usize, col: usize) {
        self.grid
            .set_cursor(row.min(self.grid.screen_rows() - 1), col.min(self.grid.num_cols() - 1));
    }

    pub fn cursor_up(&mut self, n: usize) {
        let row = self.grid.cursor.point.row.saturating_sub(n);
        self.grid.cursor.point.row = row;
        self.grid.cursor.lcf = false;
        self.grid.sync_cur_row();
    }

    pub fn cursor_down(&mut self, n: usize) {
        let last = self.grid.screen_rows() - 1;
        self.grid.cursor.point.row = (self.grid.cursor.point.row + n).min(last);
        self.grid.cursor.lcf = false;
        self.grid.sync_cur_row();
    }

    pub fn cursor_left(&mut self, n: usize) {
        self.grid.cursor.point.col = self.grid.cursor.point.col.saturating_sub(n);
        self.grid.cursor.lcf = false;
    }

    pub fn cursor_right(&mut self, n: usize) {
        let last = self.grid.num_cols() - 1;
        self.grid.cursor.point.col = (self.grid.cursor.point.col + n).min(last);
        self.grid.cursor.lcf = false;
    }

    pub fn carriage_return(&mut self) {
        self.grid.cursor.point.col = 0;
        self.grid.cursor.lcf = false;
    }

    /// Line feed: the current row ends its logical line, then the cursor
    /// moves down, scrolling the region at its bottom margin.
    pub fn linefeed(&mut self) {
        self.set_linebreak();
        self.cursor_down_or_scroll();
        self.grid.cursor.lcf = false;
    }

    /// Mark the cursor row as ending a logical line.
    pub fn set_linebreak(&mut self) {
        self.grid.cur_row_mut().linebreak = true;
    }

    fn cursor_down_or_scroll(&mut self) {
        let bottom = self.grid.scrolling_region.bottom;
        if self.grid.cursor.point.row + 1 == bottom {
            self.grid.scroll_up(1);
        } else if self.grid.cursor.point.row + 1 < self.grid.screen_rows() {
            self.grid.cursor.point.row += 1;
        }
        self.grid.sync_cur_row();
    }

    pub fn scroll(&mut self, n: usize) {
        self.grid.scroll_up(n);
    }

    pub fn scroll_reverse(&mut self, n: usize) {
        self.grid.scroll_down(n);
    }

    /// Erase a linear cell range `[start, end)` over the screen with the
    /// grid's default colors.
    pub fn erase(&mut self, start: usize, end: usize) {
        let cols = self.grid.num_cols();
        let limit = self.grid.screen_rows() * cols;
        let start = start.min(limit);
        let end = end.min(limit);
        if start >= end {
            return;
        }

        let (fg, bg) = (self.grid.default_fg, self.grid.default_bg);
        let first_row = start / cols;
        let last_row = (end - 1) / cols;
        for r in first_row..=last_row {
            let c0 = if r == first_row { start % cols } else { 0 };
            let c1 = if r == last_row { (end - 1) % cols } else { cols - 1 };
            let row = self.grid.screen_row_mut(r);
            for cell in &mut row.cells[c0..=c1] {
                cell.erase(fg, bg);
            }
            row.dirty = true;
        }
        self.grid.damage_erase(start, end - start);
    }

    /// Set the scrolling region (half-open, screen rows), clamped.
    pub fn set_scrolling_region(&mut self, top: usize, bottom: usize) {
        let screen = self.grid.screen_rows();
        let bottom = bottom.min(screen);
        let top = top.min(bottom.saturating_sub(1));
        self.grid.scrolling_region = crate::grid::ScrollRegion { top, bottom };
    }

    pub fn save_cursor(&mut self) {
        self.grid.saved_cursor = self.grid.cursor;
    }

    pub fn restore_cursor(&mut self) {
        let saved = self.grid.saved_cursor;
        self.grid
            .set_cursor(saved.point.row, saved.point.col.min(self.grid.num_cols() - 1));
        self.grid.cursor.lcf = saved.lcf;
    }

    // --- resize ---

    /// Resize with full reflow. Selection endpoints ride through as tracking
    /// points, so an active selection stays on its glyphs.
    pub fn resize(&mut self, screen_rows: usize, num_cols: usize) {
        let mut points: Vec<Point> = self
            .selection
            .endpoints()
            .into_iter()
            .collect();
        self.grid.resize_reflow(
            screen_rows,
            num_cols,
            self.scrollback_lines,
            &self.composed,
            &mut points,
        );
        self.selection.set_endpoints(&points);
    }

    /// Row-aligned resize without reflow (long lines truncate). Scrollback is
    /// discarded, so the selection's absolute rows are meaningless: cancel it.
    pub fn resize_no_reflow(&mut self, screen_rows: usize, num_cols: usize) {
        self.selection = Selection::default();
        self.grid
            .resize_simple(screen_rows, num_cols, self.scrollback_lines);
    }

    // --- renderer interface ---

    /// Drain the damage log; the renderer calls this once per frame.
    pub fn take_damage(&mut self) -> Vec<Damage> {
        self.grid.damage.take()
    }

    /// Screen row accessor; the reference is valid until the next mutation.
    pub fn row(&self, screen_row: usize) -> &Row {
        self.grid.screen_row(screen_row)
    }

    // --- scrollback view ---

    pub fn view_up(&mut self, n: usize) {
        self.grid.view_up(n);
    }

    pub fn view_down(&mut self, n: usize) {
        self.grid.view_down(n);
    }

    pub fn view_to_bottom(&mut self) {
        self.grid.view_to_bottom();
    }
}
