pub mod cell;
pub mod damage;
pub mod reflow;
pub mod resize;
pub mod row;
pub mod scroll;
pub mod sixel;

use serde::Serialize;

use crate::color::Color;

pub use cell::{Cell, CellAttrs, CharCode, ComposedTable, COMB_CHARS_HI, COMB_CHARS_LO, MULT_COL_SPACER};
pub use damage::{Damage, DamageLog};
pub use row::Row;
pub use sixel::{ImageId, SixelImage};

/// A cell coordinate. Depending on context `row` is either screen-relative
/// (`0..screen_rows`) or a ring index; selection and sixel anchors always use
/// ring indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Cursor bookkeeping: a screen-relative position plus the last-column flag
/// that defers line wrap until the next printable character.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    pub point: Point,
    pub lcf: bool,
}

/// Scrolling region in screen coordinates, half-open: rows `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    pub top: usize,
    pub bottom: usize,
}

impl ScrollRegion {
    pub fn height(&self) -> usize {
        self.bottom - self.top
    }
}

/// The grid ring: a power-of-two array of row slots with a rotating origin.
///
/// The screen is the window `offset .. offset + screen_rows` (mod `num_rows`);
/// everything behind `offset` is scrollback. Slots outside the screen start
/// unallocated and materialize as scrolling recycles them.
pub struct Grid {
    num_rows: usize,
    num_cols: usize,
    screen_rows: usize,
    /// Ring index of the top visible screen row.
    offset: usize,
    /// Ring index of the top row currently shown to the user. Equal to
    /// `offset` when anchored at live output.
    view: usize,
    /// Allocated rows behind `offset`.
    scrollback_len: usize,
    rows: Vec<Option<Row>>,
    pub cursor: Cursor,
    pub saved_cursor: Cursor,
    /// Cached ring index of the row under the cursor. Kept equal to
    /// `(offset + cursor.point.row) & mask` by every mutation.
    cur_row: usize,
    pub scrolling_region: ScrollRegion,
    pub damage: DamageLog,
    sixels: Vec<SixelImage>,
    dropped_images: Vec<ImageId>,
    image_counter: u64,
    pub default_fg: Color,
    pub default_bg: Color,
}

impl Grid {
    /// Create a ring with `screen_rows x num_cols` visible cells and capacity
    /// for at least `scrollback_lines` of history. Total capacity is rounded
    /// up to a power of two so ring arithmetic is a mask.
    pub fn new(screen_rows: usize, num_cols: usize, scrollback_lines: usize) -> Self {
        assert!(screen_rows > 0 && num_cols > 0);
        let num_rows = (screen_rows + scrollback_lines).next_power_of_two();

        let mut rows: Vec<Option<Row>> = Vec::with_capacity(num_rows);
        rows.resize_with(num_rows, || None);
        for slot in rows.iter_mut().take(screen_rows) {
            *slot = Some(Row::new(num_cols));
        }

        Self {
            num_rows,
            num_cols,
            screen_rows,
            offset: 0,
            view: 0,
            scrollback_len: 0,
            rows,
            cursor: Cursor::default(),
            saved_cursor: Cursor::default(),
            cur_row: 0,
            scrolling_region: ScrollRegion { top: 0, bottom: screen_rows },
            damage: DamageLog::new(),
            sixels: Vec::new(),
            dropped_images: Vec::new(),
            image_counter: 0,
            default_fg: Color::Default,
            default_bg: Color::Default,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn screen_rows(&self) -> usize {
        self.screen_rows
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn view(&self) -> usize {
        self.view
    }

    pub fn scrollback_len(&self) -> usize {
        self.scrollback_len
    }

    /// True when the user is anchored at live output.
    pub fn view_at_bottom(&self) -> bool {
        self.view == self.offset
    }

    fn mask(&self) -> usize {
        self.num_rows - 1
    }

    /// Ring index of a screen-relative row.
    pub fn ring_index(&self, screen_row: usize) -> usize {
        (self.offset + screen_row) & self.mask()
    }

    /// Ring index of a view-relative row.
    pub fn view_index(&self, view_row: usize) -> usize {
        (self.view + view_row) & self.mask()
    }

    /// Linear coordinate of a screen cell: `row * cols + col`.
    pub fn linear(&self, row: usize, col: usize) -> usize {
        row * self.num_cols + col
    }

    /// Row at a ring index, if that slot is allocated.
    pub fn abs_row(&self, ring_row: usize) -> Option<&Row> {
        self.rows[ring_row & self.mask()].as_ref()
    }

    /// Screen row accessor. Valid until the next mutation. Screen rows are
    /// always allocated.
    pub fn screen_row(&self, screen_row: usize) -> &Row {
        debug_assert!(screen_row < self.screen_rows);
        let idx = self.ring_index(screen_row.min(self.screen_rows - 1));
        self.rows[idx].as_ref().expect("screen row allocated")
    }

    pub fn screen_row_mut(&mut self, screen_row: usize) -> &mut Row {
        debug_assert!(screen_row < self.screen_rows);
        let idx = self.ring_index(screen_row.min(self.screen_rows - 1));
        self.rows[idx].as_mut().expect("screen row allocated")
    }

    /// The row under the cursor, through the cached ring index.
    pub fn cur_row(&self) -> &Row {
        self.rows[self.cur_row].as_ref().expect("cursor row allocated")
    }

    pub fn cur_row_mut(&mut self) -> &mut Row {
        self.rows[self.cur_row].as_mut().expect("cursor row allocated")
    }

    /// Recompute the cached cursor-row index after the origin or the cursor
    /// moved.
    pub(crate) fn sync_cur_row(&mut self) {
        self.cur_row = self.ring_index(self.cursor.point.row);
    }

    /// Move the cursor to a screen position, clamped to the screen.
    pub fn set_cursor(&mut self, row: usize, col: usize) {
        debug_assert!(row < self.screen_rows && col < self.num_cols);
        self.cursor.point.row = row.min(self.screen_rows - 1);
        self.cursor.point.col = col.min(self.num_cols - 1);
        self.cursor.lcf = false;
        self.sync_cur_row();
    }

    /// Exchange the row slots of two screen-relative rows. Emits no damage;
    /// callers that need damage emit it themselves.
    pub fn swap_rows(&mut self, row_a: usize, row_b: usize) {
        debug_assert!(row_a != row_b);
        if row_a == row_b {
            return;
        }
        let real_a = self.ring_index(row_a);
        let real_b = self.ring_index(row_b);
        self.rows.swap(real_a, real_b);
    }

    /// Scroll the user view up (into history) by `n` rows.
    pub fn view_up(&mut self, n: usize) {
        let behind = (self.offset + self.num_rows - self.view) & self.mask();
        let step = n.min(self.scrollback_len.saturating_sub(behind));
        if step == 0 {
            return;
        }
        self.view = (self.view + self.num_rows - step) & self.mask();
        self.damage_view();
    }

    /// Scroll the user view down (towards live output) by `n` rows.
    pub fn view_down(&mut self, n: usize) {
        let behind = (self.offset + self.num_rows - self.view) & self.mask();
        let step = n.min(behind);
        if step == 0 {
            return;
        }
        self.view = (self.view + step) & self.mask();
        self.damage_view();
    }

    /// Re-anchor the view at live output.
    pub fn view_to_bottom(&mut self) {
        if self.view != self.offset {
            self.view = self.offset;
            self.damage_view();
        }
    }

    fn damage_view(&mut self) {
        let full = self.screen_rows * self.num_cols;
        self.damage.update(0, full);
    }

    /// Attach a sixel image at a ring-absolute cell, returning its handle.
    pub fn attach_image(&mut self, pos: Point) -> ImageId {
        debug_assert!(self.rows[pos.row & self.mask()].is_some());
        self.image_counter += 1;
        let id = ImageId(self.image_counter);
        self.sixels.push(SixelImage { pos, id });
        id
    }

    pub fn images(&self) -> &[SixelImage] {
        &self.sixels
    }

    /// Handles of images destroyed since the last call; the renderer frees
    /// the corresponding pixel data.
    pub fn take_dropped_images(&mut self) -> Vec<ImageId> {
        std::mem::take(&mut self.dropped_images)
    }

    /// Destroy every image whose anchor satisfies `pred`.
    pub(crate) fn drop_images_where(&mut self, mut pred: impl FnMut(&SixelImage) -> bool) {
        let dropped = &mut self.dropped_images;
        self.sixels.retain(|image| {
            if pred(image) {
                dropped.push(image.id);
                false
            } else {
                true
            }
        });
    }

    /// Destroy images anchored on one ring row.
    pub(crate) fn drop_images_on_row(&mut self, ring_row: usize) {
        self.drop_images_where(|image| image.pos.row == ring_row);
    }

    /// Emit update damage for a screen cell range, bounds-checked.
    pub(crate) fn damage_update(&mut self, start: usize, length: usize) {
        debug_assert!(start + length <= self.screen_rows * self.num_cols);
        self.damage.update(start, length);
    }

    /// Emit erase damage for a screen cell range, bounds-checked.
    pub(crate) fn damage_erase(&mut self, start: usize, length: usize) {
        debug_assert!(start + length <= self.screen_rows * self.num_cols);
        self.damage.erase(start, length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_capacity_is_power_of_two() {
        let grid = Grid::new(24, 80, 1000);
        assert!(grid.num_rows().is_power_of_two());
        assert!(grid.num_rows() >= 24 + 1000);
    }

    #[test]
    fn screen_rows_are_allocated() {
        let grid = Grid::new(24, 80, 0);
        for r in 0..24 {
            assert_eq!(grid.screen_row(r).cols(), 80);
        }
    }

    #[test]
    fn cursor_row_cache_tracks_cursor() {
        let mut grid = Grid::new(24, 80, 0);
        grid.set_cursor(5, 10);
        assert!(std::ptr::eq(grid.cur_row(), grid.screen_row(5)));
    }

    #[test]
    fn swap_rows_is_an_involution() {
        let mut grid = Grid::new(4, 4, 0);
        grid.screen_row_mut(1).cells[0].wc = 'a' as CharCode;
        grid.screen_row_mut(2).cells[0].wc = 'b' as CharCode;

        grid.swap_rows(1, 2);
        assert_eq!(grid.screen_row(1).cells[0].wc, 'b' as CharCode);
        assert_eq!(grid.screen_row(2).cells[0].wc, 'a' as CharCode);

        grid.swap_rows(1, 2);
        assert_eq!(grid.screen_row(1).cells[0].wc, 'a' as CharCode);
        assert_eq!(grid.screen_row(2).cells[0].wc, 'b' as CharCode);
    }

    #[test]
    fn view_cannot_scroll_past_history() {
        let mut grid = Grid::new(4, 4, 12);
        // No scrollback yet: view_up is a no-op.
        grid.view_up(3);
        assert!(grid.view_at_bottom());
    }

    #[test]
    fn attach_and_drop_images() {
        let mut grid = Grid::new(4, 4, 0);
        let id = grid.attach_image(Point::new(1, 2));
        assert_eq!(grid.images().len(), 1);
        grid.drop_images_on_row(1);
        assert!(grid.images().is_empty());
        assert_eq!(grid.take_dropped_images(), vec![id]);
    }
}
