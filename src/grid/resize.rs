use super::{Cell, Grid, Row, ScrollRegion};

impl Grid {
    /// Row-aligned resize: screen rows are copied across, long lines are
    /// truncated to the new width, scrollback is discarded. O(rows * cols).
    ///
    /// The new ring starts re-anchored at offset 0 with the view at live
    /// output.
    pub fn resize_simple(
        &mut self,
        new_screen_rows: usize,
        new_cols: usize,
        scrollback_lines: usize,
    ) {
        assert!(new_screen_rows > 0 && new_cols > 0);
        let new_num_rows = (new_screen_rows + scrollback_lines).next_power_of_two();

        let old_offset = self.offset;
        let old_num_rows = self.num_rows;
        let old_mask = old_num_rows - 1;
        let old_screen_rows = self.screen_rows;
        let old_cols = self.num_cols;

        let mut new_rows: Vec<Option<Row>> = Vec::with_capacity(new_num_rows);
        new_rows.resize_with(new_num_rows, || None);
        let old_rows = std::mem::replace(&mut self.rows, new_rows);

        let copy_rows = old_screen_rows.min(new_screen_rows);
        let copy_cols = old_cols.min(new_cols);

        for r in 0..copy_rows {
            let src_idx = (old_offset + r) & old_mask;
            let src = old_rows[src_idx].as_ref().expect("screen row allocated");
            let mut cells = Vec::with_capacity(new_cols);
            cells.extend_from_slice(&src.cells[..copy_cols]);
            cells.resize(new_cols, Cell::default());
            self.rows[r] = Some(Row {
                cells,
                dirty: true,
                linebreak: src.linebreak,
            });
        }
        for r in copy_rows..new_screen_rows {
            let mut row = Row::new(new_cols);
            row.dirty = true;
            self.rows[r] = Some(row);
        }

        // Rewrite sixel anchors from old ring rows to the new ones; images on
        // dropped rows or past the new width are destroyed.
        let dropped = &mut self.dropped_images;
        self.sixels.retain_mut(|image| {
            let rel = (image.pos.row + old_num_rows - old_offset) & old_mask;
            if rel < copy_rows && image.pos.col < new_cols {
                image.pos.row = rel;
                true
            } else {
                dropped.push(image.id);
                false
            }
        });

        self.num_rows = new_num_rows;
        self.num_cols = new_cols;
        self.screen_rows = new_screen_rows;
        self.offset = 0;
        self.view = 0;
        self.scrollback_len = 0;
        self.scrolling_region = ScrollRegion { top: 0, bottom: new_screen_rows };

        self.clamp_cursors_after_resize(old_screen_rows);
        self.sync_cur_row();

        self.damage.clear();
        let full = new_screen_rows * new_cols;
        self.damage.update(0, full);

        drop(old_rows);
    }

    /// Clamp cursor and saved cursor to the new screen. A cursor sitting on
    /// the last screen row stays on the last screen row, preserving the
    /// pager-at-bottom illusion some programs rely on.
    pub(crate) fn clamp_cursors_after_resize(&mut self, old_screen_rows: usize) {
        let last = self.screen_rows - 1;
        for cursor in [&mut self.cursor, &mut self.saved_cursor] {
            cursor.point.row = if cursor.point.row + 1 == old_screen_rows {
                last
            } else {
                cursor.point.row.min(last)
            };
            cursor.point.col = cursor.point.col.min(self.num_cols - 1);
            cursor.lcf = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CharCode, Point};

    fn put_str(grid: &mut Grid, row: usize, text: &str) {
        let cells = &mut grid.screen_row_mut(row).cells;
        for (i, c) in text.chars().enumerate() {
            cells[i].wc = c as CharCode;
        }
    }

    fn row_text(grid: &Grid, row: usize) -> String {
        grid.screen_row(row)
            .cells
            .iter()
            .filter_map(|c| {
                if c.is_empty() {
                    None
                } else {
                    char::from_u32(c.wc)
                }
            })
            .collect()
    }

    #[test]
    fn shrink_truncates_columns() {
        let mut grid = Grid::new(4, 8, 0);
        put_str(&mut grid, 0, "abcdefgh");
        grid.resize_simple(4, 4, 0);
        assert_eq!(row_text(&grid, 0), "abcd");
        assert_eq!(grid.num_cols(), 4);
    }

    #[test]
    fn grow_pads_with_blank_cells_and_rows() {
        let mut grid = Grid::new(2, 4, 0);
        put_str(&mut grid, 0, "hi");
        grid.resize_simple(4, 8, 0);
        assert_eq!(row_text(&grid, 0), "hi");
        for r in 2..4 {
            assert!(grid.screen_row(r).cells.iter().all(|c| c.is_empty()));
        }
        assert!(grid.screen_row(0).cells[7].is_empty());
    }

    #[test]
    fn resize_reanchors_ring() {
        let mut grid = Grid::new(4, 4, 8);
        grid.scroll_up(3);
        assert_ne!(grid.offset(), 0);
        grid.resize_simple(4, 4, 8);
        assert_eq!(grid.offset(), 0);
        assert_eq!(grid.view(), 0);
        assert_eq!(grid.scrollback_len(), 0);
    }

    #[test]
    fn cursor_clamps_and_lcf_clears() {
        let mut grid = Grid::new(10, 10, 0);
        grid.set_cursor(7, 9);
        grid.cursor.lcf = true;
        grid.resize_simple(5, 5, 0);
        assert_eq!(grid.cursor.point.row, 4);
        assert_eq!(grid.cursor.point.col, 4);
        assert!(!grid.cursor.lcf);
    }

    #[test]
    fn cursor_on_last_row_stays_on_last_row() {
        let mut grid = Grid::new(10, 10, 0);
        grid.set_cursor(9, 0);
        grid.resize_simple(24, 10, 0);
        assert_eq!(grid.cursor.point.row, 23);
    }

    #[test]
    fn sixels_move_with_their_rows_or_die() {
        let mut grid = Grid::new(4, 8, 0);
        let kept = grid.attach_image(Point::new(1, 2));
        let clipped = grid.attach_image(Point::new(2, 6));
        grid.resize_simple(4, 4, 0);
        assert_eq!(grid.images().len(), 1);
        assert_eq!(grid.images()[0].id, kept);
        assert_eq!(grid.images()[0].pos, Point::new(1, 2));
        assert_eq!(grid.take_dropped_images(), vec![clipped]);
    }

    #[test]
    fn sixels_in_dropped_scrollback_are_destroyed() {
        let mut grid = Grid::new(4, 4, 8);
        let id = grid.attach_image(Point::new(0, 0));
        // Scroll the anchored row out of the screen into scrollback.
        grid.scroll_up(2);
        grid.resize_simple(4, 4, 8);
        assert!(grid.images().is_empty());
        assert_eq!(grid.take_dropped_images(), vec![id]);
    }
}
