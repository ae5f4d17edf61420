use super::{Cell, CellAttrs, ComposedTable, Grid, Point, Row, ScrollRegion};

/// Which coordinate a reflow tracking point rewrites.
enum Slot {
    Cursor,
    SavedCursor,
    View,
    Caller(usize),
}

struct Tracked {
    slot: Slot,
    /// Old-ring coordinates of the tracked cell.
    src: Point,
    /// New-ring coordinates once the cell has been emitted.
    dst: Option<Point>,
}

/// Streaming output position on the new ring.
struct Out {
    row: usize,
    col: usize,
    /// The slot at `row` has been opened for this output position.
    opened: bool,
    rows_written: usize,
    /// Blank hard-broken rows not yet materialized. Flushed when more output
    /// lands, so blank lines between content survive while trailing
    /// untouched rows never consume output.
    pending: usize,
}

impl Grid {
    /// Resize with reflow: rewrap every logical line across the new column
    /// count, preserving cursor, saved cursor, viewport, sixel anchors, and
    /// the caller's tracking points (ring-absolute, rewritten in place).
    ///
    /// The grid is walked as a stream of logical lines starting at the oldest
    /// scrollback row; soft wraps are re-derived from the new width and hard
    /// wraps re-emitted at each `linebreak`. O(old rows * old cols).
    pub fn resize_reflow(
        &mut self,
        new_screen_rows: usize,
        new_cols: usize,
        scrollback_lines: usize,
        table: &ComposedTable,
        tracking: &mut [Point],
    ) {
        assert!(new_screen_rows > 0 && new_cols > 0);
        let new_num_rows = (new_screen_rows + scrollback_lines).next_power_of_two();
        let new_mask = new_num_rows - 1;

        let old_offset = self.offset;
        let old_num_rows = self.num_rows;
        let old_mask = old_num_rows - 1;
        let old_screen_rows = self.screen_rows;
        let old_cols = self.num_cols;
        let was_anchored = self.view == self.offset;

        // Cursor, saved cursor, and viewport ride the same rewrite list as
        // the caller's points; nothing special-cases the cursor.
        let mut tracked: Vec<Tracked> = Vec::with_capacity(3 + tracking.len());
        tracked.push(Tracked {
            slot: Slot::Cursor,
            src: Point::new(
                (old_offset + self.cursor.point.row) & old_mask,
                self.cursor.point.col,
            ),
            dst: None,
        });
        tracked.push(Tracked {
            slot: Slot::SavedCursor,
            src: Point::new(
                (old_offset + self.saved_cursor.point.row) & old_mask,
                self.saved_cursor.point.col,
            ),
            dst: None,
        });
        if !was_anchored {
            tracked.push(Tracked {
                slot: Slot::View,
                src: Point::new(self.view, 0),
                dst: None,
            });
        }
        for (i, point) in tracking.iter().enumerate() {
            tracked.push(Tracked {
                slot: Slot::Caller(i),
                src: *point,
                dst: None,
            });
        }

        let mut fresh: Vec<Option<Row>> = Vec::with_capacity(new_num_rows);
        fresh.resize_with(new_num_rows, || None);
        let old_rows = std::mem::replace(&mut self.rows, fresh);
        let mut old_sixels = std::mem::take(&mut self.sixels);

        self.num_rows = new_num_rows;
        self.num_cols = new_cols;
        self.screen_rows = new_screen_rows;

        let mut out = Out { row: 0, col: 0, opened: false, rows_written: 0, pending: 0 };

        let walk_start = (old_offset + old_screen_rows) & old_mask;
        for i in 0..old_num_rows {
            let src_idx = (walk_start + i) & old_mask;
            let Some(src) = old_rows[src_idx].as_ref() else { continue };

            // Re-home this source row's sixels to the current output row,
            // which must exist for the anchors to stay valid.
            let mut contributed = false;
            if old_sixels.iter().any(|image| image.pos.row == src_idx) {
                self.reflow_flush_pending(&mut out);
                self.reflow_open(&mut out);
                contributed = true;

                let kept = &mut self.sixels;
                let dropped = &mut self.dropped_images;
                let dst_row = out.row;
                old_sixels.retain(|image| {
                    if image.pos.row != src_idx {
                        return true;
                    }
                    if image.pos.col < new_cols {
                        kept.push(super::SixelImage {
                            pos: Point::new(dst_row, image.pos.col),
                            id: image.id,
                        });
                    } else {
                        dropped.push(image.id);
                    }
                    false
                });
            }

            let mut empty_count = 0usize;
            let mut c = 0usize;
            while c < old_cols {
                let cell = &src.cells[c];
                if cell.is_spacer() {
                    c += 1;
                    continue;
                }

                let width = if cell.is_empty() {
                    1
                } else {
                    table.width(cell.wc).min(new_cols)
                };
                let hit = tracked.iter().any(|t| {
                    t.dst.is_none()
                        && t.src.row == src_idx
                        && t.src.col >= c
                        && t.src.col < c + width
                });

                if cell.is_empty() && !hit {
                    empty_count += 1;
                    c += 1;
                    continue;
                }

                // Flush the blank run. Drop the padding that would push the
                // remaining source cells onto a soft line the cells alone
                // would not need, so right-aligned text keeps its layout.
                if empty_count > 0 {
                    let old_cols_left = old_cols - c;
                    let cols_needed = empty_count + old_cols_left;
                    let new_cols_left = new_cols - out.col;
                    let mut blanks = empty_count;
                    if new_cols_left >= old_cols_left && new_cols_left < cols_needed {
                        blanks -= cols_needed - new_cols_left;
                    }
                    let blank = Cell::default();
                    for _ in 0..blanks {
                        self.reflow_put(&mut out, &blank, 1);
                    }
                    empty_count = 0;
                }

                let landing = self.reflow_put(&mut out, cell, width);
                contributed = true;
                for t in tracked.iter_mut() {
                    if t.dst.is_none()
                        && t.src.row == src_idx
                        && t.src.col >= c
                        && t.src.col < c + width
                    {
                        t.dst = Some(landing);
                    }
                }
                c += width;
            }

            if src.linebreak {
                if !contributed && out.col == 0 && !out.opened {
                    // A blank hard-broken row at a line boundary: defer it.
                    out.pending += 1;
                } else {
                    self.reflow_advance(&mut out, true);
                }
            }
        }
        drop(old_rows);
        for image in old_sixels {
            // Rows that were never walked carry no images (invariant), but a
            // stale anchor must still be reported as destroyed, not leaked.
            self.dropped_images.push(image.id);
        }

        // Re-anchor the screen over the tail of the output.
        let last = if out.opened {
            out.row
        } else {
            (out.row + new_mask) & new_mask
        };
        let mut offset = 0;
        if out.rows_written > 0 {
            offset = (last + 1 + new_num_rows - new_screen_rows) & new_mask;
            let mut guard = 0;
            while self.rows[offset].is_none() && guard < new_num_rows {
                offset = (offset + 1) & new_mask;
                guard += 1;
            }
            if guard == new_num_rows {
                offset = 0;
            }
        }
        self.offset = offset;

        for r in 0..new_screen_rows {
            let idx = (offset + r) & new_mask;
            if self.rows[idx].is_none() {
                let mut row = Row::new(new_cols);
                row.dirty = true;
                self.rows[idx] = Some(row);
            }
        }

        let mut scrollback = 0;
        while scrollback < new_num_rows - new_screen_rows {
            let idx = (offset + new_num_rows - 1 - scrollback) & new_mask;
            if self.rows[idx].is_some() {
                scrollback += 1;
            } else {
                break;
            }
        }
        self.scrollback_len = scrollback;

        // Viewport: stay anchored if anchored, else follow the rewritten row
        // and pull back until the last visible row is allocated.
        if was_anchored {
            self.view = self.offset;
        } else {
            let rewritten = tracked
                .iter()
                .find(|t| matches!(t.slot, Slot::View))
                .and_then(|t| t.dst)
                .map(|p| p.row)
                .unwrap_or(self.offset);
            self.view = rewritten;
            let mut guard = 0;
            while guard < new_num_rows {
                let last_visible = (self.view + new_screen_rows - 1) & new_mask;
                if self.rows[last_visible].is_some() {
                    break;
                }
                self.view = (self.view + new_mask) & new_mask;
                guard += 1;
            }
            self.clamp_view();
        }

        // Cursors come back from ring-absolute to screen-relative.
        for t in &tracked {
            let dst = t.dst.unwrap_or(Point::new(self.offset, 0));
            match t.slot {
                Slot::Cursor => {
                    self.cursor.point.row =
                        ((dst.row + new_num_rows - self.offset) & new_mask).min(new_screen_rows - 1);
                    self.cursor.point.col = dst.col.min(new_cols - 1);
                    self.cursor.lcf = false;
                }
                Slot::SavedCursor => {
                    self.saved_cursor.point.row =
                        ((dst.row + new_num_rows - self.offset) & new_mask).min(new_screen_rows - 1);
                    self.saved_cursor.point.col = dst.col.min(new_cols - 1);
                    self.saved_cursor.lcf = false;
                }
                Slot::View => {}
                Slot::Caller(i) => tracking[i] = dst,
            }
        }

        self.scrolling_region = ScrollRegion { top: 0, bottom: new_screen_rows };
        self.sync_cur_row();
        self.damage.clear();
        self.damage.update(0, new_screen_rows * new_cols);
    }

    /// Open the current output slot: allocate it, or recycle it when the walk
    /// has wrapped the new ring (destroying images already re-homed there).
    fn reflow_open(&mut self, out: &mut Out) {
        if out.opened {
            return;
        }
        let idx = out.row;
        if self.rows[idx].is_some() {
            self.drop_images_on_row(idx);
            let (fg, bg) = (self.default_fg, self.default_bg);
            if let Some(row) = self.rows[idx].as_mut() {
                row.erase(fg, bg);
            }
        } else {
            self.rows[idx] = Some(Row::new(self.num_cols));
        }
        if let Some(row) = self.rows[idx].as_mut() {
            row.dirty = true;
        }
        out.opened = true;
        out.rows_written += 1;
    }

    /// Finish the current output row and move to the next slot. `hard` marks
    /// a logical line ending; a soft wrap leaves `linebreak` clear.
    fn reflow_advance(&mut self, out: &mut Out, hard: bool) {
        self.reflow_open(out);
        if let Some(row) = self.rows[out.row].as_mut() {
            row.linebreak = hard;
        }
        out.row = (out.row + 1) & (self.num_rows - 1);
        out.col = 0;
        out.opened = false;
    }

    /// Materialize deferred blank logical lines before more output lands.
    fn reflow_flush_pending(&mut self, out: &mut Out) {
        while out.pending > 0 {
            out.pending -= 1;
            self.reflow_advance(out, true);
        }
    }

    /// Emit one cell (plus its spacers) at the output position, soft-wrapping
    /// first if it does not fit. Returns where the head landed.
    fn reflow_put(&mut self, out: &mut Out, cell: &Cell, width: usize) -> Point {
        self.reflow_flush_pending(out);
        if out.col + width > self.num_cols {
            // The unused tail must read as continuation of the wide head.
            self.reflow_open(out);
            let pad = Cell::spacer_for(cell);
            if let Some(row) = self.rows[out.row].as_mut() {
                for col in out.col..row.cells.len() {
                    row.cells[col] = pad.clone();
                }
            }
            self.reflow_advance(out, false);
        }

        self.reflow_open(out);
        let landing = Point::new(out.row, out.col);
        let row = self.rows[out.row].as_mut().expect("output row allocated");
        let mut copied = cell.clone();
        copied.attrs |= CellAttrs::CLEAN;
        row.cells[out.col] = copied;
        for k in 1..width {
            row.cells[out.col + k] = Cell::spacer_for(cell);
        }
        out.col += width;
        landing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CharCode;

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
            .filter(|c| !c.is_empty() && !c.is_spacer())
            .filter_map(|c| char::from_u32(c.wc))
            .collect()
    }

    /// Concatenate non-empty cells row by row, '\n' where linebreak is set.
    fn logical_text(grid: &Grid) -> String {
        let mut text = String::new();
        for r in 0..grid.screen_rows() {
            let row = grid.screen_row(r);
            for cell in &row.cells {
                if !cell.is_empty() && !cell.is_spacer() {
                    if let Some(c) = char::from_u32(cell.wc) {
                        text.push(c);
                    }
                }
            }
            if row.linebreak {
                text.push('\n');
            }
        }
        text
    }

    #[test]
    fn shrink_rewraps_logical_line() {
        // One 16-char logical line across two 8-col rows.
        let mut grid = Grid::new(6, 8, 0);
        put_str(&mut grid, 0, "abcdefgh");
        put_str(&mut grid, 1, "ijklmnop");
        grid.screen_row_mut(0).linebreak = false;
        grid.screen_row_mut(1).linebreak = true;

        let before = logical_text(&grid);
        grid.resize_reflow(6, 4, 0, &ComposedTable::new(), &mut []);

        assert_eq!(row_text(&grid, 0), "abcd");
        assert_eq!(row_text(&grid, 1), "efgh");
        assert_eq!(row_text(&grid, 2), "ijkl");
        assert_eq!(row_text(&grid, 3), "mnop");
        assert!(!grid.screen_row(0).linebreak);
        assert!(!grid.screen_row(1).linebreak);
        assert!(!grid.screen_row(2).linebreak);
        assert!(grid.screen_row(3).linebreak);
        // Logical content is preserved modulo collapsed trailing blank lines.
        assert_eq!(
            logical_text(&grid).trim_end_matches('\n'),
            before.trim_end_matches('\n')
        );
    }

    #[test]
    fn grow_unwraps_and_preserves_cursor() {
        // A line soft-wrapped from row 0; cursor mid row 1.
        let mut grid = Grid::new(4, 8, 0);
        put_str(&mut grid, 0, "abcdefgh");
        put_str(&mut grid, 1, "ij");
        grid.screen_row_mut(0).linebreak = false;
        grid.screen_row_mut(1).linebreak = true;
        grid.set_cursor(1, 1);

        grid.resize_reflow(4, 16, 0, &ComposedTable::new(), &mut []);

        assert_eq!(row_text(&grid, 0), "abcdefghij");
        assert_eq!(grid.cursor.point.row, 0);
        assert_eq!(grid.cursor.point.col, 9);
    }

    #[test]
    fn wide_char_keeps_position_when_growing() {
        let mut grid = Grid::new(3, 8, 0);
        put_str(&mut grid, 0, "aaaaaa");
        let head = Cell {
            wc: '漢' as CharCode,
            ..Cell::default()
        };
        grid.screen_row_mut(0).cells[6] = head.clone();
        grid.screen_row_mut(0).cells[7] = Cell::spacer_for(&head);
        grid.screen_row_mut(0).linebreak = true;

        grid.resize_reflow(3, 10, 0, &ComposedTable::new(), &mut []);

        let row = grid.screen_row(0);
        assert_eq!(row.cells[6].wc, '漢' as CharCode);
        assert!(row.cells[7].is_spacer());
        assert!(row.cells[8].is_empty());
        assert!(row.cells[9].is_empty());
        assert!(row.linebreak);
        assert!(row_text(&grid, 1).is_empty());
    }

    #[test]
    fn wide_char_that_no_longer_fits_pads_and_wraps() {
        let mut grid = Grid::new(3, 6, 0);
        put_str(&mut grid, 0, "abcd");
        let head = Cell {
            wc: '漢' as CharCode,
            ..Cell::default()
        };
        grid.screen_row_mut(0).cells[4] = head.clone();
        grid.screen_row_mut(0).cells[5] = Cell::spacer_for(&head);
        grid.screen_row_mut(0).linebreak = true;

        grid.resize_reflow(3, 5, 0, &ComposedTable::new(), &mut []);

        let first = grid.screen_row(0);
        assert_eq!(row_text(&grid, 0), "abcd");
        assert!(first.cells[4].is_spacer());
        assert!(!first.linebreak);
        let second = grid.screen_row(1);
        assert_eq!(second.cells[0].wc, '漢' as CharCode);
        assert!(second.cells[1].is_spacer());
        assert!(second.linebreak);
    }

    #[test]
    fn right_aligned_padding_is_dropped_not_wrapped() {
        // "ab" + six blanks + "cd" right-aligned in 10 cols; at 9 cols one
        // pad blank is dropped so "cd" stays on the same line.
        let mut grid = Grid::new(3, 10, 0);
        put_str(&mut grid, 0, "ab");
        let cells = &mut grid.screen_row_mut(0).cells;
        cells[8].wc = 'c' as CharCode;
        cells[9].wc = 'd' as CharCode;
        grid.screen_row_mut(0).linebreak = true;

        grid.resize_reflow(3, 9, 0, &ComposedTable::new(), &mut []);

        let row = grid.screen_row(0);
        assert_eq!(row.cells[7].wc, 'c' as CharCode);
        assert_eq!(row.cells[8].wc, 'd' as CharCode);
        assert_eq!(row_text(&grid, 1), "");
    }

    #[test]
    fn caller_tracking_points_are_rewritten() {
        let mut grid = Grid::new(4, 8, 0);
        put_str(&mut grid, 0, "abcdefgh");
        put_str(&mut grid, 1, "ij");
        grid.screen_row_mut(0).linebreak = false;
        grid.screen_row_mut(1).linebreak = true;

        // Track the 'j' at old ring position (1, 1).
        let mut points = [Point::new(1, 1)];
        grid.resize_reflow(4, 4, 0, &ComposedTable::new(), &mut points);

        let landed = points[0];
        let row = grid.abs_row(landed.row).unwrap();
        assert_eq!(row.cells[landed.col].wc, 'j' as CharCode);
    }

    #[test]
    fn sixels_rehome_to_reflowed_rows() {
        let mut grid = Grid::new(4, 8, 0);
        put_str(&mut grid, 0, "abcdefgh");
        put_str(&mut grid, 1, "ij");
        grid.screen_row_mut(0).linebreak = false;
        grid.screen_row_mut(1).linebreak = true;
        let id = grid.attach_image(Point::new(1, 1));
        let wide = grid.attach_image(Point::new(1, 6));

        grid.resize_reflow(4, 4, 0, &ComposedTable::new(), &mut []);

        // Old row 1 is re-homed to the destination row current when its walk
        // began: row 1, mid-line ("efgh" chunk).
        assert_eq!(grid.images().len(), 1);
        assert_eq!(grid.images()[0].id, id);
        assert_eq!(grid.images()[0].pos.row, 1);
        // The other image's column does not exist at the new width.
        assert_eq!(grid.take_dropped_images(), vec![wide]);
    }

    #[test]
    fn cursor_on_blank_cell_still_tracks() {
        let mut grid = Grid::new(4, 8, 0);
        put_str(&mut grid, 0, "ab");
        grid.screen_row_mut(0).linebreak = true;
        grid.set_cursor(2, 5);

        grid.resize_reflow(4, 16, 0, &ComposedTable::new(), &mut []);

        // The blank row 1 between the "ab" line and the cursor row is
        // materialized when the cursor's cell lands, so the cursor keeps its
        // screen row.
        assert_eq!(grid.cursor.point.row, 2);
        assert_eq!(grid.cursor.point.col, 5);
        assert!(grid.cur_row().cells[5].is_empty());
    }

    #[test]
    fn directly_addressed_rows_stay_separate() {
        // Rows painted via cursor addressing only (the way full-screen TUIs
        // redraw) carry their default hard breaks and must not run together.
        let mut grid = Grid::new(6, 8, 0);
        put_str(&mut grid, 0, "status");
        put_str(&mut grid, 2, "detail");

        grid.resize_reflow(6, 6, 0, &ComposedTable::new(), &mut []);

        assert_eq!(row_text(&grid, 0), "status");
        assert_eq!(row_text(&grid, 1), "");
        assert_eq!(row_text(&grid, 2), "detail");
        for r in 3..6 {
            assert!(grid.screen_row(r).cells.iter().all(|c| c.is_empty()));
        }
    }

    #[test]
    fn untouched_rows_below_do_not_push_content_into_scrollback() {
        // 160 chars over rows 0..1 of a 24-row screen; shrink to half width.
        // The 22 blank hard-broken rows below stay deferred (no content ever
        // lands after them), so the rewrapped line keeps the screen top.
        let mut grid = Grid::new(24, 8, 40);
        put_str(&mut grid, 0, "abcdefgh");
        put_str(&mut grid, 1, "ijklmnop");
        grid.screen_row_mut(0).linebreak = false;
        grid.screen_row_mut(1).linebreak = true;

        grid.resize_reflow(24, 4, 40, &ComposedTable::new(), &mut []);

        assert_eq!(grid.scrollback_len(), 0);
        assert_eq!(row_text(&grid, 0), "abcd");
        assert_eq!(row_text(&grid, 3), "mnop");
        for r in 4..24 {
            assert!(grid.screen_row(r).cells.iter().all(|c| c.is_empty()));
        }
    }
}
