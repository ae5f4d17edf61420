use super::{Grid, Row};

impl Grid {
    /// Scroll the scrolling region up by `n` lines: content moves towards the
    /// top, blank rows enter at the bottom.
    ///
    /// When the region covers the whole screen this rotates the ring origin,
    /// which is how rows accumulate in scrollback. A partial region rotates a
    /// window of row slots and leaves scrollback untouched.
    pub fn scroll_up(&mut self, n: usize) {
        let region = self.scrolling_region;
        let h = region.height();
        if n == 0 || h == 0 {
            return;
        }
        if n >= h {
            self.erase_scrolling_region();
            return;
        }

        if region.top == 0 && region.bottom == self.screen_rows {
            let anchored = self.view == self.offset;
            self.offset = (self.offset + n) & self.mask();
            self.scrollback_len = (self.scrollback_len + n).min(self.num_rows - self.screen_rows);
            if anchored {
                self.view = self.offset;
            } else {
                self.clamp_view();
            }

            for i in 0..n {
                let slot = self.ring_index(self.screen_rows - n + i);
                self.drop_images_on_row(slot);
                self.recycle_row(slot);
            }
        } else {
            self.rotate_region_window(n, true);
        }

        self.sync_cur_row();
        self.damage.scroll(n, region.top, region.bottom, self.num_cols);
    }

    /// Scroll the scrolling region down by `n` lines: content moves towards
    /// the bottom, blank rows enter at the top.
    pub fn scroll_down(&mut self, n: usize) {
        let region = self.scrolling_region;
        let h = region.height();
        if n == 0 || h == 0 {
            return;
        }
        if n >= h {
            self.erase_scrolling_region();
            return;
        }

        if region.top == 0 && region.bottom == self.screen_rows {
            // Rewind the origin; the slots re-entering at the top are erased,
            // consuming that much history.
            let anchored = self.view == self.offset;
            self.offset = (self.offset + self.num_rows - n) & self.mask();
            self.scrollback_len = self.scrollback_len.saturating_sub(n);
            if anchored {
                self.view = self.offset;
            } else {
                self.clamp_view();
            }

            for i in 0..n {
                let slot = self.ring_index(i);
                self.drop_images_on_row(slot);
                self.recycle_row(slot);
            }
        } else {
            self.rotate_region_window(n, false);
        }

        self.sync_cur_row();
        self.damage
            .scroll_reverse(n, region.top, region.bottom, self.num_cols);
    }

    /// `n >= region height` is defined as "erase the entire region".
    fn erase_scrolling_region(&mut self) {
        let region = self.scrolling_region;
        let (fg, bg) = (self.default_fg, self.default_bg);
        for r in region.top..region.bottom {
            self.screen_row_mut(r).erase(fg, bg);
        }
        let start = self.linear(region.top, 0);
        let length = region.height() * self.num_cols;
        self.damage_erase(start, length);
    }

    /// Rotate the row slots of the scrolling region by `n`, erasing the rows
    /// that re-enter on the vacated side. Sixels anchored inside the window
    /// are destroyed: the rotation re-orders ring slots under their anchors.
    fn rotate_region_window(&mut self, n: usize, up: bool) {
        let region = self.scrolling_region;
        let h = region.height();
        let (fg, bg) = (self.default_fg, self.default_bg);

        let idx: Vec<usize> = (region.top..region.bottom)
            .map(|r| self.ring_index(r))
            .collect();
        for &slot in &idx {
            self.drop_images_on_row(slot);
        }

        let mut window: Vec<Option<Row>> = idx.iter().map(|&slot| self.rows[slot].take()).collect();

        for i in 0..h {
            let src = if up {
                if i < h - n { Some(i + n) } else { None }
            } else if i >= n {
                Some(i - n)
            } else {
                None
            };

            let slot = idx[i];
            match src {
                Some(s) => {
                    let mut row = window[s].take().expect("screen row allocated");
                    row.dirty = true;
                    self.rows[slot] = Some(row);
                }
                None => {
                    // Recycle one of the rows that scrolled out.
                    let recycled = (0..h)
                        .find_map(|j| window[j].take())
                        .unwrap_or_else(|| Row::new(self.num_cols));
                    let mut row = recycled;
                    row.erase(fg, bg);
                    self.rows[slot] = Some(row);
                }
            }
        }
    }

    /// Erase a recycled slot, allocating it on first use.
    fn recycle_row(&mut self, slot: usize) {
        let (fg, bg) = (self.default_fg, self.default_bg);
        let cols = self.num_cols;
        let row = self.rows[slot].get_or_insert_with(|| Row::new(cols));
        row.erase(fg, bg);
    }

    /// Keep the view inside the rows that still exist after the origin moved.
    pub(crate) fn clamp_view(&mut self) {
        let behind = (self.offset + self.num_rows - self.view) & self.mask();
        if behind > self.scrollback_len {
            self.view = self.offset;
        }
    }
}
