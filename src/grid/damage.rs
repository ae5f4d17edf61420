use std::collections::VecDeque;

use serde::Serialize;

/// A damage record: the contract between grid mutators and the renderer.
///
/// Range records address cells by linear coordinate (`row * cols + col` over
/// the screen). Scroll records describe a whole-region shift the renderer can
/// apply as a block blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Damage {
    Update { start: usize, length: usize },
    Erase { start: usize, length: usize },
    Scroll { lines: usize },
    ScrollReverse { lines: usize },
}

/// Ordered damage log. Scroll records merge at the front; range records
/// coalesce at the back; emitting a scroll rewrites the older range records
/// into the post-scroll coordinate frame.
#[derive(Debug, Default)]
pub struct DamageLog {
    records: VecDeque<Damage>,
}

impl DamageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Damage> {
        self.records.iter()
    }

    /// Drain the log; the renderer calls this once per frame.
    pub fn take(&mut self) -> Vec<Damage> {
        self.records.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn update(&mut self, start: usize, length: usize) {
        self.emit_range(false, start, length);
    }

    pub fn erase(&mut self, start: usize, length: usize) {
        self.emit_range(true, start, length);
    }

    fn emit_range(&mut self, is_erase: bool, start: usize, length: usize) {
        if length == 0 {
            return;
        }

        // Coalesce with the last record when kinds match and the ranges touch
        // or overlap.
        if let Some(last) = self.records.back_mut() {
            let (prev_start, prev_length, prev_erase) = match *last {
                Damage::Update { start, length } => (start, length, false),
                Damage::Erase { start, length } => (start, length, true),
                _ => (0, 0, !is_erase),
            };
            if prev_erase == is_erase
                && start <= prev_start + prev_length
                && prev_start <= start + length
            {
                let merged_start = prev_start.min(start);
                let merged_end = (prev_start + prev_length).max(start + length);
                *last = Self::range(is_erase, merged_start, merged_end - merged_start);
                return;
            }
        }

        self.records.push_back(Self::range(is_erase, start, length));
    }

    fn range(is_erase: bool, start: usize, length: usize) -> Damage {
        if is_erase {
            Damage::Erase { start, length }
        } else {
            Damage::Update { start, length }
        }
    }

    pub fn scroll(&mut self, lines: usize, top: usize, bottom: usize, cols: usize) {
        self.emit_scroll(false, lines, top, bottom, cols);
    }

    pub fn scroll_reverse(&mut self, lines: usize, top: usize, bottom: usize, cols: usize) {
        self.emit_scroll(true, lines, top, bottom, cols);
    }

    fn emit_scroll(&mut self, reverse: bool, lines: usize, top: usize, bottom: usize, cols: usize) {
        if lines == 0 {
            return;
        }
        let region_height = bottom - top;

        // Merge with an existing same-direction scroll at the front.
        let merged = match self.records.front_mut() {
            Some(Damage::Scroll { lines: acc }) if !reverse => {
                *acc += lines;
                Some(*acc)
            }
            Some(Damage::ScrollReverse { lines: acc }) if reverse => {
                *acc += lines;
                Some(*acc)
            }
            _ => None,
        };
        let accumulated = merged.unwrap_or_else(|| {
            let record = if reverse {
                Damage::ScrollReverse { lines }
            } else {
                Damage::Scroll { lines }
            };
            self.records.push_front(record);
            lines
        });

        // A scroll of the whole region (or more) is just an erase of it.
        if accumulated >= region_height {
            self.records[0] = Damage::Erase {
                start: top * cols,
                length: region_height * cols,
            };
        }

        // Rewrite the older range records into the post-scroll frame so a
        // later emit can still coalesce with them.
        let delta = (lines * cols) as isize * if reverse { -1 } else { 1 };
        let lo = (top * cols) as isize;
        let hi = (bottom * cols) as isize;

        let mut i = 1;
        while i < self.records.len() {
            let (start, length, is_erase) = match self.records[i] {
                Damage::Update { start, length } => (start, length, false),
                Damage::Erase { start, length } => (start, length, true),
                _ => {
                    i += 1;
                    continue;
                }
            };

            let new_start = (start as isize - delta).max(lo);
            let new_end = ((start + length) as isize - delta).min(hi);

            if new_start >= new_end {
                // Entirely scrolled out of the region.
                let _ = self.records.remove(i);
                continue;
            }

            self.records[i] =
                Self::range(is_erase, new_start as usize, (new_end - new_start) as usize);
            i += 1;
        }
    }
}
