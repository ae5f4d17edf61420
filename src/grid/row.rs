use crate::color::Color;

use super::cell::Cell;

/// A single row in the grid: a contiguous array of cells plus per-row flags.
#[derive(Debug, Clone)]
pub struct Row {
    pub cells: Vec<Cell>,
    /// Any cell in the row has been written since the last paint.
    pub dirty: bool,
    /// This row ends a logical line; the next row is not its soft-wrap
    /// continuation. True for fresh and erased rows (each stands as its own
    /// logical line); only a soft wrap continuing onto the next row clears
    /// it. Consulted by reflow and selection extraction.
    pub linebreak: bool,
}

impl Row {
    /// Allocate a row with every cell initialized to empty-and-clean.
    pub fn new(cols: usize) -> Self {
        Self {
            cells: vec![Cell::default(); cols],
            dirty: false,
            linebreak: true,
        }
    }

    pub fn cols(&self) -> usize {
        self.cells.len()
    }

    /// Erase every cell with the given default colors. The blank row is not
    /// a continuation of anything, so it regains its hard break.
    pub fn erase(&mut self, fg: Color, bg: Color) {
        for cell in &mut self.cells {
            cell.erase(fg, bg);
        }
        self.dirty = true;
        self.linebreak = true;
    }

    /// Insert `count` blank cells at `col`, shifting the tail right; cells
    /// pushed past the last column are discarded.
    pub fn insert_blanks(&mut self, col: usize, count: usize) {
        let cols = self.cells.len();
        if col >= cols {
            return;
        }
        let count = count.min(cols - col);
        for _ in 0..count {
            self.cells.pop();
            self.cells.insert(col, Cell::default());
        }
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::cell::CharCode;

    #[test]
    fn new_row_is_clean_and_hard_broken() {
        let row = Row::new(4);
        assert_eq!(row.cols(), 4);
        assert!(!row.dirty);
        assert!(row.linebreak);
        assert!(row.cells.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn erase_marks_dirty_and_restores_hard_break() {
        let mut row = Row::new(3);
        row.linebreak = false;
        row.cells[1].wc = 'x' as CharCode;
        row.erase(Color::Default, Color::indexed(4));
        assert!(row.dirty);
        assert!(row.linebreak);
        assert!(row.cells[1].is_empty());
        assert_eq!(row.cells[1].bg, Color::indexed(4));
    }

    #[test]
    fn insert_blanks_shifts_right_and_drops_tail() {
        let mut row = Row::new(4);
        for (i, c) in "abcd".chars().enumerate() {
            row.cells[i].wc = c as CharCode;
        }
        row.insert_blanks(1, 2);
        assert_eq!(row.cells[0].wc, 'a' as CharCode);
        assert!(row.cells[1].is_empty());
        assert!(row.cells[2].is_empty());
        assert_eq!(row.cells[3].wc, 'b' as CharCode);
    }
}
