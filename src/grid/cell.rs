use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

use crate::color::Color;

/// Character code stored in a cell. Codes are drawn from disjoint ranges:
/// `0` (empty cell), a Unicode scalar value, [`MULT_COL_SPACER`], or an index
/// into the composed-character table in `[COMB_CHARS_LO, COMB_CHARS_HI)`.
pub type CharCode = u32;

/// Marks the continuation cells of a wide (multi-column) character.
pub const MULT_COL_SPACER: CharCode = 0x0020_0000;

/// First code in the composed-character range. `wc - COMB_CHARS_LO` indexes
/// the [`ComposedTable`].
pub const COMB_CHARS_LO: CharCode = 0x0040_0000;

/// One past the last representable composed-character code.
pub const COMB_CHARS_HI: CharCode = 0x0050_0000;

bitflags! {
    /// Cell display attributes as a compact bitflag set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct CellAttrs: u16 {
        const BOLD          = 1 << 0;
        const DIM           = 1 << 1;
        const ITALIC        = 1 << 2;
        const UNDERLINE     = 1 << 3;
        const BLINK         = 1 << 4;
        const REVERSE       = 1 << 5;
        const HIDDEN        = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
        /// Renderer hint: the cell has not changed since it was last painted.
        const CLEAN         = 1 << 8;
    }
}

/// A single terminal cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub wc: CharCode,
    pub fg: Color,
    pub bg: Color,
    pub attrs: CellAttrs,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            wc: 0,
            fg: Color::Default,
            bg: Color::Default,
            attrs: CellAttrs::CLEAN,
        }
    }
}

impl Cell {
    /// Create a spacer cell for a continuation column of a wide character,
    /// copying the attributes of the head cell.
    pub fn spacer_for(head: &Cell) -> Self {
        Self {
            wc: MULT_COL_SPACER,
            fg: head.fg,
            bg: head.bg,
            attrs: head.attrs & !CellAttrs::CLEAN,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wc == 0
    }

    pub fn is_spacer(&self) -> bool {
        self.wc == MULT_COL_SPACER
    }

    /// Erase the cell: empty glyph, the grid's default colors, no attributes.
    pub fn erase(&mut self, fg: Color, bg: Color) {
        self.wc = 0;
        self.fg = fg;
        self.bg = bg;
        self.attrs = CellAttrs::empty();
    }
}

/// A base character plus the zero-width combiners folded onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct Composed {
    pub base: char,
    pub combiners: Vec<char>,
}

/// Side table of composed (base + combiners) sequences. Cells reference an
/// entry with a code in `[COMB_CHARS_LO, COMB_CHARS_HI)`.
#[derive(Debug, Default)]
pub struct ComposedTable {
    entries: Vec<Composed>,
}

impl ComposedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `combiner` onto the character currently encoded by `wc`,
    /// returning the code of the composed entry. If the table is full the
    /// combiner is dropped and `wc` is returned unchanged.
    pub fn compose(&mut self, wc: CharCode, combiner: char) -> CharCode {
        let (base, mut combiners) = match self.lookup(wc) {
            Some(existing) => (existing.base, existing.combiners.clone()),
            None => match char::from_u32(wc) {
                Some(c) => (c, Vec::new()),
                None => return wc,
            },
        };
        combiners.push(combiner);

        if COMB_CHARS_LO + self.entries.len() as CharCode >= COMB_CHARS_HI {
            tracing::warn!("composed-character table full; dropping combiner");
            return wc;
        }

        self.entries.push(Composed { base, combiners });
        COMB_CHARS_LO + (self.entries.len() - 1) as CharCode
    }

    pub fn lookup(&self, wc: CharCode) -> Option<&Composed> {
        if (COMB_CHARS_LO..COMB_CHARS_HI).contains(&wc) {
            self.entries.get((wc - COMB_CHARS_LO) as usize)
        } else {
            None
        }
    }

    /// Resolve a code to the base glyph used for width and reflow decisions.
    pub fn base_char(&self, wc: CharCode) -> Option<char> {
        match self.lookup(wc) {
            Some(composed) => Some(composed.base),
            None => char::from_u32(wc),
        }
    }

    /// The column width of a character code: `max(1, wcwidth)`, with unknown
    /// and negative widths treated as 1.
    pub fn width(&self, wc: CharCode) -> usize {
        match self.base_char(wc) {
            Some(c) => UnicodeWidthChar::width(c).unwrap_or(1).max(1),
            None => 1,
        }
    }

    /// Append the UTF-8 encoding of a cell's character to `out`. Empty and
    /// spacer codes contribute nothing.
    pub fn encode_utf8(&self, wc: CharCode, out: &mut String) {
        if wc == 0 || wc == MULT_COL_SPACER {
            return;
        }
        if let Some(composed) = self.lookup(wc) {
            out.push(composed.base);
            for &c in &composed.combiners {
                out.push(c);
            }
        } else if let Some(c) = char::from_u32(wc) {
            out.push(c);
        }
    }
}
