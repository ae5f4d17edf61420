//! Terminal grid core: the in-memory cell buffer behind a terminal emulator.
//!
//! The crate models a scrollback ring with a rotating origin, damage
//! (dirty-region) tracking for minimal repaints, in-region scrolling, resize
//! with and without reflow, and the selection state machine driving
//! copy/paste extraction. Rendering, pty I/O, and escape-sequence parsing
//! live upstream; they drive this crate through [`Term`].

pub mod color;
pub mod config;
pub mod error;
pub mod grid;
pub mod modes;
pub mod selection;
pub mod term;
pub mod transfer;

pub use color::Color;
pub use config::Config;
pub use error::Error;
pub use grid::{
    Cell, CellAttrs, CharCode, ComposedTable, Cursor, Damage, Grid, ImageId, Point, Row,
    ScrollRegion, SixelImage, COMB_CHARS_HI, COMB_CHARS_LO, MULT_COL_SPACER,
};
pub use modes::Modes;
pub use selection::{Selection, SelectionKind};
pub use term::{Pen, Term};
pub use transfer::{
    ReceiveContext, SendContext, SendStatus, TransferSink, BRACKETED_PASTE_BEGIN,
    BRACKETED_PASTE_END, MIME_TEXT_UTF8,
};
