/// Mode flags the grid core consults. The full DEC/ANSI mode table lives in
/// the escape-sequence interpreter; only the modes that change how cells are
/// written or how paste is framed are mirrored here.
#[derive(Debug, Clone)]
pub struct Modes {
    /// DECAWM: auto-wrap mode
    pub autowrap: bool,
    /// IRM: insert mode
    pub insert: bool,
    /// Bracketed paste mode (mode 2004)
    pub bracketed_paste: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Self {
            autowrap: true,
            insert: false,
            bracketed_paste: false,
        }
    }
}
