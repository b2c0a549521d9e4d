use eecalc_engine::engine::{Dynamic, format_dynamic, format_number};

/// Local handle for a cell record.
///
/// Never leaves the process: the sync protocol addresses cells by index only.
/// Transitions use it to find a record again after indices have shifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub(crate) u64);

/// Last rendered outcome of evaluating a cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellResult {
    /// Not evaluated yet, blank text, or an expression with no value.
    #[default]
    Empty,
    Number(f64),
    /// A non-numeric value (boolean, string) shown verbatim.
    Display(String),
    Error(String),
}

impl CellResult {
    pub fn from_dynamic(value: &Dynamic) -> Self {
        if value.is_unit() {
            CellResult::Empty
        } else if let Ok(n) = value.as_float() {
            CellResult::Number(n)
        } else if let Ok(n) = value.as_int() {
            CellResult::Number(n as f64)
        } else {
            CellResult::Display(format_dynamic(value))
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellResult::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellResult::Error(_))
    }

    /// Text shown in the cell's output area.
    pub fn render(&self) -> String {
        match self {
            CellResult::Empty => String::new(),
            CellResult::Number(n) => format_number(*n),
            CellResult::Display(s) => s.clone(),
            CellResult::Error(e) => e.clone(),
        }
    }
}

/// One ordered slot of the sheet.
#[derive(Debug, Clone)]
pub struct CellRecord {
    pub(crate) id: CellId,
    /// Position in the list; rewritten on every structural change.
    pub index: usize,
    pub text: String,
    pub result: CellResult,
    /// Set while a removal is in flight; absorbs duplicate delete requests.
    pub(crate) deleting: bool,
}

impl CellRecord {
    pub(crate) fn new(id: CellId, index: usize, text: &str) -> Self {
        CellRecord {
            id,
            index,
            text: text.to_string(),
            result: CellResult::Empty,
            deleting: false,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
