use crate::sheet::CellList;
use eecalc_engine::engine::{EvalScope, create_engine};
use rhai::Engine;
use std::path::PathBuf;

/// UI-agnostic state for one client's copy of a sheet.
pub struct Document {
    /// The ordered cells
    pub cells: CellList,
    /// Rhai engine for evaluating expressions
    pub engine: Engine,
    /// Variables accumulated by the last recalculation pass
    pub scope: EvalScope,
    /// Paths to custom Rhai functions files
    pub functions_files: Vec<PathBuf>,
    /// Custom functions script, concatenated from all files and prepended to
    /// every evaluation
    pub custom_functions: Option<String>,
}

impl Document {
    /// Create a document holding a single blank cell.
    ///
    /// This constructor is side-effect free: it does not touch the filesystem.
    pub fn new() -> Self {
        Document {
            cells: CellList::new(),
            engine: create_engine(),
            scope: EvalScope::new(),
            functions_files: Vec::new(),
            custom_functions: None,
        }
    }

    /// Create a document and load custom function files.
    ///
    /// Files that fail to load are skipped with a warning.
    pub fn with_functions(functions_files: &[PathBuf]) -> Self {
        let mut doc = Self::new();
        for path in functions_files {
            if let Err(e) = doc.load_functions(path) {
                tracing::warn!(path = %path.display(), error = %e, "skipping functions file");
            }
        }
        doc
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
