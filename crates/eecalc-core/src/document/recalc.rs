//! Sequential recalculation.
//!
//! Cells are evaluated strictly in index order against one [`EvalScope`], so a
//! cell can read variables assigned by earlier cells but never by later ones.
//! There is no dependency graph: a single-cell recalculation does not revisit
//! the cells after it.

use super::Document;
use crate::sheet::CellResult;
use eecalc_engine::engine::{EvalAltResult, EvalScope, evaluate};

/// What happened when one cell was evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOutcome {
    /// Blank text; nothing evaluated.
    Skipped,
    /// Evaluated to a displayable value.
    Value,
    /// Evaluated, but the expression produced no value.
    NoValue,
    Failed,
    /// No cell at that index.
    Missing,
}

/// Render an evaluation error for display in a cell.
pub fn describe_error(err: &EvalAltResult) -> String {
    match err {
        EvalAltResult::ErrorVariableNotFound(name, _) => format!("Undefined symbol {}", name),
        EvalAltResult::ErrorFunctionNotFound(sig, _) => format!("Unknown function {}", sig),
        EvalAltResult::ErrorParsing(kind, _) => format!("Syntax error: {}", kind),
        other => other.to_string(),
    }
}

impl Document {
    /// Reset the scope and evaluate every cell in index order.
    ///
    /// A failing cell records its error and the pass continues with the
    /// scope as it stood at the failure.
    pub fn recalculate_all(&mut self) {
        let mut scope = EvalScope::new();
        let mut failures = 0usize;
        for index in 0..self.cells.len() {
            if self.calculate_into(index, &mut scope) == CalcOutcome::Failed {
                failures += 1;
            }
        }
        self.scope = scope;
        tracing::debug!(cells = self.cells.len(), failures, "recalculated sheet");
    }

    /// Evaluate one cell against the current scope, without resetting it.
    pub fn recalculate_one(&mut self, index: usize) -> CalcOutcome {
        let mut scope = std::mem::take(&mut self.scope);
        let outcome = self.calculate_into(index, &mut scope);
        self.scope = scope;
        outcome
    }

    fn calculate_into(&mut self, index: usize, scope: &mut EvalScope) -> CalcOutcome {
        let Some(text) = self.cells.get(index).map(|c| c.text.clone()) else {
            return CalcOutcome::Missing;
        };
        if text.trim().is_empty() {
            if let Some(cell) = self.cells.get_mut(index) {
                cell.result = CellResult::Empty;
            }
            return CalcOutcome::Skipped;
        }

        let evaluated = evaluate(&self.engine, &text, scope, self.custom_functions.as_deref());
        let (result, outcome) = match evaluated {
            Ok(value) if value.is_unit() => (CellResult::Empty, CalcOutcome::NoValue),
            Ok(value) => (CellResult::from_dynamic(&value), CalcOutcome::Value),
            Err(err) => (CellResult::Error(describe_error(&err)), CalcOutcome::Failed),
        };
        if let Some(cell) = self.cells.get_mut(index) {
            cell.result = result;
        }
        outcome
    }

    pub fn results(&self) -> Vec<CellResult> {
        self.cells.cells().iter().map(|c| c.result.clone()).collect()
    }
}
