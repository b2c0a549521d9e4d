//! Sheet state: the ordered list of cells that every client keeps in sync.

mod cell;
mod list;

pub use cell::{CellId, CellRecord, CellResult};
pub use list::{CellList, MAX_CELLS, SheetSignal};
