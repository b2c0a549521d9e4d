//! eecalc-core - UI-agnostic sheet model, recalculation and sync protocol.

pub mod controller;
pub mod document;
pub mod error;
pub mod protocol;
pub mod sheet;
pub mod starters;
pub mod transition;

pub use controller::{Controller, Key};
pub use document::{CalcOutcome, Document};
pub use error::{EecalcError, Result};
pub use protocol::{ClientMessage, Origin, Snapshot, SyncEvent};
pub use sheet::{CellList, CellResult};
pub use transition::{TransitionKind, TransitionScheduler};

pub use eecalc_engine::engine::{format_dynamic, format_number};
