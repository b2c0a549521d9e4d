//! Document state and logic (UI-agnostic).

mod io;
mod recalc;
mod state;

pub use io::{read_snapshot_file, write_snapshot_file};
pub use recalc::{CalcOutcome, describe_error};
pub use state::Document;
