//! Expression engine API.
//!
//! - [`EvalScope`] - Variables accumulated across a recalculation pass
//! - [`preprocess_expression`] - Engineering notation → Rhai script
//! - [`create_engine`] - Create a Rhai engine with built-in functions
//! - [`evaluate`] - Evaluate one cell's text against a scope
//! - [`format_dynamic`] - Format values for display

mod eval;
mod format;
mod preprocess;
mod scope;

pub use eval::{create_engine, create_engine_with_functions, eval_in_scope, evaluate};
pub use format::{format_dynamic, format_number};
pub use preprocess::{
    UNIT_SUFFIXES, expand_unit_suffixes, normalize_numbers, preprocess_expression,
    rewrite_assignment, rewrite_power,
};
pub use scope::EvalScope;

pub use rhai::{Dynamic, Engine, EvalAltResult};
