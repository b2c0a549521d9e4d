//! Rhai engine creation and expression evaluation.
//!
//! Creates the Rhai scripting engine with all calculator built-ins registered
//! (LL, POW, ...). Also evaluates cell expressions against an [`EvalScope`],
//! with optional user-defined functions loaded from external files.

use rhai::{Dynamic, Engine, EvalAltResult};

use super::preprocess::preprocess_expression;
use super::scope::EvalScope;

/// Upper bound on operations per evaluation; exceeding it is an evaluation error.
pub const MAX_OPERATIONS: u64 = 100_000;

/// Create a Rhai engine with built-ins registered and resource limits set.
pub fn create_engine() -> Engine {
    let mut engine = Engine::new();

    engine.set_max_expr_depths(64, 64);
    engine.set_max_operations(MAX_OPERATIONS);
    engine.set_max_string_size(1_000_000);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(10_000);

    crate::builtins::register_builtins(&mut engine);
    engine
}

/// Create a Rhai engine with built-ins registered.
/// Optionally checks that the custom functions script compiles.
/// Returns the engine and any error message.
pub fn create_engine_with_functions(custom_script: Option<&str>) -> (Engine, Option<String>) {
    let engine = create_engine();

    let error = custom_script.and_then(|script| {
        engine
            .compile(script)
            .err()
            .map(|e| format!("Error in custom functions: {}", e))
    });

    (engine, error)
}

/// Evaluate already-preprocessed script text against `scope`.
///
/// Custom functions are concatenated in front of the expression so that user
/// functions and registered built-ins are visible to each other.
pub fn eval_in_scope(
    engine: &Engine,
    script: &str,
    scope: &mut EvalScope,
    custom_script: Option<&str>,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let mark = scope.len();
    let result = match custom_script {
        Some(functions) => {
            let combined = format!("{}\n{}", functions, script);
            engine.eval_with_scope::<Dynamic>(scope.as_rhai_mut(), &combined)
        }
        None => engine.eval_with_scope::<Dynamic>(scope.as_rhai_mut(), script),
    };
    scope.fold_since(mark);
    result
}

/// Evaluate a cell's raw text: preprocess it, then run it against `scope`.
///
/// Blank text evaluates to `()` without touching the engine. Assignments
/// (`a = 2`) leave the binding in `scope` for the cells that follow.
pub fn evaluate(
    engine: &Engine,
    text: &str,
    scope: &mut EvalScope,
    custom_script: Option<&str>,
) -> Result<Dynamic, Box<EvalAltResult>> {
    let script = preprocess_expression(text);
    if script.trim().is_empty() {
        return Ok(Dynamic::UNIT);
    }
    eval_in_scope(engine, &script, scope, custom_script)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: Dynamic) -> f64 {
        value.as_float().expect("float result")
    }

    #[test]
    fn test_evaluate_plain_arithmetic() {
        let engine = create_engine();
        let mut scope = EvalScope::new();
        assert_eq!(num(evaluate(&engine, "2+2", &mut scope, None).unwrap()), 4.0);
        let third = num(evaluate(&engine, "1/3", &mut scope, None).unwrap());
        assert!((third - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_assignment_persists_in_scope() {
        let engine = create_engine();
        let mut scope = EvalScope::new();
        assert_eq!(num(evaluate(&engine, "a=2", &mut scope, None).unwrap()), 2.0);
        assert_eq!(num(evaluate(&engine, "b=a*3", &mut scope, None).unwrap()), 6.0);
        assert_eq!(num(scope.get("b").unwrap()), 6.0);
    }

    #[test]
    fn test_reassignment_reuses_binding() {
        let engine = create_engine();
        let mut scope = EvalScope::new();
        evaluate(&engine, "a=1", &mut scope, None).unwrap();
        let len = scope.len();
        for _ in 0..50 {
            evaluate(&engine, "a=5", &mut scope, None).unwrap();
        }
        assert_eq!(num(scope.get("a").unwrap()), 5.0);
        assert_eq!(scope.len(), len);
    }

    #[test]
    fn test_constants_can_be_shadowed() {
        let engine = create_engine();
        let mut scope = EvalScope::new();
        evaluate(&engine, "pi=3", &mut scope, None).unwrap();
        evaluate(&engine, "pi=4", &mut scope, None).unwrap();
        assert_eq!(num(evaluate(&engine, "pi", &mut scope, None).unwrap()), 4.0);
    }

    #[test]
    fn test_runaway_loop_is_an_error() {
        let engine = create_engine();
        let mut scope = EvalScope::new();
        let err = evaluate(&engine, "loop {}", &mut scope, None).unwrap_err();
        assert!(matches!(*err, EvalAltResult::ErrorTooManyOperations(_)));
        assert_eq!(num(evaluate(&engine, "1+1", &mut scope, None).unwrap()), 2.0);
    }

    #[test]
    fn test_undefined_reference_errors() {
        let engine = create_engine();
        let mut scope = EvalScope::new();
        let err = evaluate(&engine, "b=a*3", &mut scope, None).unwrap_err();
        assert!(err.to_string().contains('a'));
        assert!(!scope.contains("b"));
    }

    #[test]
    fn test_units_and_constants() {
        let engine = create_engine();
        let mut scope = EvalScope::new();
        let v = num(evaluate(&engine, "10k * 1m", &mut scope, None).unwrap());
        assert!((v - 10.0).abs() < 1e-9);
        let p = num(evaluate(&engine, "2*pi", &mut scope, None).unwrap());
        assert!((p - std::f64::consts::TAU).abs() < 1e-12);
    }

    #[test]
    fn test_blank_is_unit() {
        let engine = create_engine();
        let mut scope = EvalScope::new();
        assert!(evaluate(&engine, "   ", &mut scope, None).unwrap().is_unit());
    }

    #[test]
    fn test_custom_functions() {
        let script = "fn double(x) { x * 2.0 }";
        let (engine, error) = create_engine_with_functions(Some(script));
        assert!(error.is_none());
        let mut scope = EvalScope::new();
        let v = num(evaluate(&engine, "double(21)", &mut scope, Some(script)).unwrap());
        assert_eq!(v, 42.0);
    }

    #[test]
    fn test_custom_functions_compile_error() {
        let (_, error) = create_engine_with_functions(Some("fn broken( {"));
        assert!(error.unwrap().starts_with("Error in custom functions"));
    }
}
