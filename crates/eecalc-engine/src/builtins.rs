//! Built-in calculator functions (Rust) registered on every engine.
//!
//! Conventions:
//! - Calculator-facing built-in names are ALL CAPS (e.g. `LL`, `POW`).
//! - Rhai's own lowercase math (`sqrt`, `sin`, `ln`, ...) stays available.
//! - Numeric literals are floats after preprocessing, but values can still arrive
//!   as integers (array lengths, user functions), so both are accepted.

use rand::Rng;
use rhai::{Array, Dynamic, Engine, EvalAltResult, Position};

fn invalid_arg(message: &str) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(
        Dynamic::from(message.to_string()),
        Position::NONE,
    ))
}

fn to_f64(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|n| n as f64))
}

/// Parallel combination: `1 / (1/a + 1/b + ...)`.
pub fn parallel(values: &[f64]) -> f64 {
    let sum: f64 = values.iter().map(|v| 1.0 / v).sum();
    1.0 / sum
}

fn parallel_array(values: Array) -> Result<f64, Box<EvalAltResult>> {
    if values.is_empty() {
        return Err(invalid_arg("LL needs at least one value"));
    }
    let mut nums = Vec::with_capacity(values.len());
    for v in &values {
        match to_f64(v) {
            Some(n) => nums.push(n),
            None => return Err(invalid_arg(&format!("LL: not a number: {}", v))),
        }
    }
    Ok(parallel(&nums))
}

pub fn register_builtins(engine: &mut Engine) {
    // LL(a, b, ...): parallel resistors / series capacitors
    engine.register_fn("LL", |a: f64, b: f64| -> f64 { parallel(&[a, b]) });
    engine.register_fn("LL", |a: f64, b: f64, c: f64| -> f64 {
        parallel(&[a, b, c])
    });
    engine.register_fn("LL", |a: f64, b: f64, c: f64, d: f64| -> f64 {
        parallel(&[a, b, c, d])
    });
    engine.register_fn("LL", parallel_array);

    // POW(base, exp): exponentiation
    engine.register_fn("POW", |base: f64, exp: f64| -> f64 { base.powf(exp) });
    engine.register_fn("POW", |base: i64, exp: i64| -> f64 {
        (base as f64).powf(exp as f64)
    });

    // SQRT(x): square root
    engine.register_fn("SQRT", |x: f64| -> f64 { x.sqrt() });
    engine.register_fn("SQRT", |x: i64| -> f64 { (x as f64).sqrt() });

    // DB(ratio): power ratio in decibels; DBV(ratio): amplitude ratio in decibels
    engine.register_fn("DB", |ratio: f64| -> f64 { 10.0 * ratio.log10() });
    engine.register_fn("DBV", |ratio: f64| -> f64 { 20.0 * ratio.log10() });

    // RAND(): random float in [0.0, 1.0)
    engine.register_fn("RAND", || -> f64 { rand::thread_rng().r#gen() });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        let mut engine = Engine::new();
        register_builtins(&mut engine);
        engine
    }

    #[test]
    fn test_ll_two_equal_resistors() {
        let result: f64 = engine().eval("LL(100.0, 100.0)").unwrap();
        assert!((result - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_ll_three_and_array() {
        let engine = engine();
        let three: f64 = engine.eval("LL(300.0, 300.0, 300.0)").unwrap();
        assert!((three - 100.0).abs() < 1e-9);
        let arr: f64 = engine.eval("LL([60.0, 60.0, 60.0, 60.0, 60.0])").unwrap();
        assert!((arr - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_ll_rejects_empty_array() {
        assert!(engine().eval::<f64>("LL([])").is_err());
    }

    #[test]
    fn test_db() {
        let result: f64 = engine().eval("DBV(10.0)").unwrap();
        assert!((result - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_rand_range() {
        let engine = engine();
        for _ in 0..50 {
            let result: f64 = engine.eval("RAND()").unwrap();
            assert!((0.0..1.0).contains(&result));
        }
    }
}
