//! eecalc_engine - Expression evaluation + Rhai integration.

pub(crate) mod builtins;
pub mod engine;

pub use builtins::parallel;

#[cfg(test)]
mod tests {
    use crate::engine::*;

    fn eval_all(texts: &[&str]) -> Vec<Result<Dynamic, String>> {
        let engine = create_engine();
        let mut scope = EvalScope::new();
        texts
            .iter()
            .map(|t| evaluate(&engine, t, &mut scope, None).map_err(|e| e.to_string()))
            .collect()
    }

    #[test]
    fn test_sequential_scope_threading() {
        let results = eval_all(&["a=2", "b=a*3", "c=a+1"]);
        let nums: Vec<f64> = results
            .into_iter()
            .map(|r| r.unwrap().as_float().unwrap())
            .collect();
        assert_eq!(nums, vec![2.0, 6.0, 3.0]);
    }

    #[test]
    fn test_forward_reference_fails() {
        let results = eval_all(&["b=a*3", "a=2"]);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().as_float().unwrap(), 2.0);
    }

    #[test]
    fn test_voltage_divider() {
        let results = eval_all(&["R1 = 10k", "R2 = 4.7k", "V = 12", "V * R2 / (R1 + R2)"]);
        let out = results[3].as_ref().unwrap().as_float().unwrap();
        assert!((out - 12.0 * 4700.0 / 14700.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_notation() {
        let results = eval_all(&["LL(1k, 1k)"]);
        let out = results[0].as_ref().unwrap().as_float().unwrap();
        assert!((out - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_power_operator() {
        let results = eval_all(&["2^10"]);
        assert_eq!(results[0].as_ref().unwrap().as_float().unwrap(), 1024.0);
    }
}
