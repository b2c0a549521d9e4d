//! Evaluation scope threaded through a recalculation pass.

use rhai::{Dynamic, Scope};

/// Mapping from variable name to value, accumulated left to right across cells.
///
/// A fresh scope only holds the constants `pi` and `e`. Cells that assign
/// (`a = 2`) add a binding, or update the existing one of that name.
#[derive(Debug, Clone)]
pub struct EvalScope {
    inner: Scope<'static>,
}

impl EvalScope {
    pub fn new() -> Self {
        let mut inner = Scope::new();
        inner.push_constant("pi", std::f64::consts::PI);
        inner.push_constant("e", std::f64::consts::E);
        EvalScope { inner }
    }

    /// Look up the current value of `name`.
    pub fn get(&self, name: &str) -> Option<Dynamic> {
        self.inner.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    /// Number of bindings, shadowed ones included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Fold bindings pushed since `mark` back into earlier ones of the same
    /// name, so repeated assignments reuse one slot. Constants are shadowed,
    /// never overwritten.
    pub(crate) fn fold_since(&mut self, mark: usize) {
        if self.inner.len() <= mark {
            return;
        }
        let added: Vec<(String, Dynamic)> = self
            .inner
            .iter()
            .skip(mark)
            .map(|(name, _constant, value)| (name.to_string(), value))
            .collect();
        self.inner.rewind(mark);
        for (name, value) in added {
            match self.inner.get_mut(&name) {
                Some(slot) => *slot = value,
                None => {
                    self.inner.push_dynamic(name, value);
                }
            }
        }
    }

    pub(crate) fn as_rhai_mut(&mut self) -> &mut Scope<'static> {
        &mut self.inner
    }
}

impl Default for EvalScope {
    fn default() -> Self {
        Self::new()
    }
}
