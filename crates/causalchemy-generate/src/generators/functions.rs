use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Pure function over one row of parent values, in parent order.
pub type CombineFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Named combine functions available to functional nodes.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, CombineFn>,
}

impl FunctionRegistry {
    /// Registry preloaded with `sum`, `product`, `mean`, `min` and `max`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("sum", |values: &[f64]| values.iter().sum());
        registry.register("product", |values: &[f64]| values.iter().product());
        registry.register("mean", |values: &[f64]| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        });
        registry.register("min", |values: &[f64]| {
            values.iter().copied().reduce(f64::min).unwrap_or(0.0)
        });
        registry.register("max", |values: &[f64]| {
            values.iter().copied().reduce(f64::max).unwrap_or(0.0)
        });
        registry
    }

    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// Add or replace a function.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<CombineFn> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = FunctionRegistry::new();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["max", "mean", "min", "product", "sum"]
        );
        let values = [2.0, -1.0, 5.0];
        assert_eq!(registry.get("sum").unwrap()(&values), 6.0);
        assert_eq!(registry.get("product").unwrap()(&values), -10.0);
        assert_eq!(registry.get("mean").unwrap()(&values), 2.0);
        assert_eq!(registry.get("min").unwrap()(&values), -1.0);
        assert_eq!(registry.get("max").unwrap()(&values), 5.0);
    }

    #[test]
    fn custom_functions_can_be_added() {
        let mut registry = FunctionRegistry::empty();
        assert!(registry.get("hypot").is_none());
        registry.register("hypot", |values: &[f64]| {
            values.iter().map(|value| value * value).sum::<f64>().sqrt()
        });
        assert_eq!(registry.get("hypot").unwrap()(&[3.0, 4.0]), 5.0);
    }
}
