//! Dynamic dispatch of user callables: `map_fn` and `reduce_fn` are
//! passed as a `KernelId` plus a small JSON argument blob rather than a
//! serialized closure. Every node boots the same static registry of
//! named kernels so `invoke(kernel_id, key, value)` is reproducible
//! across any worker.

use std::collections::HashMap;

pub type MapKernel = fn(key: &str, value: &str, args: &serde_json::Value) -> Vec<(String, String)>;
pub type ReduceKernel = fn(out_key: &str, values: &[String], args: &serde_json::Value) -> String;

pub struct KernelRegistry {
    map_kernels: HashMap<&'static str, MapKernel>,
    reduce_kernels: HashMap<&'static str, ReduceKernel>,
}

impl KernelRegistry {
    /// The built-in reference kernels exercised by the word-count test
    /// scenarios.
    pub fn with_builtins() -> KernelRegistry {
        let mut registry = KernelRegistry {
            map_kernels: HashMap::new(),
            reduce_kernels: HashMap::new(),
        };
        registry.register_map("split_words", split_words);
        registry.register_reduce("sum_counts", sum_counts);
        registry
    }

    pub fn register_map(&mut self, id: &'static str, kernel: MapKernel) {
        self.map_kernels.insert(id, kernel);
    }

    pub fn register_reduce(&mut self, id: &'static str, kernel: ReduceKernel) {
        self.reduce_kernels.insert(id, kernel);
    }

    pub fn invoke_map(
        &self,
        kernel_id: &str,
        key: &str,
        value: &str,
        args: &serde_json::Value,
    ) -> crate::error::CoreResult<Vec<(String, String)>> {
        self.map_kernels
            .get(kernel_id)
            .map(|kernel| kernel(key, value, args))
            .ok_or_else(|| crate::error::CoreError::UnknownKernel(kernel_id.to_string()))
    }

    pub fn invoke_reduce(
        &self,
        kernel_id: &str,
        out_key: &str,
        values: &[String],
        args: &serde_json::Value,
    ) -> crate::error::CoreResult<String> {
        self.reduce_kernels
            .get(kernel_id)
            .map(|kernel| kernel(out_key, values, args))
            .ok_or_else(|| crate::error::CoreError::UnknownKernel(kernel_id.to_string()))
    }
}

impl Default for KernelRegistry {
    fn default() -> KernelRegistry {
        KernelRegistry::with_builtins()
    }
}

fn split_words(_key: &str, value: &str, _args: &serde_json::Value) -> Vec<(String, String)> {
    value
        .split_whitespace()
        .map(|word| (word.to_lowercase(), "1".to_string()))
        .collect()
}

fn sum_counts(_out_key: &str, values: &[String], _args: &serde_json::Value) -> String {
    let total: i64 = values.iter().filter_map(|v| v.parse::<i64>().ok()).sum();
    total.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_words_lowercases_and_counts_one_each() {
        let emitted = split_words("line-0", "Hello World hello", &serde_json::Value::Null);
        assert_eq!(
            emitted,
            vec![
                ("hello".to_string(), "1".to_string()),
                ("world".to_string(), "1".to_string()),
                ("hello".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn sum_counts_adds_up_values() {
        let total = sum_counts(
            "hello",
            &["1".to_string(), "1".to_string(), "1".to_string()],
            &serde_json::Value::Null,
        );
        assert_eq!(total, "3");
    }

    #[test]
    fn unknown_kernel_is_an_error() {
        let registry = KernelRegistry::with_builtins();
        let result = registry.invoke_map("does_not_exist", "k", "v", &serde_json::Value::Null);
        assert!(matches!(result, Err(crate::error::CoreError::UnknownKernel(_))));
    }
}
