//! Synthetic identifier generation

use std::collections::HashMap;

/// Per-prefix monotonic counters.
///
/// Ids are unique per prefix for the lifetime of one generator. Build a
/// fresh generator for every compile so output stays reproducible.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    counters: HashMap<String, u64>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for `prefix`: `{prefix}-0`, `{prefix}-1`, ...
    pub fn generate(&mut self, prefix: &str) -> String {
        let counter = match self.counters.get_mut(prefix) {
            Some(counter) => {
                *counter += 1;
                *counter
            }
            None => {
                self.counters.insert(prefix.to_string(), 0);
                0
            }
        };
        format!("{}-{}", prefix, counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_prefix() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.generate("object"), "object-0");
        assert_eq!(ids.generate("object"), "object-1");
        assert_eq!(ids.generate("enum"), "enum-0");
        assert_eq!(ids.generate("object"), "object-2");
    }

    #[test]
    fn test_fresh_generators_repeat() {
        let mut a = IdGenerator::new();
        let mut b = IdGenerator::new();
        assert_eq!(a.generate("x"), b.generate("x"));
    }
}
