//! Per-item outcomes of a batch run.

use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{error, info, warn};

/// Ordered map of item key -> outcome, with attempted/succeeded/failed counts.
#[derive(Debug)]
pub struct BatchSummary<T, E> {
    pub outcomes: BTreeMap<String, Result<T, E>>,
}

impl<T, E> Default for BatchSummary<T, E> {
    fn default() -> Self {
        Self {
            outcomes: BTreeMap::new(),
        }
    }
}

impl<T, E> BatchSummary<T, E> {
    pub fn record(&mut self, key: impl Into<String>, outcome: Result<T, E>) {
        self.outcomes.insert(key.into(), outcome);
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &E)> {
        self.outcomes
            .iter()
            .filter_map(|(k, o)| o.as_ref().err().map(|e| (k.as_str(), e)))
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Result<T, E>> {
        self.outcomes.get(key)
    }
}

impl<T, E: Display> BatchSummary<T, E> {
    /// Emit the end-of-run summary and one line per failure.
    pub fn log(&self, what: &str) {
        for (key, e) in self.failures() {
            error!(item = %key, error = %e, "{what} failed");
        }
        if self.failed() == 0 {
            info!(
                attempted = self.attempted(),
                succeeded = self.succeeded(),
                failed = 0,
                "{what} run complete"
            );
        } else {
            warn!(
                attempted = self.attempted(),
                succeeded = self.succeeded(),
                failed = self.failed(),
                "{what} run finished with failures"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut s: BatchSummary<u32, String> = BatchSummary::default();
        s.record("a.csv", Ok(1));
        s.record("b.csv", Err("boom".into()));
        s.record("c.csv", Ok(3));
        assert_eq!(s.attempted(), 3);
        assert_eq!(s.succeeded(), 2);
        assert_eq!(s.failed(), 1);
        let failures: Vec<_> = s.failures().collect();
        assert_eq!(failures, vec![("b.csv", &"boom".to_string())]);
    }
}
