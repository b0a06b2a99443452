//! Team name canonicalization.

use std::collections::{BTreeMap, HashMap};

/// Maps raw team names to canonical ones with an exact, whole-field lookup.
///
/// Names missing from the correction table pass through unchanged, so an
/// incomplete table never stops a file from being processed. Partial or
/// fuzzy aliases are not matched.
#[derive(Debug, Clone, Default)]
pub struct TeamNameNormalizer {
    corrections: HashMap<String, String>,
}

impl TeamNameNormalizer {
    pub fn new(corrections: &BTreeMap<String, String>) -> Self {
        Self {
            corrections: corrections
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn normalize(&self, raw_name: &str) -> String {
        self.corrections
            .get(raw_name)
            .cloned()
            .unwrap_or_else(|| raw_name.to_string())
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }
}
