//! Raw CSV normalization.
//!
//! - [`columns`]: the declarative column spec
//! - [`normalizer`]: team name canonicalization
//! - [`cleaner`]: the per-file cleaning pipeline
//! - [`orchestrator`]: single-file and batch runs

pub mod cleaner;
pub mod columns;
pub mod normalizer;
pub mod orchestrator;
