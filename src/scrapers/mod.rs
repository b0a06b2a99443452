//! Fixtures scraping.
//!
//! The scrape pipeline has three layers:
//!
//! 1. **Resolving** ([`leagues`]): turn a league selection into URLs, expanding
//!    past seasons in historical mode
//! 2. **Fetching** ([`fetcher`], [`table`]): download each page with retry and
//!    extract its fixtures table
//! 3. **Persisting** ([`orchestrator`]): write each grid to the raw directory
//!
//! # Supported Layout
//!
//! | Site | Page | Table |
//! |------|------|-------|
//! | FBref | `/comps/<id>/schedule/<League>-Scores-and-Fixtures` | header with `Date`, `Home`, `Away`, `Score` |
//!
//! Other sites work when their fixtures page has a table whose header holds
//! the configured keywords.

pub mod fetcher;
pub mod leagues;
pub mod orchestrator;
pub mod table;
