//! CSV output for raw grids and processed tables.
//!
//! # Output Structure
//!
//! ```text
//! data/
//! ├── raw/
//! │   ├── premier_league-2024-2025.csv
//! │   └── premier_league-2023-2024.csv
//! └── processed/
//!     ├── premier_league-2024-2025-processed.csv
//!     └── premier_league-2023-2024-processed.csv
//! ```

pub mod csv;
