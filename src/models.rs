//! Data models shared by the scrape and process pipelines.
//!
//! - [`RawGrid`]: a table exactly as extracted from a page, all strings
//! - [`Table`] / [`Cell`]: the typed table the cleaner transforms
//! - [`ScrapeTarget`]: one resolved URL to fetch

use chrono::{Datelike, NaiveDate};

/// Header row plus data rows of string cells, in page order.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawGrid {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// First and last calendar year found in a `YYYY-MM-DD` column.
    ///
    /// Unparsable values are ignored; `None` when nothing parses.
    pub fn year_span(&self, column: &str) -> Option<(i32, i32)> {
        let idx = self.column_index(column)?;
        let years = self
            .rows
            .iter()
            .filter_map(|row| row.get(idx))
            .filter_map(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
            .map(|d| d.year());

        years.fold(None, |acc, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })
    }
}

/// A typed cell value. Empty input is [`Cell::Empty`], never an empty `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
}

impl Cell {
    pub fn from_raw(raw: &str) -> Cell {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// CSV rendering. Floats always keep a decimal so `2.0` does not read back as an int.
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{:.1}", f)
                } else {
                    f.to_string()
                }
            }
        }
    }
}

/// Column-named table of typed cells used by the cleaner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Removes a column if present. Returns whether it existed.
    pub fn remove_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.headers.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Appends a column, or overwrites it when the name already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
    }

    /// Keeps rows for which `keep` returns true. Returns how many were dropped.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[Cell]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }
}

impl From<RawGrid> for Table {
    fn from(grid: RawGrid) -> Self {
        Table {
            headers: grid.headers,
            rows: grid
                .rows
                .iter()
                .map(|row| row.iter().map(|v| Cell::from_raw(v)).collect())
                .collect(),
        }
    }
}

/// One URL the scrape orchestrator will fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    /// League key from the registry, or a name derived from a custom URL.
    pub league: String,
    /// Starting year of the season for historical targets.
    pub season: Option<i32>,
    pub url: String,
}

impl ScrapeTarget {
    /// Key used in the outcome map: `premier_league` or `premier_league-2022-2023`.
    pub fn label(&self) -> String {
        match self.season {
            Some(year) => format!("{}-{}-{}", self.league, year, year + 1),
            None => self.league.clone(),
        }
    }
}
