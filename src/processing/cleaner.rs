//! CSV cleaner/transformer.
//!
//! Turns one raw fixtures file into an analysis-ready file. The steps run in
//! a fixed order, each relying on the previous one:
//!
//! 1. **Load** the raw CSV (`LOAD` on unreadable or empty input)
//! 2. **Row filtering**: drop rows with an empty key column (`rows_to_drop`)
//! 3. **Column pruning**: remove `columns_to_drop`
//! 4. **Required columns**: `MISSING_REQUIRED_COLUMN` when one is absent; rows
//!    with an empty required value are dropped
//! 5. **Splitting**: `Score` into home/away goals (malformed rows dropped), and
//!    expected goals into home/away
//! 6. **Normalization** of team names
//! 7. **Type coercion**: rows with a value that does not coerce are dropped
//! 8. **Reordering** onto exactly `cols_order`
//! 9. **Save** as `{stem}-processed.csv` in the processed directory
//!
//! Row-level problems never fail the file; they are counted in the
//! [`ProcessReport`] and logged.

use crate::errors::{ProcessError, ProcessErrorKind};
use crate::models::{Cell, Table};
use crate::outputs::csv::write_table;
use crate::processing::columns::{ColumnSpec, ScoreSplit, XgSplit};
use crate::processing::normalizer::TeamNameNormalizer;
use crate::scrapers::table::dedupe_headers;
use crate::utils::truncate_for_log;
use csv::ReaderBuilder;
use itertools::Itertools;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Row counts for one processed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_loaded: usize,
    pub dropped_incomplete: usize,
    pub dropped_missing_required: usize,
    pub dropped_malformed_score: usize,
    pub dropped_uncoercible: usize,
    pub rows_written: usize,
}

pub struct Cleaner {
    spec: ColumnSpec,
    normalizer: TeamNameNormalizer,
    processed_dir: PathBuf,
    score_pattern: Regex,
}

impl Cleaner {
    pub fn new(
        spec: ColumnSpec,
        normalizer: TeamNameNormalizer,
        processed_dir: PathBuf,
    ) -> Result<Self, regex::Error> {
        let score_pattern = score_regex(&spec.score.separator)?;
        if normalizer.is_empty() {
            warn!("No team name corrections configured; names pass through unchanged");
        } else {
            debug!(corrections = normalizer.len(), "Cleaner ready");
        }
        Ok(Self {
            spec,
            normalizer,
            processed_dir,
            score_pattern,
        })
    }

    /// `{processed_dir}/{stem}-processed.csv`
    pub fn output_path(&self, raw_path: &Path) -> PathBuf {
        let stem = raw_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        self.processed_dir.join(format!("{stem}-processed.csv"))
    }

    /// Run the whole pipeline for one raw file and write the result.
    ///
    /// # Arguments
    ///
    /// * `raw_path` - Raw CSV as written by the scraper
    ///
    /// # Returns
    ///
    /// Per-step row counts and the path of `{stem}-processed.csv`.
    ///
    /// # Errors
    ///
    /// - `LOAD` if the file is unreadable, empty or has no data rows
    /// - `MISSING_REQUIRED_COLUMN` if a required column is absent after pruning
    /// - `TRANSFORM` if the processed file cannot be written
    #[instrument(level = "info", skip(self), fields(path = %raw_path.display()))]
    pub async fn process(&self, raw_path: &Path) -> Result<ProcessReport, ProcessError> {
        let table = load_table(raw_path).await?;
        let mut report = ProcessReport {
            input: raw_path.to_path_buf(),
            output: self.output_path(raw_path),
            rows_loaded: table.len(),
            ..Default::default()
        };
        info!(rows = table.len(), columns = table.headers.len(), "Loaded raw CSV");

        let table = self.clean(raw_path, table, &mut report)?;
        report.rows_written = table.len();
        if table.is_empty() {
            warn!("No rows survived cleaning; writing header only");
        }

        write_table(&report.output, &table)
            .await
            .map_err(|e| ProcessError::transform(raw_path, e))?;

        info!(
            rows_written = report.rows_written,
            output = %report.output.display(),
            "Processed file"
        );
        Ok(report)
    }

    /// Steps 2 to 8 on an in-memory table.
    pub fn clean(
        &self,
        path: &Path,
        mut table: Table,
        report: &mut ProcessReport,
    ) -> Result<Table, ProcessError> {
        let spec = &self.spec;

        report.dropped_incomplete = drop_incomplete_rows(&mut table, &spec.rows_to_drop);
        info!(dropped = report.dropped_incomplete, "Dropped rows with missing key values");

        let pruned = prune_columns(&mut table, &spec.columns_to_drop);
        info!(columns = %pruned.iter().join(", "), "Dropped columns");

        if let Some(missing) = spec.required_columns.iter().find(|c| !table.has_column(c)) {
            warn!(column = %missing, "Required column missing");
            return Err(ProcessError::new(
                ProcessErrorKind::MissingRequiredColumn,
                path,
                format!("missing required column '{missing}'"),
            ));
        }
        report.dropped_missing_required = drop_incomplete_rows(&mut table, &spec.required_columns);
        if report.dropped_missing_required > 0 {
            info!(
                dropped = report.dropped_missing_required,
                "Dropped rows with empty required values"
            );
        }

        report.dropped_malformed_score = split_score(&mut table, &spec.score, &self.score_pattern);
        info!(
            dropped = report.dropped_malformed_score,
            separator = %spec.score.separator,
            "Split score into home/away"
        );
        split_xg(&mut table, &spec.xg, &spec.score.separator);

        for column in &spec.team_columns {
            if !normalize_column(&mut table, column, &self.normalizer) {
                warn!(%column, "Team column not found for normalization");
            }
        }
        debug!("Normalized team names");

        report.dropped_uncoercible = coerce_columns(
            &mut table,
            &spec.cols_to_convert_int,
            &spec.cols_to_convert_float,
        );
        info!(dropped = report.dropped_uncoercible, "Coerced numeric columns");

        let table = reorder(table, &spec.cols_order);
        info!(columns = %table.headers.iter().join(", "), "Reordered columns");
        Ok(table)
    }
}

fn score_regex(separator: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^\s*(\d+)\s*{}\s*(\d+)\s*$",
        regex::escape(separator)
    ))
}

/// Read a raw CSV into a [`Table`].
///
/// Ragged rows are padded or truncated to the header width, and repeated
/// header names get `.1`, `.2` suffixes.
#[instrument(level = "debug")]
pub async fn load_table(path: &Path) -> Result<Table, ProcessError> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| ProcessError::load(path, e))?;

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes.as_slice());

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(|e| ProcessError::load(path, e))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    if raw_headers.iter().all(|h| h.is_empty()) {
        return Err(ProcessError::load(path, "file is empty"));
    }
    let width = raw_headers.len();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ProcessError::load(path, e))?;
        let mut row: Vec<Cell> = record.iter().take(width).map(Cell::from_raw).collect();
        row.resize(width, Cell::Empty);
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(ProcessError::load(path, "file has a header but no rows"));
    }

    Ok(Table {
        headers: dedupe_headers(&raw_headers),
        rows,
    })
}

/// Drop rows with an empty value in any of `columns` that exist. Returns the count dropped.
pub fn drop_incomplete_rows(table: &mut Table, columns: &[String]) -> usize {
    let (present, missing): (Vec<_>, Vec<_>) =
        columns.iter().partition(|c| table.has_column(c));
    if !missing.is_empty() {
        debug!(columns = %missing.iter().join(", "), "Key columns not in table");
    }
    let indices: Vec<usize> = present
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();
    table.retain_rows(|row| indices.iter().all(|&i| !row[i].is_empty()))
}

/// Remove the listed columns that exist. Returns the names actually removed.
pub fn prune_columns(table: &mut Table, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| table.remove_column(c))
        .cloned()
        .collect()
}

/// Replace the score column with home/away goal strings.
///
/// Rows whose score does not match `<int><separator><int>` are dropped;
/// returns how many.
pub fn split_score(table: &mut Table, split: &ScoreSplit, pattern: &Regex) -> usize {
    let Some(idx) = table.column_index(&split.column) else {
        warn!(column = %split.column, "Score column not found; nothing to split");
        return 0;
    };

    let before = table.len();
    let mut home = Vec::with_capacity(before);
    let mut away = Vec::with_capacity(before);
    for row in std::mem::take(&mut table.rows) {
        let goals = row[idx]
            .as_text()
            .and_then(|s| pattern.captures(s))
            .map(|c| (c[1].to_string(), c[2].to_string()));
        match goals {
            Some((h, a)) => {
                home.push(Cell::Text(h));
                away.push(Cell::Text(a));
                table.rows.push(row);
            }
            None => {
                let value = row[idx].as_text().unwrap_or("");
                debug!(value = %truncate_for_log(value, 40), "Dropping row with malformed score");
            }
        }
    }

    table.remove_column(&split.column);
    table.set_column(&split.home, home);
    table.set_column(&split.away, away);
    before - table.len()
}

/// Produce the home/away expected-goals columns.
///
/// Two source columns are renamed; a single one holding `<home><separator><away>`
/// is split. Values stay strings until coercion.
pub fn split_xg(table: &mut Table, split: &XgSplit, separator: &str) {
    let home_idx = table.column_index(&split.home_source);
    let away_idx = table.column_index(&split.away_source);

    let (home, away): (Vec<Cell>, Vec<Cell>) = match (home_idx, away_idx) {
        (Some(h), Some(a)) => table
            .rows
            .iter()
            .map(|row| (row[h].clone(), row[a].clone()))
            .unzip(),
        (Some(h), None) => table
            .rows
            .iter()
            .map(|row| match row[h].as_text().and_then(|s| s.split_once(separator)) {
                Some((hv, av)) => (Cell::from_raw(hv), Cell::from_raw(av)),
                None => (row[h].clone(), Cell::Empty),
            })
            .unzip(),
        _ => {
            debug!(column = %split.home_source, "No expected-goals columns");
            return;
        }
    };

    for source in [&split.home_source, &split.away_source] {
        if *source != split.home && *source != split.away {
            table.remove_column(source);
        }
    }
    table.set_column(&split.home, home);
    table.set_column(&split.away, away);
}

/// Map every text cell of `column` through the normalizer. False when the column is absent.
pub fn normalize_column(table: &mut Table, column: &str, normalizer: &TeamNameNormalizer) -> bool {
    let Some(idx) = table.column_index(column) else {
        return false;
    };
    for row in &mut table.rows {
        if let Cell::Text(name) = &mut row[idx] {
            *name = normalizer.normalize(name);
        }
    }
    true
}

fn to_int(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(v) => Some(*v),
        Cell::Float(f) => float_to_int(*f),
        Cell::Text(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().and_then(float_to_int)),
        Cell::Empty => None,
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}

fn to_float(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Int(v) => Some(*v as f64),
        Cell::Float(f) => Some(*f),
        Cell::Text(s) => s.parse::<f64>().ok().filter(|f| f.is_finite()),
        Cell::Empty => None,
    }
}

/// Convert integer and float target columns in place.
///
/// A row with any empty or unparsable target value is dropped; returns how many.
pub fn coerce_columns(table: &mut Table, int_columns: &[String], float_columns: &[String]) -> usize {
    let lookup = |columns: &[String], kind: &str| -> Vec<usize> {
        columns
            .iter()
            .filter_map(|c| {
                let idx = table.column_index(c);
                if idx.is_none() {
                    warn!(column = %c, kind, "Column not found for conversion");
                }
                idx
            })
            .collect()
    };
    let int_idx = lookup(int_columns, "int");
    let float_idx = lookup(float_columns, "float");

    let before = table.len();
    table.rows.retain_mut(|row| {
        for &i in &int_idx {
            match to_int(&row[i]) {
                Some(v) => row[i] = Cell::Int(v),
                None => return false,
            }
        }
        for &i in &float_idx {
            match to_float(&row[i]) {
                Some(v) => row[i] = Cell::Float(v),
                None => return false,
            }
        }
        true
    });
    before - table.len()
}

/// Project onto exactly `order`; absent columns are added empty.
pub fn reorder(table: Table, order: &[String]) -> Table {
    let indices: Vec<Option<usize>> = order.iter().map(|c| table.column_index(c)).collect();
    let missing: Vec<&String> = order
        .iter()
        .zip(&indices)
        .filter(|(_, idx)| idx.is_none())
        .map(|(c, _)| c)
        .collect();
    if !missing.is_empty() {
        warn!(columns = %missing.iter().join(", "), "Columns missing for reordering; adding empty");
    }

    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            indices
                .iter()
                .map(|idx| idx.map(|i| row[i].clone()).unwrap_or(Cell::Empty))
                .collect()
        })
        .collect();

    Table {
        headers: order.to_vec(),
        rows,
    }
}
