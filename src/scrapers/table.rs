//! Fixtures table extraction from an HTML document.
//!
//! Pages carry several tables (fixtures, squad lists, sidebars). The fixtures
//! table is the one whose header row names every configured keyword; when more
//! than one qualifies, the one with most data rows wins.

use crate::models::RawGrid;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static THEAD_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("thead > tr").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());

/// Extract the fixtures table from `html`.
///
/// Returns `None` when no table's header contains all of `keywords`.
pub fn extract_table(html: &str, keywords: &[String]) -> Option<RawGrid> {
    let document = Html::parse_document(html);

    let mut best: Option<RawGrid> = None;
    for (index, table) in document.select(&TABLE).enumerate() {
        let Some(grid) = parse_table(table) else {
            continue;
        };
        if !keywords.iter().all(|k| grid.headers.contains(k)) {
            debug!(index, headers = %grid.headers.iter().join("|"), "Skipping table without keywords");
            continue;
        }
        debug!(index, rows = grid.rows.len(), "Candidate fixtures table");
        if best.as_ref().is_none_or(|b| grid.rows.len() > b.rows.len()) {
            best = Some(grid);
        }
    }
    best
}

/// Rows that belong to `table` itself, not to a table nested inside it.
fn own_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    table
        .select(&ROW)
        .filter(|row| {
            row.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "table")
                .is_some_and(|el| el.id() == table.id())
        })
        .collect()
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.select(&CELL)
        .filter(|cell| {
            cell.parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|p| p.id() == row.id())
        })
        .map(|cell| cell.text().flat_map(str::split_whitespace).join(" "))
        .collect()
}

fn parse_table(table: ElementRef<'_>) -> Option<RawGrid> {
    let rows = own_rows(table);

    let header_row = table
        .select(&THEAD_ROW)
        .filter(|r| rows.iter().any(|own| own.id() == r.id()))
        .last()
        .or_else(|| rows.first().copied())?;

    let raw_headers = row_cells(header_row);
    if raw_headers.is_empty() {
        return None;
    }
    let width = raw_headers.len();
    let headers = dedupe_headers(&raw_headers);

    let data = rows
        .iter()
        .filter(|r| r.id() != header_row.id() && !in_thead(**r))
        .map(|r| row_cells(*r))
        .filter(|cells| !cells.is_empty())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .filter(|cells| *cells != raw_headers)
        .map(|mut cells| {
            cells.resize(width, String::new());
            cells
        })
        .collect();

    Some(RawGrid {
        headers,
        rows: data,
    })
}

fn in_thead(row: ElementRef<'_>) -> bool {
    row.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|p| p.value().name() == "thead")
}

/// Suffix repeated header names with `.1`, `.2`, ... in order of appearance.
///
/// A suffix already used by another header is skipped, so `xG, xG.1, xG`
/// becomes `xG, xG.1, xG.2`.
pub fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut out = Vec::with_capacity(headers.len());
    for (i, h) in headers.iter().enumerate() {
        let mut name = h.clone();
        let mut n = 1;
        while taken.contains(&name) || (name != *h && headers[i + 1..].contains(&name)) {
            name = format!("{h}.{n}");
            n += 1;
        }
        taken.insert(name.clone());
        out.push(name);
    }
    out
}
