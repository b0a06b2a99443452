//! Comma-separated writers.
//!
//! Files are rendered in memory, then written in one call, so a failed
//! render never leaves a half-written file behind.

use crate::models::{RawGrid, Table};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

fn finish(writer: ::csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ::csv::Error> {
    writer
        .into_inner()
        .map_err(|e| ::csv::Error::from(e.into_error()))
}

/// Render a raw grid verbatim, header row first.
pub fn render_grid(grid: &RawGrid) -> Result<Vec<u8>, ::csv::Error> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(&grid.headers)?;
    for row in &grid.rows {
        writer.write_record(row)?;
    }
    finish(writer)
}

/// Render a typed table; see [`Cell::render`](crate::models::Cell::render).
pub fn render_table(table: &Table) -> Result<Vec<u8>, ::csv::Error> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|c| c.render()))?;
    }
    finish(writer)
}

async fn write_bytes(path: &Path, bytes: Vec<u8>) -> Result<(), ::csv::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, bytes).await?;
    Ok(())
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_grid(path: &Path, grid: &RawGrid) -> Result<(), ::csv::Error> {
    write_bytes(path, render_grid(grid)?).await?;
    info!(rows = grid.rows.len(), "Wrote raw CSV");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_table(path: &Path, table: &Table) -> Result<(), ::csv::Error> {
    write_bytes(path, render_table(table)?).await?;
    info!(rows = table.rows.len(), "Wrote processed CSV");
    Ok(())
}
