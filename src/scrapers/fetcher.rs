//! HTML table fetcher: download a page and pull out its fixtures table.

use crate::errors::FetchError;
use crate::http::PageSource;
use crate::models::RawGrid;
use crate::scrapers::table::extract_table;
use tracing::{info, instrument};

/// Fetches a URL through a [`PageSource`] and extracts the fixtures table.
///
/// Retrying belongs to the source (see [`RetryingSource`](crate::http::RetryingSource));
/// a missing table is reported as `PARSE` and never retried.
#[derive(Debug)]
pub struct TableFetcher<S> {
    source: S,
    header_keywords: Vec<String>,
}

impl<S: PageSource> TableFetcher<S> {
    pub fn new(source: S, header_keywords: Vec<String>) -> Self {
        Self {
            source,
            header_keywords,
        }
    }

    /// Download `url` and extract its fixtures table.
    ///
    /// # Arguments
    ///
    /// * `url` - Fixtures page to fetch
    ///
    /// # Returns
    ///
    /// The header row and data rows as strings, in page order.
    ///
    /// # Errors
    ///
    /// - `NETWORK` / `NOT_FOUND` from the source, after its retries
    /// - `PARSE` when no table carries every header keyword
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<RawGrid, FetchError> {
        let html = self.source.get(url).await?;

        let grid = extract_table(&html, &self.header_keywords).ok_or_else(|| {
            FetchError::parse(
                url,
                format!(
                    "no table with header keywords [{}]",
                    self.header_keywords.join(", ")
                ),
            )
        })?;

        info!(
            rows = grid.rows.len(),
            columns = grid.headers.len(),
            "Parsed fixtures table"
        );
        Ok(grid)
    }
}
