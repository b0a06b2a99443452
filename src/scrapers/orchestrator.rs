//! Scrape orchestrator: resolve targets, fetch each one, persist raw grids.

use crate::config::{HistoricalConfig, LeagueUrl};
use crate::errors::ScrapeError;
use crate::http::PageSource;
use crate::models::ScrapeTarget;
use crate::outputs::csv::write_grid;
use crate::scrapers::fetcher::TableFetcher;
use crate::scrapers::leagues::{LeagueSelection, raw_filename, resolve_targets};
use crate::summary::BatchSummary;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, error, info, instrument};

/// What a successful target produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeOutcome {
    pub url: String,
    pub rows_fetched: usize,
    /// `None` in dry-run mode.
    pub saved_path: Option<PathBuf>,
}

pub type ScrapeSummary = BatchSummary<ScrapeOutcome, ScrapeError>;

pub struct ScrapeOrchestrator<S> {
    fetcher: TableFetcher<S>,
    leagues: BTreeMap<String, LeagueUrl>,
    historical: HistoricalConfig,
    raw_dir: PathBuf,
}

impl<S: PageSource> ScrapeOrchestrator<S> {
    pub fn new(
        fetcher: TableFetcher<S>,
        leagues: BTreeMap<String, LeagueUrl>,
        historical: HistoricalConfig,
        raw_dir: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            leagues,
            historical,
            raw_dir,
        }
    }

    /// Fetch every resolved target, one at a time.
    ///
    /// A failing target is recorded and the run moves on. Historical expansion
    /// is on when `historical` is set or the config enables it.
    ///
    /// # Arguments
    ///
    /// * `selection` - One registry league, every league, or an ad-hoc URL
    /// * `historical` - Also fetch the configured past seasons
    /// * `save` - Write each grid to the raw directory; `false` is a dry run
    ///
    /// # Returns
    ///
    /// One outcome per target, keyed by league key (`{key}-{year}-{year+1}` for
    /// past seasons). When two targets resolve to the same raw file, the later
    /// one fails with [`ScrapeError::Save`] instead of overwriting the first.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, selection: &LeagueSelection, historical: bool, save: bool) -> ScrapeSummary {
        let mut summary = ScrapeSummary::default();

        let expand = (historical || self.historical.enabled).then_some(&self.historical);
        let targets = match resolve_targets(selection, &self.leagues, expand) {
            Ok(targets) => targets,
            Err(e) => {
                let key = match selection {
                    LeagueSelection::One(key) => key.clone(),
                    LeagueSelection::All => "all".to_string(),
                    LeagueSelection::CustomUrl(url) => url.clone(),
                };
                error!(%key, kind = e.kind(), error = %e, "Could not resolve scrape targets");
                summary.record(key, Err(e));
                return summary;
            }
        };
        info!(count = targets.len(), historical = expand.is_some(), save, "Resolved scrape targets");

        let written = Mutex::new(HashSet::new());
        let written = &written;
        let results: Vec<(String, Result<ScrapeOutcome, ScrapeError>)> = stream::iter(targets)
            .then(|target| async move {
                let outcome = self.scrape_one(&target, save, written).await;
                (target.label(), outcome)
            })
            .collect()
            .await;

        for (label, outcome) in results {
            summary.record(label, outcome);
        }
        summary
    }

    #[instrument(level = "info", skip_all, fields(league = %target.label(), url = %target.url))]
    async fn scrape_one(
        &self,
        target: &ScrapeTarget,
        save: bool,
        written: &Mutex<HashSet<PathBuf>>,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let grid = match self.fetcher.fetch(&target.url).await {
            Ok(grid) => grid,
            Err(e) => {
                error!(kind = %e.kind, error = %e.cause, "Fetch failed");
                return Err(e.into());
            }
        };
        let rows_fetched = grid.rows.len();

        if !save {
            debug!(rows_fetched, "Dry run; not saving");
            return Ok(ScrapeOutcome {
                url: target.url.clone(),
                rows_fetched,
                saved_path: None,
            });
        }

        let path = self.raw_dir.join(raw_filename(target, &grid));
        let claimed = written
            .lock()
            .map(|mut paths| paths.insert(path.clone()))
            .unwrap_or(false);
        if !claimed {
            error!(path = %path.display(), "Raw file already written by another target in this run");
            return Err(ScrapeError::Save {
                path,
                cause: "already written by another target in this run".to_string(),
            });
        }

        write_grid(&path, &grid)
            .await
            .map_err(|e| ScrapeError::Save {
                path: path.clone(),
                cause: e.to_string(),
            })?;

        info!(rows_fetched, path = %path.display(), "Saved raw fixtures");
        Ok(ScrapeOutcome {
            url: target.url.clone(),
            rows_fetched,
            saved_path: Some(path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::errors::FetchErrorKind;
    use crate::http::testing::{RecordingSleeper, ScriptedSource};
    use crate::http::{Backoff, RetryPolicy, RetryingSource};
    use std::time::Duration;

    const PL: &str = "https://fbref.com/en/comps/9/schedule/Premier-League-Scores-and-Fixtures";
    const LL: &str = "https://fbref.com/en/comps/12/schedule/La-Liga-Scores-and-Fixtures";
    const SA: &str = "https://fbref.com/en/comps/11/schedule/Serie-A-Scores-and-Fixtures";

    fn page(home: &str) -> String {
        format!(
            r#"<table><thead><tr><th>Wk</th><th>Date</th><th>Home</th><th>Score</th><th>Away</th></tr></thead>
<tbody><tr><th>1</th><td>2024-08-16</td><td>{home}</td><td>1–0</td><td>Fulham</td></tr>
<tr><th>38</th><td>2025-05-25</td><td>Fulham</td><td>0–2</td><td>{home}</td></tr></tbody></table>"#
        )
    }

    fn leagues() -> BTreeMap<String, LeagueUrl> {
        [("premier_league", PL), ("la_liga", LL), ("serie_a", SA)]
            .into_iter()
            .map(|(k, u)| (k.to_string(), LeagueUrl::new(u)))
            .collect()
    }

    fn orchestrator<'a>(
        source: &'a ScriptedSource,
        sleeper: &'a RecordingSleeper,
        raw_dir: PathBuf,
    ) -> ScrapeOrchestrator<RetryingSource<&'a ScriptedSource, &'a RecordingSleeper>> {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_millis(10)), Duration::ZERO);
        let fetcher = TableFetcher::new(
            RetryingSource::new(source, policy, sleeper),
            Config::default().table.header_keywords,
        );
        ScrapeOrchestrator::new(fetcher, leagues(), Default::default(), raw_dir)
    }

    #[tokio::test]
    async fn test_server_errors_do_not_abort_other_leagues() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new()
            .respond(PL, vec![Ok(page("Arsenal"))])
            .respond(LL, vec![Err(FetchErrorKind::Network)])
            .respond(SA, vec![Ok(page("Inter"))]);
        let sleeper = RecordingSleeper::default();
        let orch = orchestrator(&source, &sleeper, dir.path().to_path_buf());

        let summary = orch.run(&LeagueSelection::All, false, true).await;

        assert_eq!(summary.attempted(), 3);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(source.calls_to(LL), 3);
        match summary.get("la_liga").unwrap() {
            Err(ScrapeError::Fetch(e)) => assert_eq!(e.kind, FetchErrorKind::Network),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let pl = summary.get("premier_league").unwrap().as_ref().unwrap();
        assert_eq!(pl.rows_fetched, 2);
        let saved = pl.saved_path.as_ref().unwrap();
        assert_eq!(saved, &dir.path().join("premier_league-2024-2025.csv"));
        let raw = std::fs::read_to_string(saved).unwrap();
        assert!(raw.starts_with("Wk,Date,Home,Score,Away\n1,2024-08-16,Arsenal,1–0,Fulham\n"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let raw_dir = dir.path().join("raw");
        let source = ScriptedSource::new().respond(PL, vec![Ok(page("Arsenal"))]);
        let sleeper = RecordingSleeper::default();
        let orch = orchestrator(&source, &sleeper, raw_dir.clone());

        let summary = orch
            .run(&LeagueSelection::One("premier_league".into()), false, false)
            .await;

        let outcome = summary.get("premier_league").unwrap().as_ref().unwrap();
        assert_eq!(outcome.saved_path, None);
        assert_eq!(outcome.rows_fetched, 2);
        assert!(!raw_dir.exists());
    }

    #[tokio::test]
    async fn test_historical_and_custom_url() {
        let dir = tempfile::tempdir().unwrap();
        let past = "https://fbref.com/en/comps/9/2022-2023/schedule/2022-2023-Premier-League-Scores-and-Fixtures";
        let source = ScriptedSource::new()
            .respond(PL, vec![Ok(page("Arsenal"))])
            .respond(past, vec![Ok(page("Chelsea"))]);
        let sleeper = RecordingSleeper::default();
        let mut orch = orchestrator(&source, &sleeper, dir.path().to_path_buf());
        orch.historical.years = vec![2022];

        let summary = orch
            .run(&LeagueSelection::One("premier_league".into()), true, true)
            .await;
        assert_eq!(summary.succeeded(), 2);
        assert!(dir.path().join("premier_league-2022-2023.csv").exists());

        let summary = orch
            .run(&LeagueSelection::CustomUrl(PL.into()), false, false)
            .await;
        assert!(summary.get("Premier-League").unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_past_season_matching_current_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let same_season = "https://fbref.com/en/comps/9/2024-2025/schedule/2024-2025-Premier-League-Scores-and-Fixtures";
        let source = ScriptedSource::new()
            .respond(PL, vec![Ok(page("Arsenal"))])
            .respond(same_season, vec![Ok(page("Chelsea"))]);
        let sleeper = RecordingSleeper::default();
        let mut orch = orchestrator(&source, &sleeper, dir.path().to_path_buf());
        orch.historical.years = vec![2024];

        let summary = orch
            .run(&LeagueSelection::One("premier_league".into()), true, true)
            .await;

        assert_eq!(summary.attempted(), 2);
        assert_eq!(summary.succeeded(), 1);
        let saved = dir.path().join("premier_league-2024-2025.csv");
        match summary.get("premier_league-2024-2025").unwrap() {
            Err(ScrapeError::Save { path, .. }) => assert_eq!(path, &saved),
            other => panic!("unexpected outcome: {other:?}"),
        }
        let raw = std::fs::read_to_string(&saved).unwrap();
        assert!(raw.contains("Arsenal"));
        assert!(!raw.contains("Chelsea"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_league_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new();
        let sleeper = RecordingSleeper::default();
        let orch = orchestrator(&source, &sleeper, dir.path().to_path_buf());

        let summary = orch.run(&LeagueSelection::One("mls".into()), false, true).await;
        assert_eq!(summary.failed(), 1);
        assert!(matches!(summary.get("mls"), Some(Err(ScrapeError::UnknownLeague(_)))));
    }
}
