//! League registry resolution, historical URL expansion and raw file naming.
//!
//! # URL Pattern
//!
//! Current season: `https://fbref.com/en/comps/9/schedule/Premier-League-Scores-and-Fixtures`
//!
//! Past season: `https://fbref.com/en/comps/9/2023-2024/schedule/2023-2024-Premier-League-Scores-and-Fixtures`

use crate::config::{HistoricalConfig, LeagueUrl};
use crate::errors::ScrapeError;
use crate::models::{RawGrid, ScrapeTarget};
use std::collections::BTreeMap;
use tracing::warn;
use url::Url;

pub const DEFAULT_HISTORY_TEMPLATE: &str =
    "https://fbref.com/en/comps/{comp_id}/{year}-{year_plus_one}/schedule/{year}-{year_plus_one}-{slug}";

const LEAGUE_NAME_NOISE: [&str; 3] = ["Scores", "and", "Fixtures"];

/// Which leagues a scrape run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeagueSelection {
    One(String),
    All,
    /// Ad-hoc URL, bypassing the registry.
    CustomUrl(String),
}

/// Turn a selection into the list of URLs to fetch, in a stable order.
///
/// With `historical`, every league also yields one target per configured year.
pub fn resolve_targets(
    selection: &LeagueSelection,
    leagues: &BTreeMap<String, LeagueUrl>,
    historical: Option<&HistoricalConfig>,
) -> Result<Vec<ScrapeTarget>, ScrapeError> {
    let selected: Vec<(String, LeagueUrl)> = match selection {
        LeagueSelection::One(key) => {
            let entry = leagues
                .get(key)
                .ok_or_else(|| ScrapeError::UnknownLeague(key.clone()))?;
            vec![(key.clone(), entry.clone())]
        }
        LeagueSelection::All => leagues
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        LeagueSelection::CustomUrl(url) => vec![(league_name_from_url(url), LeagueUrl::new(url))],
    };

    let mut targets = Vec::new();
    for (league, entry) in selected {
        targets.push(ScrapeTarget {
            league: league.clone(),
            season: None,
            url: entry.url.clone(),
        });

        let Some(historical) = historical else {
            continue;
        };
        for &year in &historical.years {
            match historical_url(&entry, historical.url_template.as_deref(), year) {
                Some(url) => targets.push(ScrapeTarget {
                    league: league.clone(),
                    season: Some(year),
                    url,
                }),
                None => warn!(%league, year, url = %entry.url, "Cannot build historical URL; skipping season"),
            }
        }
    }
    Ok(targets)
}

/// Fill a history template for `year`.
///
/// The league's own template wins over `global_template`, which wins over
/// [`DEFAULT_HISTORY_TEMPLATE`]. `None` when the template needs `{comp_id}` or
/// `{slug}` and the league URL does not have the `/comps/<id>/schedule/<slug>` shape.
pub fn historical_url(entry: &LeagueUrl, global_template: Option<&str>, year: i32) -> Option<String> {
    let template = entry
        .history_template
        .as_deref()
        .or(global_template)
        .unwrap_or(DEFAULT_HISTORY_TEMPLATE);

    let mut url = template
        .replace("{year}", &year.to_string())
        .replace("{year_plus_one}", &(year + 1).to_string());

    if url.contains("{comp_id}") || url.contains("{slug}") {
        let (comp_id, slug) = comp_parts(&entry.url)?;
        url = url.replace("{comp_id}", &comp_id).replace("{slug}", &slug);
    }
    Some(url)
}

/// `("9", "Premier-League-Scores-and-Fixtures")` from an FBref schedule URL.
fn comp_parts(url: &str) -> Option<(String, String)> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();

    let comp_id = segments
        .iter()
        .position(|s| *s == "comps")
        .and_then(|i| segments.get(i + 1))?;
    let slug = segments
        .iter()
        .position(|s| *s == "schedule")
        .and_then(|i| segments.get(i + 1))?;

    Some((comp_id.to_string(), strip_season_prefix(slug).to_string()))
}

/// `2023-2024-Premier-League-...` -> `Premier-League-...`
fn strip_season_prefix(name: &str) -> &str {
    let mut parts = name.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(rest))
            if !a.is_empty()
                && !b.is_empty()
                && a.chars().all(|c| c.is_ascii_digit())
                && b.chars().all(|c| c.is_ascii_digit()) =>
        {
            rest
        }
        _ => name,
    }
}

/// League name for an ad-hoc URL, e.g. `Premier-League`.
///
/// Uses the path segment after `schedule` (or the last one), minus any season
/// prefix and the words `Scores`, `and`, `Fixtures`. Falls back to `unknown-league`.
pub fn league_name_from_url(url: &str) -> String {
    let segments: Vec<String> = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).map(String::from).collect())
            .unwrap_or_default(),
        Err(_) => url.split('/').filter(|s| !s.is_empty()).map(String::from).collect(),
    };

    let candidate = segments
        .iter()
        .position(|s| s == "schedule")
        .and_then(|i| segments.get(i + 1))
        .or_else(|| segments.last());

    let name = candidate
        .map(|s| {
            strip_season_prefix(s)
                .split('-')
                .filter(|w| !w.is_empty() && !LEAGUE_NAME_NOISE.contains(w))
                .collect::<Vec<_>>()
                .join("-")
        })
        .unwrap_or_default();

    if name.is_empty() {
        "unknown-league".to_string()
    } else {
        name
    }
}

/// Deterministic raw file name: `{league}-{season}.csv`.
///
/// The season comes from the target year when historical, otherwise from the
/// span of the `Date` column; without either the name is `{league}.csv`.
pub fn raw_filename(target: &ScrapeTarget, grid: &RawGrid) -> String {
    let season = match target.season {
        Some(year) => Some((year, year + 1)),
        None => grid.year_span("Date"),
    };
    match season {
        Some((start, end)) => format!("{}-{}-{}.csv", target.league, start, end),
        None => format!("{}.csv", target.league),
    }
}
