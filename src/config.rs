//! YAML configuration for both pipelines.
//!
//! A single file describes the league URL registry, historical expansion,
//! HTTP/retry behaviour, the column spec and team-name corrections, and the
//! raw/processed directories. Every section has defaults, so a partial file
//! (or no file at all) is valid.
//!
//! ```yaml
//! leagues:
//!   premier_league: https://fbref.com/en/comps/9/schedule/Premier-League-Scores-and-Fixtures
//!   eredivisie:
//!     url: https://fbref.com/en/comps/23/schedule/Eredivisie-Scores-and-Fixtures
//!     history_template: https://fbref.com/en/comps/23/{year}-{year_plus_one}/schedule/{year}-{year_plus_one}-Eredivisie-Scores-and-Fixtures
//! historical:
//!   enabled: false
//!   years: [2022, 2023]
//! http:
//!   retry:
//!     max_attempts: 3
//!     backoff: exponential
//! ```

use crate::errors::ConfigError;
use crate::processing::columns::ColumnSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// League key -> URL registry.
    pub leagues: BTreeMap<String, LeagueUrl>,
    pub historical: HistoricalConfig,
    pub http: HttpConfig,
    pub table: TableConfig,
    pub columns: ColumnSpec,
    /// Raw alias -> canonical team name.
    pub team_name_corrections: BTreeMap<String, String>,
    pub paths: PathsConfig,
    pub files: FilesConfig,
}

/// A registry entry. Accepts either a bare URL string or `{ url, history_template }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "LeagueUrlRepr")]
pub struct LeagueUrl {
    pub url: String,
    /// Per-league override of [`HistoricalConfig::url_template`].
    pub history_template: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LeagueUrlRepr {
    Url(String),
    Full {
        url: String,
        #[serde(default)]
        history_template: Option<String>,
    },
}

impl From<LeagueUrlRepr> for LeagueUrl {
    fn from(repr: LeagueUrlRepr) -> Self {
        match repr {
            LeagueUrlRepr::Url(url) => LeagueUrl {
                url,
                history_template: None,
            },
            LeagueUrlRepr::Full {
                url,
                history_template,
            } => LeagueUrl {
                url,
                history_template,
            },
        }
    }
}

impl LeagueUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            history_template: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoricalConfig {
    pub enabled: bool,
    /// Starting years of the past seasons to fetch (2022 means 2022-2023).
    pub years: Vec<i32>,
    /// Template with `{year}`, `{year_plus_one}`, `{comp_id}` and `{slug}` placeholders.
    pub url_template: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: format!("football_history/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub backoff: BackoffKind,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffKind::Exponential,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TableConfig {
    /// Header cells the fixtures table must contain.
    pub header_keywords: Vec<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            header_keywords: ["Date", "Home", "Away", "Score"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilesConfig {
    /// File processed when `process` is run without `--csv` or `--all`.
    pub default_csv: PathBuf,
    pub process_all: bool,
    /// Wildcard (`*`, `?`, `[...]`, `[!...]`) matched against file names in `raw_dir`.
    pub file_pattern: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            default_csv: PathBuf::from("Premier-League-2024-2025.csv"),
            process_all: false,
            file_pattern: "*.csv".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let leagues = [
            ("premier_league", "9", "Premier-League"),
            ("la_liga", "12", "La-Liga"),
            ("serie_a", "11", "Serie-A"),
            ("bundesliga", "20", "Bundesliga"),
            ("ligue_1", "13", "Ligue-1"),
        ]
        .into_iter()
        .map(|(key, id, name)| {
            (
                key.to_string(),
                LeagueUrl::new(format!(
                    "https://fbref.com/en/comps/{id}/schedule/{name}-Scores-and-Fixtures"
                )),
            )
        })
        .collect();

        let team_name_corrections = [
            ("Manchester Utd", "Manchester United"),
            ("Newcastle Utd", "Newcastle United"),
            ("Sheffield Utd", "Sheffield United"),
            ("Nott'ham Forest", "Nottingham Forest"),
            ("Wolves", "Wolverhampton Wanderers"),
            ("Brighton", "Brighton & Hove Albion"),
            ("Tottenham", "Tottenham Hotspur"),
            ("Tottenham Spurs", "Tottenham Hotspur"),
            ("Spurs", "Tottenham Hotspur"),
            ("West Ham", "West Ham United"),
            ("Man City", "Manchester City"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            leagues,
            historical: HistoricalConfig::default(),
            http: HttpConfig::default(),
            table: TableConfig::default(),
            columns: ColumnSpec::default(),
            team_name_corrections,
            paths: PathsConfig::default(),
            files: FilesConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate the config at `path`.
    ///
    /// A missing file yields [`Config::default`]; an unreadable or invalid one is an error.
    #[instrument(level = "info", fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Config, ConfigError> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            warn!("Configuration file not found; using built-in defaults");
            return Ok(Config::default());
        }

        let text = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Config::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(leagues = config.leagues.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Config, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "http.retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.columns.cols_order.is_empty() {
            return Err(ConfigError::Invalid("columns.cols_order is empty".into()));
        }
        if self.columns.score.separator.is_empty() {
            return Err(ConfigError::Invalid(
                "columns.score.separator is empty".into(),
            ));
        }
        if let Some(col) = self
            .columns
            .required_columns
            .iter()
            .find(|c| self.columns.columns_to_drop.contains(c))
        {
            return Err(ConfigError::Invalid(format!(
                "column '{col}' is both required and dropped"
            )));
        }
        Ok(())
    }
}
