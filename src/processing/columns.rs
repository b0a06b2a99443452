//! Declarative column specification for the cleaner.

use serde::{Deserialize, Serialize};

/// Which columns are mandatory, dropped, split, coerced, and in what order
/// they are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnSpec {
    /// Rows with an empty value in any of these columns are dropped.
    pub rows_to_drop: Vec<String>,
    pub columns_to_drop: Vec<String>,
    pub required_columns: Vec<String>,
    pub cols_to_convert_int: Vec<String>,
    pub cols_to_convert_float: Vec<String>,
    /// Exact header of the processed file.
    pub cols_order: Vec<String>,
    /// Columns passed through the team-name normalizer.
    pub team_columns: Vec<String>,
    pub score: ScoreSplit,
    pub xg: XgSplit,
}

/// How the combined score cell (`2–1`) is split.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoreSplit {
    pub column: String,
    /// Literal separator between the two goal counts. Defaults to the en dash (U+2013).
    pub separator: String,
    pub home: String,
    pub away: String,
}

impl Default for ScoreSplit {
    fn default() -> Self {
        Self {
            column: "Score".into(),
            separator: "\u{2013}".into(),
            home: "Score_Home".into(),
            away: "Score_Away".into(),
        }
    }
}

/// Where expected goals come from and where they go.
///
/// Pages usually carry two `xG` columns, which the extractor names `xG` and
/// `xG.1`. A single combined `xG` cell is split on the score separator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct XgSplit {
    pub home_source: String,
    pub away_source: String,
    pub home: String,
    pub away: String,
}

impl Default for XgSplit {
    fn default() -> Self {
        Self {
            home_source: "xG".into(),
            away_source: "xG.1".into(),
            home: "xG_Home".into(),
            away: "xG_Away".into(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            rows_to_drop: strings(&["Date", "Home", "Away", "Venue"]),
            columns_to_drop: strings(&[
                "Day",
                "Match Report",
                "Notes",
                "Venue",
                "Attendance",
                "Referee",
            ]),
            required_columns: strings(&["Score", "Wk"]),
            cols_to_convert_int: strings(&["Wk", "Score_Home", "Score_Away"]),
            cols_to_convert_float: strings(&["xG_Home", "xG_Away"]),
            cols_order: strings(&[
                "Wk",
                "Date",
                "Time",
                "Home",
                "xG_Home",
                "Score_Home",
                "Score_Away",
                "xG_Away",
                "Away",
            ]),
            team_columns: strings(&["Home", "Away"]),
            score: ScoreSplit::default(),
            xg: XgSplit::default(),
        }
    }
}
