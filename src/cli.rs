//! Command-line interface definitions.
//!
//! Two subcommands map onto the two orchestrators: `scrape` fetches raw
//! fixtures tables, `process` cleans raw CSV files.

use crate::processing::orchestrator::FileSelection;
use crate::scrapers::leagues::LeagueSelection;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Scrape and normalize football fixtures history.
///
/// # Examples
///
/// ```sh
/// # Current Premier League season
/// football_history scrape --league premier_league
///
/// # Every configured league, past seasons included, without writing files
/// football_history scrape --all --historical --no-save
///
/// # Clean every raw CSV
/// football_history -v process --all
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Debug-level logging and per-file step counts
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch fixtures tables into the raw directory
    Scrape(ScrapeArgs),
    /// Clean raw CSV files into the processed directory
    Process(ProcessArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["league", "all", "url"])))]
pub struct ScrapeArgs {
    /// League key from the configured registry
    #[arg(short, long)]
    pub league: Option<String>,

    /// Every configured league
    #[arg(short, long)]
    pub all: bool,

    /// A fixtures page URL outside the registry
    #[arg(short, long)]
    pub url: Option<String>,

    /// Also fetch the configured past seasons
    #[arg(long)]
    pub historical: bool,

    /// Fetch and parse only; write nothing
    #[arg(long)]
    pub no_save: bool,
}

impl ScrapeArgs {
    pub fn selection(&self) -> LeagueSelection {
        match (&self.league, &self.url) {
            (Some(key), _) => LeagueSelection::One(key.clone()),
            (None, Some(url)) => LeagueSelection::CustomUrl(url.clone()),
            (None, None) => LeagueSelection::All,
        }
    }
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").args(["csv", "all"])))]
pub struct ProcessArgs {
    /// One raw CSV file; looked up in the raw directory when the path does not exist
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Every raw file matching the configured pattern
    #[arg(short, long)]
    pub all: bool,
}

impl ProcessArgs {
    /// The explicit flags win; otherwise `process_all` picks between the batch
    /// and `default_csv`.
    pub fn selection(&self, process_all: bool, default_csv: &Path) -> FileSelection {
        match (&self.csv, self.all) {
            (Some(path), _) => FileSelection::SingleFile(path.clone()),
            (None, true) => FileSelection::AllFiles,
            (None, false) if process_all => FileSelection::AllFiles,
            (None, false) => FileSelection::SingleFile(default_csv.to_path_buf()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrape(args: &[&str]) -> ScrapeArgs {
        let argv = ["football_history", "scrape"].iter().chain(args);
        match Cli::parse_from(argv).command {
            Command::Scrape(args) => args,
            other => panic!("expected scrape, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_scrape_league() {
        let args = scrape(&["--league", "premier_league"]);
        assert_eq!(args.selection(), LeagueSelection::One("premier_league".into()));
        assert!(!args.historical);
        assert!(!args.no_save);
    }

    #[test]
    fn test_cli_scrape_all_historical_dry_run() {
        let args = scrape(&["--all", "--historical", "--no-save"]);
        assert_eq!(args.selection(), LeagueSelection::All);
        assert!(args.historical);
        assert!(args.no_save);
    }

    #[test]
    fn test_cli_scrape_custom_url() {
        let args = scrape(&["-u", "https://example.com/fixtures"]);
        assert_eq!(
            args.selection(),
            LeagueSelection::CustomUrl("https://example.com/fixtures".into())
        );
    }

    #[test]
    fn test_cli_scrape_targets_are_exclusive_and_required() {
        assert!(Cli::try_parse_from(["football_history", "scrape"]).is_err());
        assert!(
            Cli::try_parse_from(["football_history", "scrape", "--all", "--league", "la_liga"])
                .is_err()
        );
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "football_history",
            "process",
            "--all",
            "-v",
            "--config",
            "/tmp/leagues.yaml",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("/tmp/leagues.yaml"));

        let cli = Cli::parse_from(["football_history", "process"]);
        assert!(!cli.verbose);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
    }

    #[test]
    fn test_cli_process_selection() {
        let Command::Process(args) =
            Cli::parse_from(["football_history", "process", "--csv", "a.csv"]).command
        else {
            panic!("expected process");
        };
        assert_eq!(
            args.selection(true, Path::new("default.csv")),
            FileSelection::SingleFile("a.csv".into())
        );

        let Command::Process(args) = Cli::parse_from(["football_history", "process"]).command
        else {
            panic!("expected process");
        };
        assert_eq!(args.selection(true, Path::new("default.csv")), FileSelection::AllFiles);
        assert_eq!(
            args.selection(false, Path::new("default.csv")),
            FileSelection::SingleFile("default.csv".into())
        );

        assert!(Cli::try_parse_from(["football_history", "process", "--all", "--csv", "a.csv"]).is_err());
    }
}
