use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueHint};
use xsearch::{ArchiveStats, SearchSession};

use crate::config::Config;
use crate::progress::DayProgress;

/// Daily limits above this tend to exhaust the account pool quickly.
pub const RECOMMENDED_LIMIT: usize = 500;

/// Collect posts matching a query over a date range, one day at a time
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Config file location
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search each day of a date range and append the results to <ARCHIVE>.csv
    Search {
        /// Search query, without date operators
        query: String,

        /// Archive name, the output file is <ARCHIVE>.csv in the configured output directory
        #[arg(short, long)]
        archive: String,

        /// First day to search (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        since: NaiveDate,

        /// Last day to search, inclusive (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        until: NaiveDate,

        /// Maximum posts fetched per day
        #[arg(short, long, default_value_t = 50, value_parser = parse_limit)]
        limit: usize,

        /// Don't ask for confirmation when the daily limit is above the recommended maximum
        #[arg(short, long)]
        yes: bool,
    },

    /// Print statistics about an archive
    Inspect {
        /// CSV file written by the search command
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show the status of the search tool's accounts
    Accounts,
}

impl Args {
    pub async fn run(self) -> Result<()> {
        let conf = Config::load(self.config.as_deref())?;

        match self.command {
            Commands::Search {
                query,
                archive,
                since,
                until,
                limit,
                yes,
            } => {
                if limit > RECOMMENDED_LIMIT && !yes {
                    let prompt = format!(
                        "{limit} is more than the recommended {RECOMMENDED_LIMIT} per day due to rate limits, continue? (y/N): "
                    );
                    if !confirm(&prompt, std::io::stdin().lock(), std::io::stderr())? {
                        return Err(anyhow!("aborted"));
                    }
                }

                let output = conf.search.archive_path(&archive);
                let mut session = SearchSession::new(query, since, until, limit, output)?
                    .day_delay(conf.search.day_delay())
                    .backoff(conf.search.backoff());
                let provider = conf.provider();

                let summary = session
                    .run::<DayProgress, _>(&provider, ctrl_c())
                    .await?;

                if summary.interrupted {
                    eprintln!("stopped by user after {} days", summary.days_processed);
                }
                eprintln!(
                    "{} posts from {}/{} days saved to {}",
                    summary.total_collected,
                    summary.days_processed,
                    summary.total_days,
                    summary.output.display()
                );
            }
            Commands::Inspect { file } => {
                let stats = ArchiveStats::from_path(&file)?;
                print!("{stats}");
            }
            Commands::Accounts => {
                let status = conf.provider().accounts().await?;
                if !status.success() {
                    return Err(anyhow!("{} exited with {}", conf.twscrape.program, status));
                }
            }
        }

        Ok(())
    }
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a handler the session can only end on its own
        std::future::pending::<()>().await;
    }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| "use format: YYYY-MM-DD".to_owned())
}

pub fn parse_limit(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_owned()),
        Ok(n) => Ok(n),
        Err(_) => Err("enter a number".to_owned()),
    }
}

/// Ask a yes/no question, defaulting to no.
pub fn confirm(prompt: &str, mut input: impl BufRead, mut output: impl Write) -> Result<bool> {
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
