use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Failure of a single bounded search.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("rate limited, next available at {}", display_time(.retry_after))]
    RateLimited { retry_after: Option<NaiveTime> },

    #[error("unable to search: {query}, {msg}")]
    Fetch { query: String, msg: String },
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("unable to write archive: {path}, {error}")]
    Io {
        path: String,
        error: std::io::Error,
    },

    #[error("unable to encode archive: {path}, {error}")]
    Csv { path: String, error: csv::Error },

    #[error("unable to parse archive: {path}, {msg}")]
    Parse { path: String, msg: String },
}

fn display_time(time: &Option<NaiveTime>) -> String {
    match time {
        Some(t) => t.format("%H:%M:%S").to_string(),
        None => "unknown".to_owned(),
    }
}

/// Errors that end a search session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("search query is empty")]
    EmptyQuery,

    #[error("daily limit must be at least 1")]
    ZeroLimit,

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
