use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::window::next_day;
use crate::{
    ArchiveError, BackoffPolicy, CsvArchive, ProgressBar, Record, SearchError, SearchProvider,
    SearchWindow, SessionError,
};

/// Progress of a session through its date range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchState {
    /// Next day to search.
    pub current_day: NaiveDate,
    /// Days completed so far.
    pub day_index: usize,
    pub total_days: usize,
    pub total_collected: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchSummary {
    pub output: PathBuf,
    pub days_processed: usize,
    pub total_days: usize,
    pub total_collected: usize,
    pub interrupted: bool,
}

/// Searches a closed date range one day at a time, appending matches to a CSV archive.
///
/// A rate limited day is retried after a backoff wait. Any other search failure, or a failure to
/// write the day's rows, skips the day. Only failing to create the output directory is fatal.
/// Nothing records which days are done, so running the same range twice duplicates rows.
#[derive(Debug)]
pub struct SearchSession {
    query: String,
    end: NaiveDate,
    daily_limit: usize,
    day_delay: Duration,
    backoff: BackoffPolicy,
    archive: CsvArchive,
    state: SearchState,
}

impl SearchSession {
    pub fn new(
        query: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        daily_limit: usize,
        output: impl Into<PathBuf>,
    ) -> Result<Self, SessionError> {
        let query = query.into().trim().to_owned();
        if query.is_empty() {
            return Err(SessionError::EmptyQuery);
        }
        if daily_limit == 0 {
            return Err(SessionError::ZeroLimit);
        }
        if start > end {
            return Err(SessionError::InvalidRange { start, end });
        }

        let total_days = (end - start).num_days() as usize + 1;
        Ok(Self {
            query,
            end,
            daily_limit,
            day_delay: Duration::from_millis(1500),
            backoff: BackoffPolicy::default(),
            archive: CsvArchive::new(output),
            state: SearchState {
                current_day: start,
                day_index: 0,
                total_days,
                total_collected: 0,
            },
        })
    }

    /// Pause between consecutive days.
    pub fn day_delay(mut self, delay: Duration) -> Self {
        self.day_delay = delay;
        self
    }

    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.backoff = policy;
        self
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Run until the range is exhausted or `stop` resolves.
    ///
    /// Rows already written stay in the archive when stopped early.
    pub async fn run<PB: ProgressBar, P: SearchProvider + ?Sized>(
        &mut self,
        provider: &P,
        stop: impl Future<Output = ()>,
    ) -> Result<SearchSummary, SessionError> {
        self.prepare_output()?;
        tokio::pin!(stop);

        tracing::info!(
            query = %self.query,
            days = self.state.total_days,
            output = %self.archive.path().display(),
            "searching"
        );
        let pb = PB::init(self.state.total_days, &self.query);
        let mut interrupted = false;

        while self.state.current_day <= self.end {
            let window = SearchWindow::new(&self.query, self.state.current_day, self.daily_limit);

            let result = tokio::select! {
                _ = &mut stop => {
                    interrupted = true;
                    break;
                }
                r = provider.search(&window.query, window.limit) => r,
            };

            match result {
                Ok(items) => {
                    let records: Vec<Record> = items
                        .iter()
                        .filter(|i| window.contains(i.date.date_naive()))
                        .map(Record::from)
                        .collect();
                    match self.archive.append(&records) {
                        Ok(written) => {
                            self.state.total_collected += written;

                            tracing::debug!(day = %window.day, returned = items.len(), written, "day complete");
                            pb.message(&format!(
                                "{}: {} (total: {})",
                                window.day, written, self.state.total_collected
                            ));
                        }
                        Err(e) => {
                            tracing::warn!(day = %window.day, error = %e, "unable to save day, skipping");
                            pb.message(&format!("{}: not saved", window.day));
                        }
                    }
                }
                Err(SearchError::RateLimited { retry_after }) => {
                    let wait = self.backoff.wait_for(retry_after, Local::now().naive_local());
                    tracing::info!(day = %window.day, wait_secs = wait.as_secs(), "rate limited, waiting");
                    pb.message(&format!(
                        "{}: rate limited, waiting {} minutes",
                        window.day,
                        wait.as_secs() / 60
                    ));

                    tokio::select! {
                        _ = &mut stop => {
                            interrupted = true;
                            break;
                        }
                        _ = tokio::time::sleep(wait) => {}
                    }
                    continue;
                }
                Err(e) => {
                    tracing::warn!(day = %window.day, error = %e, "skipping day");
                    pb.message(&format!("{}: skipped", window.day));
                }
            }

            self.state.day_index += 1;
            self.state.current_day = next_day(window.day);
            pb.increment();
            if window.day >= self.end {
                break;
            }

            tokio::select! {
                _ = &mut stop => {
                    interrupted = true;
                    break;
                }
                _ = tokio::time::sleep(self.day_delay) => {}
            }
        }

        pb.destroy();

        let summary = SearchSummary {
            output: self.archive.path().to_owned(),
            days_processed: self.state.day_index,
            total_days: self.state.total_days,
            total_collected: self.state.total_collected,
            interrupted,
        };
        if interrupted {
            tracing::info!(
                days = summary.days_processed,
                collected = summary.total_collected,
                "stopped by user"
            );
        } else {
            tracing::info!(collected = summary.total_collected, "search complete");
        }

        Ok(summary)
    }

    fn prepare_output(&self) -> Result<(), ArchiveError> {
        match self.archive.path().parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir).map_err(|error| ArchiveError::Io {
                    path: dir.display().to_string(),
                    error,
                })
            }
            _ => Ok(()),
        }
    }
}
