use std::time::Duration;

use chrono::{Days, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

static NEXT_AVAILABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Next available at (\d{2}):(\d{2}):(\d{2})").unwrap());
static RATE_LIMIT_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"rate limit|No account available")
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// Extract the wall clock time from a "Next available at HH:MM:SS" message.
pub fn parse_next_available(text: &str) -> Option<NaiveTime> {
    let caps = NEXT_AVAILABLE_RE.captures(text)?;
    let field = |i: usize| -> Option<u32> { caps.get(i)?.as_str().parse().ok() };
    NaiveTime::from_hms_opt(field(1)?, field(2)?, field(3)?)
}

/// Whether an error message from the search tool signals an exhausted account pool.
pub fn is_rate_limit_message(text: &str) -> bool {
    RATE_LIMIT_RE.is_match(text)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Lower bound on any computed wait.
    pub min_wait: Duration,
    /// Wait used when the error carries no retry time.
    pub default_wait: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min_wait: Duration::from_secs(60),
            default_wait: Duration::from_secs(300),
        }
    }
}

impl BackoffPolicy {
    /// How long to wait before retrying, given the time the pool frees up.
    ///
    /// `retry_after` is read as a time of day on `now`'s date, or the next date if that moment
    /// is not in the future.
    pub fn wait_for(&self, retry_after: Option<NaiveTime>, now: NaiveDateTime) -> Duration {
        let Some(time) = retry_after else {
            return self.default_wait;
        };

        let mut target = now.date().and_time(time);
        if target <= now {
            target = target
                .checked_add_days(Days::new(1))
                .unwrap_or(NaiveDateTime::MAX);
        }

        let wait = (target - now).to_std().unwrap_or(Duration::ZERO);
        wait.max(self.min_wait)
    }
}
