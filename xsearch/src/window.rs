use chrono::{Days, NaiveDate};

/// One day's worth of search: the user query bounded to `[day, day + 1)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchWindow {
    pub day: NaiveDate,
    pub query: String,
    pub limit: usize,
}

impl SearchWindow {
    pub fn new(query: &str, day: NaiveDate, limit: usize) -> Self {
        let next = next_day(day);
        Self {
            day,
            query: format!("{query} since:{day} until:{next}"),
            limit,
        }
    }

    /// Whether a timestamp's calendar date is this window's day.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date == self.day
    }
}

pub(crate) fn next_day(day: NaiveDate) -> NaiveDate {
    day.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}
