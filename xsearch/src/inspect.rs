use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use serde::Deserialize;

use crate::item::parse_date;
use crate::ArchiveError;

const TOP_USERS: usize = 5;
const ENGAGEMENT: [&str; 3] = ["likes", "retweets", "replies"];
const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Descriptive statistics over an archive. Each section is present only when the archive has
/// the matching columns.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveStats {
    pub total: usize,
    pub dates: Option<DateStats>,
    pub users: Option<UserStats>,
    pub engagement: Vec<EngagementStats>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DateStats {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub span_days: i64,
    pub mean_per_day: f64,
    pub max_per_day: usize,
    pub min_per_day: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UserStats {
    pub unique: usize,
    pub mean_per_user: f64,
    pub top: Vec<(String, usize)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngagementStats {
    pub column: &'static str,
    pub total: u64,
    pub mean: f64,
    pub median: f64,
    pub max: u64,
}

#[derive(Deserialize, Debug, Default)]
struct Row {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    likes: Option<u64>,
    #[serde(default)]
    retweets: Option<u64>,
    #[serde(default)]
    replies: Option<u64>,
}

impl Row {
    fn engagement(&self, column: &str) -> Option<u64> {
        match column {
            "likes" => self.likes,
            "retweets" => self.retweets,
            "replies" => self.replies,
            _ => None,
        }
    }
}

impl ArchiveStats {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|error| ArchiveError::Io {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_reader(file).map_err(|msg| ArchiveError::Parse {
            path: path.display().to_string(),
            msg,
        })
    }

    fn from_reader(reader: impl Read) -> Result<Self, String> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers().map_err(|e| e.to_string())?.clone();
        let has = |column: &str| headers.iter().any(|h| h == column);

        let rows = reader
            .deserialize::<Row>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.to_string())?;

        let dates = if has("date") {
            let dates = rows
                .iter()
                .filter_map(|r| r.date.as_deref())
                .map(|d| parse_date(d).map_err(|e| format!("invalid date {d:?}: {e}")))
                .collect::<Result<Vec<_>, _>>()?;
            date_stats(&dates)
        } else {
            None
        };

        let users = if has("username") {
            user_stats(rows.len(), rows.iter().filter_map(|r| r.username.as_deref()))
        } else {
            None
        };

        let engagement = ENGAGEMENT
            .into_iter()
            .filter(|c| has(*c))
            .filter_map(|c| engagement_stats(c, rows.iter().filter_map(|r| r.engagement(c))))
            .collect();

        Ok(Self {
            total: rows.len(),
            dates,
            users,
            engagement,
        })
    }
}

fn date_stats(dates: &[DateTime<Utc>]) -> Option<DateStats> {
    let first = *dates.iter().min()?;
    let last = *dates.iter().max()?;

    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for d in dates {
        *per_day.entry(d.date_naive()).or_default() += 1;
    }

    Some(DateStats {
        first,
        last,
        span_days: (last - first).num_days() + 1,
        mean_per_day: dates.len() as f64 / per_day.len() as f64,
        max_per_day: per_day.values().copied().max()?,
        min_per_day: per_day.values().copied().min()?,
    })
}

fn user_stats<'a>(total: usize, users: impl Iterator<Item = &'a str>) -> Option<UserStats> {
    let counts = users.counts();
    if counts.is_empty() {
        return None;
    }

    let top = counts
        .iter()
        .sorted_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)))
        .take(TOP_USERS)
        .map(|(u, c)| (u.to_string(), *c))
        .collect();

    Some(UserStats {
        unique: counts.len(),
        mean_per_user: total as f64 / counts.len() as f64,
        top,
    })
}

fn engagement_stats(
    column: &'static str,
    values: impl Iterator<Item = u64>,
) -> Option<EngagementStats> {
    let values: Vec<u64> = values.sorted().collect();
    let max = *values.last()?;
    let total: u64 = values.iter().sum();

    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) as f64 / 2.0
    } else {
        values[mid] as f64
    };

    Some(EngagementStats {
        column,
        total,
        mean: total as f64 / values.len() as f64,
        median,
        max,
    })
}

/// Format with `,` thousands separators.
fn grouped(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

impl Display for ArchiveStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "total posts: {}", grouped(self.total as u64))?;
        writeln!(f)?;

        if let Some(d) = &self.dates {
            writeln!(f, "start: {}", d.first.format(TIMESTAMP))?;
            writeln!(f, "end: {}", d.last.format(TIMESTAMP))?;
            writeln!(f, "span: {} days", d.span_days)?;
            writeln!(f)?;
            writeln!(f, "avg posts per day: {:.1}", d.mean_per_day)?;
            writeln!(f, "max posts per day: {}", d.max_per_day)?;
            writeln!(f, "min posts per day: {}", d.min_per_day)?;
            writeln!(f)?;
        }

        if let Some(u) = &self.users {
            writeln!(f, "users")?;
            writeln!(f, "unique: {}", grouped(u.unique as u64))?;
            writeln!(f, "avg posts per user: {:.1}", u.mean_per_user)?;
            writeln!(f, "top {} active:", TOP_USERS)?;
            for (user, count) in &u.top {
                writeln!(f, "  @{user}: {count}")?;
            }
            writeln!(f)?;
        }

        if !self.engagement.is_empty() {
            writeln!(f, "engagement")?;
            for e in &self.engagement {
                writeln!(f, "{}:", e.column)?;
                writeln!(f, "  total: {}", grouped(e.total))?;
                writeln!(f, "  avg: {:.1}", e.mean)?;
                writeln!(f, "  median: {:.1}", e.median)?;
                writeln!(f, "  max: {}", grouped(e.max))?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
