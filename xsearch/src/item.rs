use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A post as emitted by the search tool, one JSON object per line.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: u64,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: DateTime<Utc>,
    pub user: Author,
    pub raw_content: String,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Author {
    pub username: String,
    pub displayname: Option<String>,
}

impl Item {
    pub fn url(&self) -> String {
        format!(
            "https://twitter.com/{}/status/{}",
            self.user.username, self.id
        )
    }
}

/// A row of the CSV archive.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Record {
    #[serde(serialize_with = "serialize_date")]
    pub date: DateTime<Utc>,
    pub username: String,
    pub display_name: String,
    pub content: String,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub url: String,
}

impl From<&Item> for Record {
    fn from(item: &Item) -> Self {
        Self {
            date: item.date,
            username: item.user.username.clone(),
            display_name: item
                .user
                .displayname
                .clone()
                .unwrap_or_else(|| item.user.username.clone()),
            content: item.raw_content.clone(),
            likes: item.like_count,
            retweets: item.retweet_count,
            replies: item.reply_count,
            url: item.url(),
        }
    }
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_date(&s).map_err(serde::de::Error::custom)
}

/// Accepts RFC 3339 as well as the space separated form python's `str()` produces.
pub(crate) fn parse_date(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(d) => Ok(d.with_timezone(&Utc)),
        Err(e) => DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z")
            .map(|d| d.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map(|d| d.and_utc())
            })
            .map_err(|_| e),
    }
}

fn serialize_date<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.to_rfc3339())
}

#[cfg(test)]
mod test {
    use super::*;

    const LINE: &str = r#"{"id": 1742000000000000001, "id_str": "1742000000000000001", "url": "https://x.com/alice/status/1742000000000000001", "date": "2024-01-02 08:15:00+00:00", "user": {"id": 7, "username": "alice", "displayname": "Alice A."}, "lang": "en", "rawContent": "warming stripes", "replyCount": 2, "retweetCount": 5, "likeCount": 11, "quoteCount": 0}"#;

    #[test]
    fn parse_item() {
        let item: Item = serde_json::from_str(LINE).unwrap();
        assert_eq!(1742000000000000001, item.id);
        assert_eq!("2024-01-02T08:15:00+00:00", item.date.to_rfc3339());
        assert_eq!("Alice A.", item.user.displayname.as_deref().unwrap());
        assert_eq!(11, item.like_count);
    }

    #[test]
    fn record_from_item() {
        let mut item: Item = serde_json::from_str(LINE).unwrap();
        item.user.displayname = None;
        let record = Record::from(&item);
        assert_eq!("alice", record.display_name);
        assert_eq!(
            "https://twitter.com/alice/status/1742000000000000001",
            record.url
        );
        assert_eq!((11, 5, 2), (record.likes, record.retweets, record.replies));
    }

    #[test]
    fn date_formats() {
        let a = parse_date("2024-01-02T08:15:00Z").unwrap();
        let b = parse_date("2024-01-02 09:15:00+01:00").unwrap();
        let c = parse_date("2024-01-02 08:15:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(parse_date("yesterday").is_err());
    }
}
