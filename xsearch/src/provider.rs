use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::backoff::{is_rate_limit_message, parse_next_available};
use crate::{Item, SearchError};

/// A search capability returning up to `limit` items for a query.
#[async_trait]
pub trait SearchProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Item>, SearchError>;
}

/// Runs searches through the `twscrape` command line tool, which owns the account pool.
#[derive(Clone, Debug)]
pub struct TwscrapeProvider {
    program: OsString,
    args: Vec<OsString>,
    db: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
}

impl Default for TwscrapeProvider {
    fn default() -> Self {
        Self::new("twscrape")
    }
}

impl TwscrapeProvider {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            db: None,
            env: vec![],
        }
    }

    /// Arguments placed before the subcommand, e.g. `-m twscrape` when running through python.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Accounts database to use instead of the tool's default.
    pub fn db(mut self, path: impl Into<PathBuf>) -> Self {
        self.db = Some(path.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(db) = &self.db {
            cmd.arg("--db").arg(db);
        }
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    /// Print the account pool status to stdout.
    pub async fn accounts(&self) -> std::io::Result<ExitStatus> {
        self.command()
            .arg("accounts")
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
    }
}

#[async_trait]
impl SearchProvider for TwscrapeProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Item>, SearchError> {
        let mut cmd = self.command();
        cmd.arg("search").arg(query).arg(format!("--limit={limit}"));
        tracing::debug!(?cmd, "running search");

        let output = cmd.output().await.map_err(|e| SearchError::Fetch {
            query: query.to_owned(),
            msg: format!("unable to run {:?}: {}", self.program, e),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(query, &format!("{stderr}{stdout}")));
        }

        parse_items(&stdout).map_err(|msg| SearchError::Fetch {
            query: query.to_owned(),
            msg,
        })
    }
}

fn classify_failure(query: &str, text: &str) -> SearchError {
    if is_rate_limit_message(text) {
        return SearchError::RateLimited {
            retry_after: parse_next_available(text),
        };
    }

    let msg = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("search exited with an error")
        .to_owned();
    SearchError::Fetch {
        query: query.to_owned(),
        msg,
    }
}

/// One JSON object per non-empty line.
fn parse_items(text: &str) -> Result<Vec<Item>, String> {
    text.lines()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str::<Item>(l).map_err(|e| e.to_string()))
        .collect()
}

#[cfg(test)]
mod test {
    use chrono::NaiveTime;

    use super::*;

    const ITEM: &str = r#"{"id": 10, "date": "2024-01-01T23:59:59+00:00", "user": {"username": "bob", "displayname": null}, "rawContent": "hi", "replyCount": 0, "retweetCount": 0, "likeCount": 3}"#;

    #[test]
    fn parse_lines() {
        let text = format!("{ITEM}\n\n{ITEM}\n");
        let items = parse_items(&text).unwrap();
        assert_eq!(2, items.len());
        assert!(parse_items("").unwrap().is_empty());
        assert!(parse_items("{\"id\": 1}").is_err());
    }

    #[test]
    fn classify_rate_limit() {
        let err = classify_failure(
            "q",
            "WARNING No account available for queue \"SearchTimeline\". Next available at 07:45:00\n",
        );
        match err {
            SearchError::RateLimited { retry_after } => {
                assert_eq!(NaiveTime::from_hms_opt(7, 45, 0), retry_after)
            }
            e => panic!("unexpected {e:?}"),
        }

        let err = classify_failure("q", "Rate limit exceeded");
        assert!(matches!(err, SearchError::RateLimited { retry_after: None }));
    }

    #[test]
    fn classify_other() {
        let err = classify_failure("q", "Traceback\n  ...\nValueError: bad query\n\n");
        match err {
            SearchError::Fetch { query, msg } => {
                assert_eq!("q", query);
                assert_eq!("ValueError: bad query", msg);
            }
            e => panic!("unexpected {e:?}"),
        }
    }

    #[cfg(unix)]
    fn script(dir: &tempfile::TempDir, body: &str) -> TwscrapeProvider {
        let path = dir.path().join("tool.sh");
        std::fs::write(&path, body).unwrap();
        TwscrapeProvider::new("sh").args([path])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn search_subprocess() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("[ \"$1\" = search ] || exit 2\n[ \"$3\" = --limit=5 ] || exit 3\necho '{ITEM}'\n");
        let provider = script(&dir, &body);
        let items = provider.search("a since:x", 5).await.unwrap();
        assert_eq!(1, items.len());
        assert_eq!("bob", items[0].user.username);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn search_subprocess_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let body = "echo 'No account available. Next available at 01:02:03' >&2\nexit 1\n";
        let provider = script(&dir, body);
        let err = provider.search("a", 5).await.unwrap_err();
        assert!(matches!(
            err,
            SearchError::RateLimited { retry_after: Some(_) }
        ));
    }

    #[tokio::test]
    async fn search_missing_program() {
        let provider = TwscrapeProvider::new("/nonexistent/xsearch-test-tool");
        let err = provider.search("a", 5).await.unwrap_err();
        assert!(matches!(err, SearchError::Fetch { .. }));
    }
}
