mod archive;
mod backoff;
mod error;
mod inspect;
mod item;
mod progress_bar;
mod provider;
mod session;
mod window;

pub use archive::CsvArchive;
pub use backoff::{is_rate_limit_message, parse_next_available, BackoffPolicy};
pub use error::{ArchiveError, SearchError, SessionError};
pub use inspect::{ArchiveStats, DateStats, EngagementStats, UserStats};
pub use item::{Author, Item, Record};
pub use progress_bar::ProgressBar;
pub use provider::{SearchProvider, TwscrapeProvider};
pub use session::{SearchSession, SearchState, SearchSummary};
pub use window::SearchWindow;
