//! Remote directory access: profile pages and the last-name search form.

mod client;
mod fetcher;
mod search;
mod types;

pub use self::client::create_http_client;
pub use self::fetcher::ProfileFetcher;
pub use self::search::{extract_work_lines, search_prefixes, DirectorySearch};
pub use self::types::*;
