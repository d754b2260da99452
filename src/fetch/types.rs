//! Constants shared by the fetch module.

use tokio::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
pub const MAX_RETRIES: usize = 3;

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Form button id the directory's search page expects on submit.
pub const SEARCH_CLICK_ID: &str = "862570240055C5F3.c191ad9beca4086705256f6b00650208/$Body/0.1158";

/// Marker in profile links found on search result pages.
pub const PROFILE_LINK_MARKER: &str = "(LoadPerson)?OpenAgent";
