pub mod config;
pub mod db;
pub mod environment;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod identity;
pub mod logging;
pub mod reconcile;
pub mod workers;

pub use config::AppConfig;
pub use error::{ExtractError, FetchError, NameError, PipelineError, StoreError};

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_CONVERTER: &str = "converter";
pub const TARGET_DB: &str = "db_query";
pub const TARGET_RECONCILE: &str = "reconcile";
pub const TARGET_REPORT: &str = "report";
pub const TARGET_DISPATCH: &str = "dispatch";
