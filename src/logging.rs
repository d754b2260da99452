use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const STDOUT_FILTER: &str = "info,web_request=warn,db_query=warn,sqlx=off";
const DEBUG_FILTER: &str = "debug,sqlx=warn,hyper=info,reqwest=info";
const FILE_FILTER: &str = "info,report=info,web_request=debug,sqlx=info";

/// Installs the stdout and daily-rolling file layers.
///
/// `RUST_LOG` takes precedence over the built-in stdout filter; the debug flag
/// switches the built-in filter to `debug`.
pub fn configure_logging(debug: bool) {
    let default_filter = if debug { DEBUG_FILTER } else { STDOUT_FILTER };
    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(stdout_filter);

    let file_appender = rolling::daily("logs", "dirsync.log");
    let file_log = fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();
}
