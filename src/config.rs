//! Run configuration.
//!
//! One `AppConfig` is built at start-up (defaults, then environment, then
//! command-line overrides applied by the binary) and handed to every
//! component constructor.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::environment::{get_env_flag, get_env_string, get_env_var_as_vec, get_env_var_or};
use crate::fetch::{MAX_RETRIES, RETRY_DELAY};

pub const DEFAULT_PROFILE_BASE_URL: &str =
    "https://directory.faa.gov/appsPub/National/employeedirectory/faadir.nsf/";
pub const DEFAULT_WORKERS: usize = 25;
pub const DEFAULT_FETCH_ATTEMPTS: usize = MAX_RETRIES;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = RETRY_DELAY.as_secs();
pub const DEFAULT_EMAIL_DOMAIN: &str = "faa.gov";
pub const DEFAULT_DATABASE_PATH: &str = "directory.db";
pub const DEFAULT_SYNC_INPUT: &str = "step4.csv";
pub const DEFAULT_CHECK_INPUT: &str = "validatedFAAeMailAddr.csv";
pub const DEFAULT_CONVERTER: &str = "python html2table.py";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub input_path: PathBuf,
    pub workers: usize,
    /// Work lines are passed over until one contains this text.
    pub resume_marker: Option<String>,
    pub debug: bool,
    pub profile_base_url: String,
    pub search_url: String,
    pub converter_program: String,
    pub converter_args: Vec<String>,
    pub work_dir: PathBuf,
    pub fetch_attempts: usize,
    pub retry_delay: Duration,
    pub email_domain: String,
    pub pick_first_on_ambiguous: bool,
    pub queue_depth: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let (converter_program, converter_args) = split_command(DEFAULT_CONVERTER);
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            input_path: PathBuf::from(DEFAULT_SYNC_INPUT),
            workers: DEFAULT_WORKERS,
            resume_marker: None,
            debug: false,
            profile_base_url: DEFAULT_PROFILE_BASE_URL.to_string(),
            search_url: format!("{}SearchForm?OpenForm", DEFAULT_PROFILE_BASE_URL),
            converter_program,
            converter_args,
            work_dir: PathBuf::from("."),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            pick_first_on_ambiguous: true,
            queue_depth: 1,
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with whatever the environment provides.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let converter = get_env_var_as_vec("CONVERTER_COMMAND", ' ');
        let (converter_program, converter_args) = match converter.split_first() {
            Some((program, args)) => (program.clone(), args.to_vec()),
            None => (defaults.converter_program.clone(), defaults.converter_args.clone()),
        };

        let profile_base_url =
            get_env_string("PROFILE_BASE_URL").unwrap_or(defaults.profile_base_url);
        let search_url = get_env_string("SEARCH_URL")
            .unwrap_or_else(|| format!("{}SearchForm?OpenForm", profile_base_url));

        Self {
            database_path: get_env_string("DATABASE_PATH").unwrap_or(defaults.database_path),
            input_path: defaults.input_path,
            workers: get_env_var_or("WORKERS", defaults.workers),
            resume_marker: None,
            debug: get_env_flag("DEBUG"),
            profile_base_url,
            search_url,
            converter_program,
            converter_args,
            work_dir: get_env_string("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            fetch_attempts: get_env_var_or("FETCH_ATTEMPTS", defaults.fetch_attempts),
            retry_delay: Duration::from_secs(get_env_var_or(
                "RETRY_DELAY_SECS",
                DEFAULT_RETRY_DELAY_SECS,
            )),
            email_domain: get_env_string("EMAIL_DOMAIN").unwrap_or(defaults.email_domain),
            pick_first_on_ambiguous: defaults.pick_first_on_ambiguous,
            queue_depth: defaults.queue_depth,
        }
    }

    /// Replaces the converter with a whitespace separated command line.
    pub fn set_converter_command(&mut self, command: &str) {
        let (program, args) = split_command(command);
        if !program.is_empty() {
            self.converter_program = program;
            self.converter_args = args;
        }
    }

    /// Clamps counters and checks the URLs; called once before a run.
    pub fn validate(&mut self) -> Result<()> {
        self.workers = self.workers.max(1);
        self.fetch_attempts = self.fetch_attempts.max(1);
        self.queue_depth = self.queue_depth.max(1);

        if !is_valid_url(&self.profile_base_url) {
            bail!("Invalid profile base URL: {}", self.profile_base_url);
        }
        if !self.profile_base_url.ends_with('/') {
            self.profile_base_url.push('/');
        }
        if !is_valid_url(&self.search_url) {
            bail!("Invalid search URL: {}", self.search_url);
        }
        if let Some(marker) = &self.resume_marker {
            if marker.trim().is_empty() {
                self.resume_marker = None;
            }
        }
        Ok(())
    }
}

/// Helper function to validate a URL
pub fn is_valid_url(url: &str) -> bool {
    if let Ok(parsed) = url::Url::parse(url) {
        parsed.scheme() == "http" || parsed.scheme() == "https"
    } else {
        false
    }
}

fn split_command(command: &str) -> (String, Vec<String>) {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next().unwrap_or_default();
    (program, parts.collect())
}
