//! The `sync` run: fetch, extract and reconcile every profile in a work list.

use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::SplitStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, instrument};

use super::common::{RunSummary, WorkDescriptor};
use super::dispatch::WorkerPool;
use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{FetchError, PipelineError, StoreError};
use crate::extract::{parse_address, Extractor, ProfileLayout};
use crate::fetch::ProfileFetcher;
use crate::identity::{parse_display_name, parse_profile_name};
use crate::reconcile::{ItemOutcome, ProfileInput, Reconciler, SkipReason};
use crate::TARGET_RECONCILE;

/// Everything a worker needs to carry one work line through the pipeline.
#[derive(Clone)]
pub struct SyncContext {
    fetcher: ProfileFetcher,
    extractor: Extractor,
    layout: ProfileLayout,
    reconciler: Reconciler,
}

impl SyncContext {
    pub fn new(
        fetcher: ProfileFetcher,
        extractor: Extractor,
        layout: ProfileLayout,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            layout,
            reconciler,
        }
    }

    pub fn from_config(db: Database, config: &AppConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            ProfileFetcher::from_config(config)?,
            Extractor::from_config(config),
            ProfileLayout::default(),
            Reconciler::from_config(db, config),
        ))
    }

    /// Runs one work line to an outcome. Per-item failures become `Skipped`;
    /// only store failures are returned as errors.
    #[instrument(target = "reconcile", level = "debug", skip(self))]
    pub async fn process_line(&self, line: &str) -> Result<ItemOutcome, StoreError> {
        let skip = |reason: SkipReason| Ok(ItemOutcome::skipped(line, reason));

        let work = match WorkDescriptor::parse_line(line) {
            Ok(work) => work,
            Err(reason) => return skip(reason),
        };
        let lookup_name = if work.display_name.is_empty() {
            None
        } else {
            match parse_display_name(&work.display_name) {
                Ok(name) => Some(name),
                Err(err) => return skip(err.into()),
            }
        };

        let url = self.fetcher.profile_url(&work.token);
        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(err) => return skip(err.into()),
        };
        let table = match self.extractor.extract(&html).await {
            Ok(table) => table,
            Err(err) => return skip(err.into()),
        };
        let profile = match self.layout.read(&table) {
            Ok(profile) => profile,
            Err(err) => return skip(err.into()),
        };
        let profile_name = match parse_profile_name(&profile.name) {
            Ok(name) => name,
            Err(err) => return skip(err.into()),
        };

        let Some(lookup_name) = lookup_name.or_else(|| profile_name.clone()) else {
            return skip(SkipReason::Name("no name in work line or profile".to_string()));
        };
        debug!(target: TARGET_RECONCILE, "Reconciling {} from {}", lookup_name, url);

        let input = ProfileInput {
            lookup_name,
            profile_name,
            address: parse_address(&profile.address_lines),
            room: profile.room,
            mail_stop: profile.mail_stop,
            email: profile.email,
        };
        self.reconciler.reconcile(&input).await
    }
}

/// Reads work lines from `config.input_path` and reconciles each one.
pub async fn run_sync(config: &AppConfig, db: Database) -> Result<RunSummary, PipelineError> {
    let context = SyncContext::from_config(db, config)
        .map_err(|err| PipelineError::Setup(err.to_string()))?;
    let pool = WorkerPool::from_config("sync", config);
    sync_file(Arc::new(context), &pool, &config.input_path).await
}

pub async fn sync_file(
    context: Arc<SyncContext>,
    pool: &WorkerPool,
    path: &Path,
) -> Result<RunSummary, PipelineError> {
    info!(target: TARGET_RECONCILE, "Loading work lines from {}", path.display());
    let file = File::open(path).await?;
    let lines = SplitStream::new(BufReader::new(file).split(b'\n'))
        .map(|segment| segment.map(|bytes| decode_work_line(&bytes)));

    pool.run(lines, move |line: String| {
        let context = Arc::clone(&context);
        async move { context.process_line(&line).await }
    })
    .await
}

/// Work lines are not guaranteed to be UTF-8; undecodable bytes are replaced
/// rather than failing the read.
fn decode_work_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
