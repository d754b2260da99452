//! The `search` run: build the work list from the directory search form.

use futures::stream;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

use super::common::RunSummary;
use super::dispatch::WorkerPool;
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::fetch::{search_prefixes, DirectorySearch};
use crate::reconcile::ItemOutcome;
use crate::TARGET_WEB_REQUEST;

pub async fn run_search(config: &AppConfig, output: &Path) -> Result<RunSummary, PipelineError> {
    let search =
        DirectorySearch::from_config(config).map_err(|err| PipelineError::Setup(err.to_string()))?;
    let pool = WorkerPool::new("search", config.workers, config.queue_depth);
    harvest_to_file(Arc::new(search), &pool, search_prefixes(), output).await
}

/// Harvests every prefix and writes the de-duplicated, sorted work lines to
/// `output`, one per line.
pub async fn harvest_to_file(
    search: Arc<DirectorySearch>,
    pool: &WorkerPool,
    prefixes: Vec<String>,
    output: &Path,
) -> Result<RunSummary, PipelineError> {
    let collected: Arc<Mutex<BTreeSet<String>>> = Arc::new(Mutex::new(BTreeSet::new()));
    let sink = Arc::clone(&collected);

    let summary = pool
        .run(stream::iter(prefixes.into_iter().map(Ok)), move |prefix: String| {
            let search = Arc::clone(&search);
            let sink = Arc::clone(&sink);
            async move {
                Ok(match search.harvest(&prefix).await {
                    Ok(lines) => {
                        let count = lines.len();
                        if let Ok(mut set) = sink.lock() {
                            set.extend(lines);
                        }
                        ItemOutcome::Harvested {
                            prefix,
                            lines: count,
                        }
                    }
                    Err(err) => ItemOutcome::skipped(&prefix, err),
                })
            }
        })
        .await?;

    let lines: Vec<String> = match collected.lock() {
        Ok(set) => set.iter().cloned().collect(),
        Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
    };
    let mut contents = lines.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }
    tokio::fs::write(output, contents)
        .await
        .map_err(|source| PipelineError::Output {
            path: output.display().to_string(),
            source,
        })?;

    info!(target: TARGET_WEB_REQUEST, "Wrote {} work lines to {}", lines.len(), output.display());
    Ok(summary)
}
