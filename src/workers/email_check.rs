//! The `check` run: compare a list of known email addresses with the store.

use futures::stream;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::common::{read_csv_records, CsvRecord, RunSummary};
use super::dispatch::WorkerPool;
use crate::config::AppConfig;
use crate::db::Database;
use crate::error::{PipelineError, StoreError};
use crate::reconcile::{Checker, EmailCheckEntry, ItemOutcome, SkipReason};
use crate::TARGET_RECONCILE;

/// Checks one `"Last, First", email` row.
pub async fn check_record(checker: &Checker, record: &CsvRecord) -> Result<ItemOutcome, StoreError> {
    let label = record.fields.join(",");
    let (Some(name), Some(email)) = (record.field(0), record.field(1)) else {
        return Ok(ItemOutcome::skipped(
            &label,
            SkipReason::BadWorkLine("expected name and email columns".to_string()),
        ));
    };
    match EmailCheckEntry::from_record(name, email) {
        Ok(entry) => checker.check(&entry).await,
        Err(err) => Ok(ItemOutcome::skipped(&label, err)),
    }
}

pub async fn run_check(config: &AppConfig, db: Database) -> Result<RunSummary, PipelineError> {
    let pool = WorkerPool::from_config("check", config);
    check_file(Arc::new(Checker::new(db)), &pool, &config.input_path).await
}

pub async fn check_file(
    checker: Arc<Checker>,
    pool: &WorkerPool,
    path: &Path,
) -> Result<RunSummary, PipelineError> {
    info!(target: TARGET_RECONCILE, "Loading email list from {}", path.display());
    let records = read_csv_records(path)?;
    info!(target: TARGET_RECONCILE, "{} rows to check", records.len());

    pool.run(stream::iter(records.into_iter().map(Ok)), move |record: CsvRecord| {
        let checker = Arc::clone(&checker);
        async move { check_record(&checker, &record).await }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Person;
    use std::io::Write;

    #[tokio::test]
    async fn test_check_file() {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.create_schema().await.unwrap();
        db.insert_person(&Person::new("Jane", "", "Doe").with_email("jane.doe@faa.gov"))
            .await
            .unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\"Doe, Jane\",jane.doe@faa.gov").unwrap();
        writeln!(file, "\"Doe, Jane\",jane.x.doe@faa.gov").unwrap();
        writeln!(file, "\"Poe, Ed\",ed.poe@faa.gov").unwrap();
        writeln!(file, "Nobody").unwrap();
        file.flush().unwrap();

        let pool = WorkerPool::new("check", 3, 1);
        let summary = check_file(Arc::new(Checker::new(db)), &pool, file.path())
            .await
            .unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.possible_email_updates, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.dispatched, 4);
    }
}
