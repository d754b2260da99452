//! Dispatch and the per-item pipelines run by each subcommand.

pub mod common;
pub mod dispatch;
pub mod email_check;
pub mod harvest;
pub mod profile_sync;

pub use common::{read_csv_records, CsvRecord, ResumeKey, RunSummary, WorkDescriptor};
pub use dispatch::{DispatchState, ResumeGate, WorkerPool};
pub use email_check::run_check;
pub use harvest::run_search;
pub use profile_sync::{run_sync, SyncContext};
