//! Reconciliation decisions and their reports.

mod checker;
mod profile;
mod types;

pub use self::checker::{Checker, EmailCheckEntry};
pub use self::profile::{ProfileInput, Reconciler};
pub use self::types::{ItemOutcome, SkipReason, Subject};
