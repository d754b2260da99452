//! Checking a list of known-good email addresses against the store.

use tracing::{debug, instrument};

use super::types::{ItemOutcome, Subject};
use crate::db::Database;
use crate::error::{NameError, StoreError};
use crate::identity::NameResolver;
use crate::TARGET_RECONCILE;

/// One `"Last, First", email` input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailCheckEntry {
    pub first: String,
    pub last: String,
    pub email: String,
}

impl EmailCheckEntry {
    /// Only the first token of the given name is kept.
    pub fn from_record(name: &str, email: &str) -> Result<Self, NameError> {
        let (last, given) = name
            .split_once(',')
            .ok_or_else(|| NameError::Unrecognized(name.to_string()))?;
        let first = given.split_whitespace().next().unwrap_or_default();
        let last = last.trim();
        if first.is_empty() || last.is_empty() {
            return Err(NameError::Unrecognized(name.to_string()));
        }
        Ok(Self {
            first: first.to_string(),
            last: last.to_string(),
            email: email.trim().to_string(),
        })
    }

    fn subject(&self) -> Subject {
        Subject::new(format!("{} {}", self.first, self.last), Some(&self.email))
    }
}

/// Read-only comparison of input entries with stored records.
#[derive(Clone, Debug)]
pub struct Checker {
    resolver: NameResolver,
}

impl Checker {
    pub fn new(db: Database) -> Self {
        Self {
            resolver: NameResolver::new(db),
        }
    }

    #[instrument(target = "reconcile", level = "debug", skip(self))]
    pub async fn check(&self, entry: &EmailCheckEntry) -> Result<ItemOutcome, StoreError> {
        let candidates = self
            .resolver
            .candidates_by_first_last(&entry.first, &entry.last)
            .await?;
        debug!(target: TARGET_RECONCILE, "{} records named {} {}", candidates.len(), entry.first, entry.last);

        if let Some(person) = candidates
            .iter()
            .find(|p| p.email.eq_ignore_ascii_case(&entry.email))
        {
            return Ok(ItemOutcome::Matched {
                person: person.summary(),
            });
        }

        if let Some(owner) = self.resolver.resolve_by_email(&entry.email).await? {
            return Ok(ItemOutcome::PossibleNameUpdate {
                subject: entry.subject(),
                candidate: owner.summary(),
            });
        }

        if candidates.is_empty() {
            Ok(ItemOutcome::NotFound {
                subject: entry.subject(),
            })
        } else {
            Ok(ItemOutcome::PossibleEmailUpdate {
                subject: entry.subject(),
                candidates: candidates.iter().map(|p| p.summary()).collect(),
            })
        }
    }
}
