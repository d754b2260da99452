use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::db::PersonSummary;
use crate::error::{ExtractError, FetchError, NameError};
use crate::TARGET_REPORT;

/// The identity a report is about, as the input described it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub name: String,
    pub email: String,
}

impl Subject {
    pub fn new(name: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            name: name.into(),
            email: email.unwrap_or_default().to_string(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.email)
        }
    }
}

/// Why an item was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    BadWorkLine(String),
    Fetch(String),
    Extract(String),
    Name(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BadWorkLine(msg) => write!(f, "bad work line: {}", msg),
            SkipReason::Fetch(msg) => write!(f, "fetch failed: {}", msg),
            SkipReason::Extract(msg) => write!(f, "extraction failed: {}", msg),
            SkipReason::Name(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<FetchError> for SkipReason {
    fn from(err: FetchError) -> Self {
        SkipReason::Fetch(err.to_string())
    }
}

impl From<ExtractError> for SkipReason {
    fn from(err: ExtractError) -> Self {
        SkipReason::Extract(err.to_string())
    }
}

impl From<NameError> for SkipReason {
    fn from(err: NameError) -> Self {
        SkipReason::Name(err.to_string())
    }
}

/// What happened to one work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ItemOutcome {
    /// The record was overwritten with scraped fields.
    Updated { person: PersonSummary },
    /// As `Updated`, and the first name was replaced by the longer form.
    Canonicalized {
        person: PersonSummary,
        preferred_name: String,
    },
    /// Name and email agree with a stored record.
    Matched { person: PersonSummary },
    /// Another record owns the email; its name may be stale.
    PossibleNameUpdate {
        subject: Subject,
        candidate: PersonSummary,
    },
    /// Records share the name but none has the email.
    PossibleEmailUpdate {
        subject: Subject,
        candidates: Vec<PersonSummary>,
    },
    NotFound { subject: Subject },
    Skipped { item: String, reason: SkipReason },
    /// A search prefix produced this many work lines.
    Harvested { prefix: String, lines: usize },
}

impl ItemOutcome {
    pub fn skipped(item: &str, reason: impl Into<SkipReason>) -> Self {
        ItemOutcome::Skipped {
            item: item.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the outcome needs a human to look at it.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ItemOutcome::PossibleNameUpdate { .. }
                | ItemOutcome::PossibleEmailUpdate { .. }
                | ItemOutcome::NotFound { .. }
                | ItemOutcome::Skipped { .. }
        )
    }

    /// Emits the one report line for this outcome.
    pub fn report(&self) {
        if self.is_conflict() {
            warn!(target: TARGET_REPORT, "{}", self);
        } else {
            info!(target: TARGET_REPORT, "{}", self);
        }
    }
}

impl fmt::Display for ItemOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemOutcome::Updated { person } => write!(f, "UPDATED {}", person),
            ItemOutcome::Canonicalized {
                person,
                preferred_name,
            } => write!(f, "UPDATED {} (preferred name: {})", person, preferred_name),
            ItemOutcome::Matched { person } => write!(f, "MATCHED {}", person),
            ItemOutcome::PossibleNameUpdate { subject, candidate } => write!(
                f,
                "POSSIBLE NAME UPDATE: {}; possible match: {}",
                subject, candidate
            ),
            ItemOutcome::PossibleEmailUpdate {
                subject,
                candidates,
            } => {
                let listed: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
                write!(
                    f,
                    "POSSIBLE EMAIL UPDATE: {}; possible matches: {}",
                    subject,
                    listed.join("; ")
                )
            }
            ItemOutcome::NotFound { subject } => write!(f, "NOT FOUND: {}", subject),
            ItemOutcome::Skipped { item, reason } => write!(f, "SKIPPED {}: {}", item, reason),
            ItemOutcome::Harvested { prefix, lines } => {
                write!(f, "HARVESTED {}: {} work lines", prefix, lines)
            }
        }
    }
}
