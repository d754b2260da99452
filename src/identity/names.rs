//! Splitting directory names into first/middle/last.
//!
//! Each accepted shape is a named rule; rules are tried in order and the
//! first one that matches wins.

use serde::Serialize;
use std::fmt;
use tracing::trace;

use crate::error::NameError;
use crate::TARGET_RECONCILE;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameParts {
    pub first: String,
    pub middle: String,
    pub last: String,
}

impl NameParts {
    pub fn new(first: &str, middle: &str, last: &str) -> Self {
        Self {
            first: first.to_string(),
            middle: middle.to_string(),
            last: last.to_string(),
        }
    }
}

impl fmt::Display for NameParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.middle.is_empty() {
            write!(f, "{} {}", self.first, self.last)
        } else {
            write!(f, "{} {} {}", self.first, self.middle, self.last)
        }
    }
}

pub struct NameRule {
    pub name: &'static str,
    apply: fn(&[&str]) -> Option<NameParts>,
}

/// Rules for search-result names, applied to the comma separated segments.
pub const DISPLAY_NAME_RULES: &[NameRule] = &[
    NameRule {
        name: "last-comma-first-middle",
        apply: |segments| match segments {
            [last, given] => match given.split_whitespace().collect::<Vec<_>>().as_slice() {
                [first, middle, ..] => Some(NameParts::new(first, middle, last)),
                _ => None,
            },
            _ => None,
        },
    },
    NameRule {
        name: "last-comma-first",
        apply: |segments| match segments {
            [last, first] if !first.is_empty() && !first.contains(char::is_whitespace) => {
                Some(NameParts::new(first, "", last))
            }
            _ => None,
        },
    },
    NameRule {
        name: "last-first-middle-segments",
        apply: |segments| match segments {
            [last, first, middle] if !first.is_empty() => Some(NameParts::new(first, middle, last)),
            _ => None,
        },
    },
];

/// Rules for the name printed on a profile page, applied to its
/// whitespace separated tokens.
pub const PROFILE_NAME_RULES: &[NameRule] = &[
    NameRule {
        name: "first-last",
        apply: |tokens| match tokens {
            [first, last] => Some(NameParts::new(first, "", last)),
            _ => None,
        },
    },
    NameRule {
        name: "first-middle-last",
        apply: |tokens| match tokens {
            [first, middle, last] => Some(NameParts::new(first, middle, last)),
            _ => None,
        },
    },
];

fn apply_rules(rules: &[NameRule], parts: &[&str], raw: &str) -> Result<NameParts, NameError> {
    for rule in rules {
        if let Some(name) = (rule.apply)(parts) {
            if name.last.is_empty() {
                continue;
            }
            trace!(target: TARGET_RECONCILE, "'{}' matched rule {}", raw, rule.name);
            return Ok(name);
        }
    }
    Err(NameError::Unrecognized(raw.to_string()))
}

/// Parses `"Last, First"`, `"Last, First Middle"` or `"Last, First, Middle"`.
/// Given names past the middle one are ignored.
pub fn parse_display_name(raw: &str) -> Result<NameParts, NameError> {
    let segments: Vec<&str> = raw.split(',').map(str::trim).collect();
    apply_rules(DISPLAY_NAME_RULES, &segments, raw)
}

/// Parses a profile's own name. An empty name is `Ok(None)`.
pub fn parse_profile_name(raw: &str) -> Result<Option<NameParts>, NameError> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(None);
    }
    apply_rules(PROFILE_NAME_RULES, &tokens, raw).map(Some)
}
