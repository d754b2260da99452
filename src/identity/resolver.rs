use serde::Serialize;
use tracing::{debug, instrument};

use crate::db::{Database, Person};
use crate::error::StoreError;
use crate::TARGET_RECONCILE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolutionTier {
    /// First, middle and last all matched.
    Exact,
    /// First and last matched; the middle name was ignored.
    FirstLast,
}

/// Records matching a name, lowest id first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pub records: Vec<Person>,
    /// `None` when nothing matched.
    pub tier: Option<ResolutionTier>,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Tiered name lookup against the identity store.
///
/// "No match" is an empty set; any store failure is returned as an error.
#[derive(Clone, Debug)]
pub struct NameResolver {
    db: Database,
}

impl NameResolver {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(target = "reconcile", level = "debug", skip(self))]
    pub async fn resolve(
        &self,
        first: &str,
        middle: &str,
        last: &str,
    ) -> Result<CandidateSet, StoreError> {
        if !middle.is_empty() {
            let records = self.db.find_by_full_name(first, middle, last).await?;
            if !records.is_empty() {
                return Ok(CandidateSet {
                    records,
                    tier: Some(ResolutionTier::Exact),
                });
            }
            debug!(target: TARGET_RECONCILE, "No exact match for {} {} {}, trying first/last", first, middle, last);
        }

        let records = self.db.find_by_first_last(first, last).await?;
        let tier = (!records.is_empty()).then_some(ResolutionTier::FirstLast);
        Ok(CandidateSet { records, tier })
    }

    pub async fn candidates_by_first_last(
        &self,
        first: &str,
        last: &str,
    ) -> Result<Vec<Person>, StoreError> {
        self.db.find_by_first_last(first, last).await
    }

    pub async fn resolve_by_email(&self, email: &str) -> Result<Option<Person>, StoreError> {
        self.db.find_by_email(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn resolver() -> (NameResolver, Database) {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.create_schema().await.unwrap();
        (NameResolver::new(db.clone()), db)
    }

    #[tokio::test]
    async fn test_exact_tier_wins() {
        let (resolver, db) = resolver().await;
        let plain = db.insert_person(&Person::new("Jane", "", "Doe")).await.unwrap();
        let exact = db.insert_person(&Person::new("Jane", "Q", "Doe")).await.unwrap();

        let set = resolver.resolve("Jane", "Q", "Doe").await.unwrap();
        assert_eq!(set.tier, Some(ResolutionTier::Exact));
        assert_eq!(set.records.iter().map(|p| p.id).collect::<Vec<_>>(), vec![exact]);

        // A middle name that matches nobody falls through to the pair lookup.
        let set = resolver.resolve("Jane", "X", "Doe").await.unwrap();
        assert_eq!(set.tier, Some(ResolutionTier::FirstLast));
        assert_eq!(set.records.iter().map(|p| p.id).collect::<Vec<_>>(), vec![plain, exact]);
    }

    #[tokio::test]
    async fn test_empty_middle_uses_first_last() {
        let (resolver, db) = resolver().await;
        let id = db.insert_person(&Person::new("Jane", "Q", "Doe")).await.unwrap();

        let set = resolver.resolve("Jane", "", "Doe").await.unwrap();
        assert_eq!(set.tier, Some(ResolutionTier::FirstLast));
        assert_eq!(set.records.iter().map(|p| p.id).collect::<Vec<_>>(), vec![id]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let (resolver, _db) = resolver().await;
        let set = resolver.resolve("Nobody", "", "Here").await.unwrap();
        assert!(set.is_empty());
        assert_eq!(set.tier, None);
        assert!(resolver.resolve_by_email("nobody@faa.gov").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        let resolver = NameResolver::new(db);
        // No schema: the lookup fails rather than reporting "not found".
        assert!(matches!(
            resolver.resolve("Jane", "Q", "Doe").await,
            Err(StoreError::Query(_))
        ));
    }
}
