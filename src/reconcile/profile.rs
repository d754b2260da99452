//! Deciding what a scraped profile does to the identity store.

use tracing::{debug, info, instrument, warn};

use super::types::{ItemOutcome, Subject};
use crate::config::AppConfig;
use crate::db::{Database, Person};
use crate::error::StoreError;
use crate::extract::{AddressStatus, ParsedAddress};
use crate::identity::{build_email, CandidateSet, NameParts, NameResolver};
use crate::TARGET_RECONCILE;

/// Everything the reconciler knows about one scraped profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInput {
    /// The name from the search results, used for the first lookup.
    pub lookup_name: NameParts,
    /// The name printed on the profile page, when there is one.
    pub profile_name: Option<NameParts>,
    pub address: ParsedAddress,
    pub room: String,
    pub mail_stop: String,
    pub email: Option<String>,
}

impl ProfileInput {
    fn subject(&self) -> Subject {
        Subject::new(self.lookup_name.to_string(), self.email.as_deref())
    }
}

enum Selection {
    Record(Person),
    Report(ItemOutcome),
}

#[derive(Clone, Debug)]
pub struct Reconciler {
    db: Database,
    resolver: NameResolver,
    email_domain: String,
    pick_first_on_ambiguous: bool,
}

impl Reconciler {
    pub fn new(db: Database, email_domain: &str, pick_first_on_ambiguous: bool) -> Self {
        Self {
            resolver: NameResolver::new(db.clone()),
            db,
            email_domain: email_domain.to_string(),
            pick_first_on_ambiguous,
        }
    }

    pub fn from_config(db: Database, config: &AppConfig) -> Self {
        Self::new(db, &config.email_domain, config.pick_first_on_ambiguous)
    }

    /// Resolves the profile to a record and writes the scraped fields to it,
    /// or reports why it could not. Only store failures are errors.
    #[instrument(target = "reconcile", level = "debug", skip_all, fields(name = %input.lookup_name))]
    pub async fn reconcile(&self, input: &ProfileInput) -> Result<ItemOutcome, StoreError> {
        let mut used_name = &input.lookup_name;
        let mut candidates = self.resolve(used_name).await?;

        if candidates.is_empty() {
            if let Some(profile_name) = &input.profile_name {
                debug!(target: TARGET_RECONCILE, "Nothing for {}, trying profile name {}", used_name, profile_name);
                used_name = profile_name;
                candidates = self.resolve(used_name).await?;
            }
        }

        if candidates.is_empty() {
            return self.unresolved(input).await;
        }

        let mut person = match self.select(input, candidates).await? {
            Selection::Record(person) => person,
            Selection::Report(outcome) => return Ok(outcome),
        };

        apply_scraped_fields(&mut person, input);

        let mut preferred_name = None;
        if let Some(profile_name) = &input.profile_name {
            if profile_name.first != used_name.first {
                info!(
                    target: TARGET_RECONCILE,
                    "Names differ: [{}] vs [{}]", profile_name, used_name
                );
                preferred_name = self.canonicalize(&mut person, &used_name.first, &profile_name.first);
            }
        }

        if person.email.is_empty() {
            person.email = match &input.email {
                Some(email) => email.clone(),
                None => build_email(
                    &person.first_name,
                    &person.middle_name,
                    &person.last_name,
                    &self.email_domain,
                )
                .unwrap_or_default(),
            };
        }

        self.db.update_person(&person).await?;

        Ok(match preferred_name {
            Some(preferred_name) => ItemOutcome::Canonicalized {
                person: person.summary(),
                preferred_name,
            },
            None => ItemOutcome::Updated {
                person: person.summary(),
            },
        })
    }

    async fn resolve(&self, name: &NameParts) -> Result<CandidateSet, StoreError> {
        self.resolver.resolve(&name.first, &name.middle, &name.last).await
    }

    /// No name matched. The scraped email may still point at a record whose
    /// name has drifted.
    async fn unresolved(&self, input: &ProfileInput) -> Result<ItemOutcome, StoreError> {
        if let Some(email) = &input.email {
            if let Some(owner) = self.resolver.resolve_by_email(email).await? {
                return Ok(ItemOutcome::PossibleNameUpdate {
                    subject: input.subject(),
                    candidate: owner.summary(),
                });
            }
        }
        Ok(ItemOutcome::NotFound {
            subject: input.subject(),
        })
    }

    /// Picks the working record from a non-empty candidate set.
    async fn select(
        &self,
        input: &ProfileInput,
        candidates: CandidateSet,
    ) -> Result<Selection, StoreError> {
        let mut records = candidates.records;
        if records.len() == 1 {
            return Ok(Selection::Record(records.remove(0)));
        }

        match &input.email {
            Some(email) => {
                if let Some(pos) = records
                    .iter()
                    .position(|p| p.email.eq_ignore_ascii_case(email))
                {
                    return Ok(Selection::Record(records.swap_remove(pos)));
                }
                if let Some(owner) = self.resolver.resolve_by_email(email).await? {
                    return Ok(Selection::Report(ItemOutcome::PossibleNameUpdate {
                        subject: input.subject(),
                        candidate: owner.summary(),
                    }));
                }
            }
            None if self.pick_first_on_ambiguous => {
                warn!(
                    target: TARGET_RECONCILE,
                    "{} records named {}; using id {}",
                    records.len(),
                    input.lookup_name,
                    records[0].id
                );
                return Ok(Selection::Record(records.remove(0)));
            }
            None => {}
        }

        Ok(Selection::Report(ItemOutcome::PossibleEmailUpdate {
            subject: input.subject(),
            candidates: records.iter().map(Person::summary).collect(),
        }))
    }

    /// The longer first name is canonical, the other becomes the preferred
    /// name. Returns the preferred name when the record's first name changed.
    fn canonicalize(&self, person: &mut Person, lookup_first: &str, profile_first: &str) -> Option<String> {
        let (lookup_len, profile_len) = (lookup_first.chars().count(), profile_first.chars().count());
        if profile_len > lookup_len {
            person.first_name = profile_first.to_string();
            person.preferred_name = lookup_first.to_string();
            if let Some(email) = build_email(
                &person.first_name,
                &person.middle_name,
                &person.last_name,
                &self.email_domain,
            ) {
                info!(target: TARGET_RECONCILE, "Set email address to {}", email);
                person.email = email;
            }
            Some(person.preferred_name.clone())
        } else {
            if lookup_len > profile_len {
                person.preferred_name = profile_first.to_string();
            }
            None
        }
    }
}

/// Room, mail stop and address come from the scrape unconditionally. A page
/// without any address lines leaves the stored address alone.
fn apply_scraped_fields(person: &mut Person, input: &ProfileInput) {
    person.room_number = input.room.clone();
    person.mail_stop = input.mail_stop.clone();

    let address = &input.address;
    if address.status == AddressStatus::Missing {
        return;
    }
    person.mail_address = address.mail_address.clone();
    person.mail_city = address.city.clone();
    person.mail_state = address.state.clone();
    person.mail_postal_code = address.postal_code.clone();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::parse_address;

    async fn store() -> Database {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.create_schema().await.unwrap();
        db
    }

    fn input(lookup: NameParts, profile: Option<NameParts>, email: Option<&str>) -> ProfileInput {
        ProfileInput {
            lookup_name: lookup,
            profile_name: profile,
            address: parse_address(&["2601 Meacham Blvd", "Fort Worth, TX 76177"]),
            room: "210".to_string(),
            mail_stop: "ASW-1".to_string(),
            email: email.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_same_name_single_candidate_updates() {
        let db = store().await;
        let id = db
            .insert_person(&Person::new("Jane", "", "Doe").with_email("jane.doe@faa.gov"))
            .await
            .unwrap();
        let reconciler = Reconciler::new(db.clone(), "faa.gov", true);

        let jane = NameParts::new("Jane", "", "Doe");
        let outcome = reconciler
            .reconcile(&input(jane.clone(), Some(jane), None))
            .await
            .unwrap();
        assert!(matches!(outcome, ItemOutcome::Updated { .. }));

        let stored = db.get_person(id).await.unwrap().unwrap();
        assert_eq!(stored.room_number, "210");
        assert_eq!(stored.mail_stop, "ASW-1");
        assert_eq!(stored.mail_address, "2601 Meacham Blvd");
        assert_eq!(stored.mail_city, "Fort Worth");
        assert_eq!(stored.mail_state, "TX");
        assert_eq!(stored.mail_postal_code, "76177");
        assert_eq!(stored.email, "jane.doe@faa.gov");
        assert_eq!(stored.preferred_name, "");
    }

    #[tokio::test]
    async fn test_longer_profile_name_is_canonical() {
        let db = store().await;
        let id = db
            .insert_person(&Person::new("Bob", "", "Smith").with_email("bob.smith@faa.gov"))
            .await
            .unwrap();
        let reconciler = Reconciler::new(db.clone(), "faa.gov", true);

        let outcome = reconciler
            .reconcile(&input(
                NameParts::new("Bob", "", "Smith"),
                Some(NameParts::new("Robert", "", "Smith")),
                None,
            ))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ItemOutcome::Canonicalized { ref preferred_name, .. } if preferred_name == "Bob"
        ));

        let stored = db.get_person(id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Robert");
        assert_eq!(stored.preferred_name, "Bob");
        assert_eq!(stored.email, "robert.smith@faa.gov");
    }

    #[tokio::test]
    async fn test_shorter_profile_name_keeps_record_name() {
        let db = store().await;
        let id = db
            .insert_person(&Person::new("Robert", "", "Smith").with_email("robert.smith@faa.gov"))
            .await
            .unwrap();
        let reconciler = Reconciler::new(db.clone(), "faa.gov", true);

        let outcome = reconciler
            .reconcile(&input(
                NameParts::new("Robert", "", "Smith"),
                Some(NameParts::new("Bob", "", "Smith")),
                None,
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, ItemOutcome::Updated { .. }));

        let stored = db.get_person(id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Robert");
        assert_eq!(stored.preferred_name, "Bob");
        assert_eq!(stored.email, "robert.smith@faa.gov");
    }

    #[tokio::test]
    async fn test_equal_length_names_change_nothing() {
        let db = store().await;
        let id = db
            .insert_person(&Person::new("Jon", "", "Lee").with_email("jon.lee@faa.gov"))
            .await
            .unwrap();
        let reconciler = Reconciler::new(db.clone(), "faa.gov", true);

        reconciler
            .reconcile(&input(
                NameParts::new("Jon", "", "Lee"),
                Some(NameParts::new("Ian", "", "Lee")),
                None,
            ))
            .await
            .unwrap();

        let stored = db.get_person(id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Jon");
        assert_eq!(stored.preferred_name, "");
        assert_eq!(stored.email, "jon.lee@faa.gov");
    }

    #[tokio::test]
    async fn test_profile_name_fallback() {
        let db = store().await;
        let id = db.insert_person(&Person::new("Robert", "J", "Smith")).await.unwrap();
        let reconciler = Reconciler::new(db.clone(), "faa.gov", true);

        let outcome = reconciler
            .reconcile(&input(
                NameParts::new("Bobby", "", "Smith"),
                Some(NameParts::new("Robert", "J", "Smith")),
                None,
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, ItemOutcome::Updated { ref person } if person.id == id));

        // The empty email is filled in from the record's own name.
        let stored = db.get_person(id).await.unwrap().unwrap();
        assert_eq!(stored.email, "robert.j.smith@faa.gov");
        assert_eq!(stored.first_name, "Robert");
    }

    #[tokio::test]
    async fn test_not_found_writes_nothing() {
        let db = store().await;
        let other = db
            .insert_person(&Person::new("Ann", "", "Lee").with_email("ann.lee@faa.gov"))
            .await
            .unwrap();
        let reconciler = Reconciler::new(db.clone(), "faa.gov", true);

        let outcome = reconciler
            .reconcile(&input(
                NameParts::new("Jane", "", "Doe"),
                Some(NameParts::new("Janet", "", "Doe")),
                Some("jane.doe@faa.gov"),
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, ItemOutcome::NotFound { .. }));

        let untouched = db.get_person(other).await.unwrap().unwrap();
        assert_eq!(untouched.room_number, "");
    }

    #[tokio::test]
    async fn test_email_owner_reported_when_name_unknown() {
        let db = store().await;
        let owner = db
            .insert_person(&Person::new("Janet", "", "Doe-Ray").with_email("jane.doe@faa.gov"))
            .await
            .unwrap();
        let reconciler = Reconciler::new(db.clone(), "faa.gov", true);

        let outcome = reconciler
            .reconcile(&input(NameParts::new("Jane", "", "Doe"), None, Some("jane.doe@faa.gov")))
            .await
            .unwrap();
        match outcome {
            ItemOutcome::PossibleNameUpdate { candidate, .. } => assert_eq!(candidate.id, owner),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(db.get_person(owner).await.unwrap().unwrap().room_number, "");
    }

    #[tokio::test]
    async fn test_ambiguous_candidates_are_listed() {
        let db = store().await;
        let a = db
            .insert_person(&Person::new("John", "", "Smith").with_email("john.smith@faa.gov"))
            .await
            .unwrap();
        let b = db
            .insert_person(&Person::new("John", "", "Smith").with_email("john.smith2@faa.gov"))
            .await
            .unwrap();
        let reconciler = Reconciler::new(db.clone(), "faa.gov", true);

        let outcome = reconciler
            .reconcile(&input(
                NameParts::new("John", "", "Smith"),
                None,
                Some("john.q.smith@faa.gov"),
            ))
            .await
            .unwrap();
        match outcome {
            ItemOutcome::PossibleEmailUpdate { candidates, .. } => {
                assert_eq!(candidates.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a, b]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        for id in [a, b] {
            assert_eq!(db.get_person(id).await.unwrap().unwrap().room_number, "");
        }
    }

    #[tokio::test]
    async fn test_ambiguous_resolved_by_email_or_policy() {
        let db = store().await;
        let a = db
            .insert_person(&Person::new("John", "", "Smith").with_email("john.smith@faa.gov"))
            .await
            .unwrap();
        let b = db
            .insert_person(&Person::new("John", "", "Smith").with_email("john.smith2@faa.gov"))
            .await
            .unwrap();
        let john = NameParts::new("John", "", "Smith");

        let reconciler = Reconciler::new(db.clone(), "faa.gov", true);
        let outcome = reconciler
            .reconcile(&input(john.clone(), None, Some("John.Smith2@FAA.gov")))
            .await
            .unwrap();
        assert!(matches!(outcome, ItemOutcome::Updated { ref person } if person.id == b));

        let outcome = reconciler.reconcile(&input(john.clone(), None, None)).await.unwrap();
        assert!(matches!(outcome, ItemOutcome::Updated { ref person } if person.id == a));

        let strict = Reconciler::new(db.clone(), "faa.gov", false);
        let outcome = strict.reconcile(&input(john, None, None)).await.unwrap();
        assert!(matches!(outcome, ItemOutcome::PossibleEmailUpdate { ref candidates, .. } if candidates.len() == 2));
    }

    #[tokio::test]
    async fn test_oversized_state_is_fatal() {
        let db = store().await;
        db.insert_person(&Person::new("Jane", "", "Doe")).await.unwrap();
        let reconciler = Reconciler::new(db, "faa.gov", true);

        let mut item = input(NameParts::new("Jane", "", "Doe"), None, None);
        item.address = parse_address(&["1 Main St", "Boston, Massachusetts Bay Colony 02101"]);
        assert!(matches!(
            reconciler.reconcile(&item).await,
            Err(StoreError::Constraint(_))
        ));
    }
}
