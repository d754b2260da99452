use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument};

use super::core::Database;
use crate::error::StoreError;
use crate::TARGET_DB;

/// Longest state value the store accepts.
pub const MAX_STATE_LEN: usize = 10;

const PERSON_COLUMNS: &str = "id, first_name, middle_name, last_name, preferred_name, job_title, \
    office_phone, office_fax, email, mail_address, mail_address2, mail_city, mail_state, \
    mail_postal_code, mail_country, room_number, mail_stop";

/// One persisted identity record. `id == 0` means "not persisted".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub preferred_name: String,
    pub job_title: String,
    pub office_phone: String,
    pub office_fax: String,
    pub email: String,
    pub mail_address: String,
    pub mail_address2: String,
    pub mail_city: String,
    pub mail_state: String,
    pub mail_postal_code: String,
    pub mail_country: String,
    pub room_number: String,
    pub mail_stop: String,
}

impl Person {
    pub fn new(first: &str, middle: &str, last: &str) -> Self {
        Person {
            first_name: first.to_string(),
            middle_name: middle.to_string(),
            last_name: last.to_string(),
            ..Person::default()
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// "First Middle Last", skipping an empty middle name.
    pub fn full_name(&self) -> String {
        if self.middle_name.is_empty() {
            format!("{} {}", self.first_name, self.last_name)
        } else {
            format!("{} {} {}", self.first_name, self.middle_name, self.last_name)
        }
    }

    pub fn summary(&self) -> PersonSummary {
        PersonSummary {
            id: self.id,
            name: self.full_name(),
            email: self.email.clone(),
        }
    }
}

/// Identity listed in conflict reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl fmt::Display for PersonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={}, {})", self.name, self.id, self.email)
    }
}

impl Database {
    /// Tier-1 lookup: exact (first, middle, last).
    #[instrument(target = "db_query", level = "debug", skip(self))]
    pub async fn find_by_full_name(
        &self,
        first: &str,
        middle: &str,
        last: &str,
    ) -> Result<Vec<Person>, StoreError> {
        let query = format!(
            "SELECT {} FROM people WHERE first_name = ?1 AND middle_name = ?2 AND last_name = ?3 ORDER BY id",
            PERSON_COLUMNS
        );
        let people = sqlx::query_as::<_, Person>(&query)
            .bind(first)
            .bind(middle)
            .bind(last)
            .fetch_all(self.pool())
            .await?;
        debug!(target: TARGET_DB, "{} rows for {} {} {}", people.len(), first, middle, last);
        Ok(people)
    }

    /// Tier-2 lookup: (first, last) regardless of middle name.
    #[instrument(target = "db_query", level = "debug", skip(self))]
    pub async fn find_by_first_last(
        &self,
        first: &str,
        last: &str,
    ) -> Result<Vec<Person>, StoreError> {
        let query = format!(
            "SELECT {} FROM people WHERE first_name = ?1 AND last_name = ?2 ORDER BY id",
            PERSON_COLUMNS
        );
        let people = sqlx::query_as::<_, Person>(&query)
            .bind(first)
            .bind(last)
            .fetch_all(self.pool())
            .await?;
        debug!(target: TARGET_DB, "{} rows for {} {}", people.len(), first, last);
        Ok(people)
    }

    /// Case-insensitive email lookup. Returns the lowest id when several
    /// records share an address.
    #[instrument(target = "db_query", level = "debug", skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Person>, StoreError> {
        if email.trim().is_empty() {
            return Ok(None);
        }
        let query = format!(
            "SELECT {} FROM people WHERE email = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
            PERSON_COLUMNS
        );
        let person = sqlx::query_as::<_, Person>(&query)
            .bind(email.trim())
            .fetch_optional(self.pool())
            .await?;
        Ok(person)
    }

    /// Writes every mutable field of `person` back to its row.
    #[instrument(target = "db_query", level = "debug", skip(self, person), fields(id = person.id))]
    pub async fn update_person(&self, person: &Person) -> Result<(), StoreError> {
        if person.id == 0 {
            return Err(StoreError::Constraint(format!(
                "cannot update unpersisted record for {}",
                person.full_name()
            )));
        }
        if person.mail_state.chars().count() > MAX_STATE_LEN {
            return Err(StoreError::Constraint(format!(
                "mail_state '{}' for id {} exceeds {} characters",
                person.mail_state, person.id, MAX_STATE_LEN
            )));
        }

        let rows_affected = sqlx::query(
            r#"
            UPDATE people SET
                first_name = ?1, last_name = ?2, middle_name = ?3, preferred_name = ?4,
                job_title = ?5, office_phone = ?6, office_fax = ?7, email = ?8,
                mail_address = ?9, mail_address2 = ?10, mail_city = ?11, mail_state = ?12,
                mail_postal_code = ?13, mail_country = ?14, room_number = ?15, mail_stop = ?16
            WHERE id = ?17
            "#,
        )
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(&person.middle_name)
        .bind(&person.preferred_name)
        .bind(&person.job_title)
        .bind(&person.office_phone)
        .bind(&person.office_fax)
        .bind(&person.email)
        .bind(&person.mail_address)
        .bind(&person.mail_address2)
        .bind(&person.mail_city)
        .bind(&person.mail_state)
        .bind(&person.mail_postal_code)
        .bind(&person.mail_country)
        .bind(&person.room_number)
        .bind(&person.mail_stop)
        .bind(person.id)
        .execute(self.pool())
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::Constraint(format!(
                "no person with id {}",
                person.id
            )));
        }

        debug!(target: TARGET_DB, "Updated person {} ({})", person.id, person.full_name());
        Ok(())
    }

    /// Inserts a new record and returns its id. The `id` field of `person` is
    /// ignored.
    pub async fn insert_person(&self, person: &Person) -> Result<i64, StoreError> {
        let id = sqlx::query(
            r#"
            INSERT INTO people (
                first_name, last_name, middle_name, preferred_name, job_title, office_phone,
                office_fax, email, mail_address, mail_address2, mail_city, mail_state,
                mail_postal_code, mail_country, room_number, mail_stop
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(&person.middle_name)
        .bind(&person.preferred_name)
        .bind(&person.job_title)
        .bind(&person.office_phone)
        .bind(&person.office_fax)
        .bind(&person.email)
        .bind(&person.mail_address)
        .bind(&person.mail_address2)
        .bind(&person.mail_city)
        .bind(&person.mail_state)
        .bind(&person.mail_postal_code)
        .bind(&person.mail_country)
        .bind(&person.room_number)
        .bind(&person.mail_stop)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn get_person(&self, id: i64) -> Result<Option<Person>, StoreError> {
        let query = format!("SELECT {} FROM people WHERE id = ?1", PERSON_COLUMNS);
        let person = sqlx::query_as::<_, Person>(&query)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(person)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> Database {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.create_schema().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_lookups() {
        let db = store().await;
        let jane_q = db
            .insert_person(&Person::new("Jane", "Q", "Doe").with_email("jane.q.doe@faa.gov"))
            .await
            .unwrap();
        let jane = db
            .insert_person(&Person::new("Jane", "", "Doe").with_email("jane.doe@faa.gov"))
            .await
            .unwrap();

        let exact = db.find_by_full_name("Jane", "Q", "Doe").await.unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, jane_q);

        let pair = db.find_by_first_last("Jane", "Doe").await.unwrap();
        assert_eq!(pair.iter().map(|p| p.id).collect::<Vec<_>>(), vec![jane_q, jane]);

        let by_email = db.find_by_email("JANE.DOE@FAA.GOV").await.unwrap();
        assert_eq!(by_email.map(|p| p.id), Some(jane));

        assert!(db.find_by_email("").await.unwrap().is_none());
        assert!(db.find_by_first_last("John", "Doe").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_persists_all_fields() {
        let db = store().await;
        let id = db.insert_person(&Person::new("Bob", "", "Smith")).await.unwrap();

        let mut person = db.get_person(id).await.unwrap().unwrap();
        person.first_name = "Robert".to_string();
        person.preferred_name = "Bob".to_string();
        person.room_number = "210".to_string();
        person.mail_stop = "AJR-1".to_string();
        person.mail_city = "Fort Worth".to_string();
        person.mail_state = "TX".to_string();
        db.update_person(&person).await.unwrap();

        let stored = db.get_person(id).await.unwrap().unwrap();
        assert_eq!(stored, person);
    }

    #[tokio::test]
    async fn test_update_constraints() {
        let db = store().await;

        let unsaved = Person::new("Ann", "", "Lee");
        assert!(matches!(
            db.update_person(&unsaved).await,
            Err(StoreError::Constraint(_))
        ));

        let id = db.insert_person(&Person::new("Ann", "", "Lee")).await.unwrap();
        let mut person = db.get_person(id).await.unwrap().unwrap();
        person.mail_state = "Massachusetts".to_string();
        assert!(matches!(
            db.update_person(&person).await,
            Err(StoreError::Constraint(_))
        ));

        let ghost = Person {
            id: id + 100,
            ..Person::new("Ghost", "", "Record")
        };
        assert!(matches!(
            db.update_person(&ghost).await,
            Err(StoreError::Constraint(_))
        ));
    }

    #[test]
    fn test_full_name_and_summary() {
        let person = Person {
            id: 7,
            ..Person::new("Jane", "Q", "Doe").with_email("jane.q.doe@faa.gov")
        };
        assert_eq!(person.full_name(), "Jane Q Doe");
        assert_eq!(
            person.summary().to_string(),
            "Jane Q Doe (id=7, jane.q.doe@faa.gov)"
        );
        assert_eq!(Person::new("Jane", "", "Doe").full_name(), "Jane Doe");
    }
}
