use tracing::{info, warn};

use super::core::Database;
use crate::error::StoreError;
use crate::TARGET_DB;

/// Columns the reconciliation reads or writes.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "first_name",
    "middle_name",
    "last_name",
    "preferred_name",
    "job_title",
    "office_phone",
    "office_fax",
    "email",
    "mail_address",
    "mail_address2",
    "mail_city",
    "mail_state",
    "mail_postal_code",
    "mail_country",
    "room_number",
    "mail_stop",
];

impl Database {
    /// Creates the `people` table when it is absent. Existing tables are left
    /// exactly as they are.
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS people (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL DEFAULT '',
                middle_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                preferred_name TEXT NOT NULL DEFAULT '',
                job_title TEXT NOT NULL DEFAULT '',
                office_phone TEXT NOT NULL DEFAULT '',
                office_fax TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                mail_address TEXT NOT NULL DEFAULT '',
                mail_address2 TEXT NOT NULL DEFAULT '',
                mail_city TEXT NOT NULL DEFAULT '',
                mail_state TEXT NOT NULL DEFAULT '',
                mail_postal_code TEXT NOT NULL DEFAULT '',
                mail_country TEXT NOT NULL DEFAULT '',
                room_number TEXT NOT NULL DEFAULT '',
                mail_stop TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_people_first_last ON people (first_name, last_name);
            CREATE INDEX IF NOT EXISTS idx_people_email ON people (email COLLATE NOCASE);
            "#,
        )
        .execute(&mut *conn)
        .await?;

        info!(target: TARGET_DB, "People schema initialized");
        Ok(())
    }

    /// Fails with `SchemaMismatch` when the `people` table lacks any required
    /// column (or does not exist at all).
    pub async fn verify_schema(&self) -> Result<(), StoreError> {
        let present: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('people')")
                .fetch_all(self.pool())
                .await?;

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !present.iter().any(|p| p.eq_ignore_ascii_case(column)))
            .map(|column| column.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            warn!(target: TARGET_DB, "Schema check failed, missing: {:?}", missing);
            Err(StoreError::SchemaMismatch { missing })
        }
    }
}
