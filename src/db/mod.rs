pub mod core;
mod person;
mod schema;

pub use self::core::Database;
pub use self::person::{Person, PersonSummary, MAX_STATE_LEN};
pub use self::schema::REQUIRED_COLUMNS;
