use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::table::ScrapedTable;
use crate::error::ExtractError;

lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"[A-Za-z0-9._%+'-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
}

/// Where a directory profile page puts each field, as (row, 0-based column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLayout {
    pub name: (usize, usize),
    /// Rows that may hold address lines, inclusive.
    pub address_rows: (usize, usize),
    pub address_column: usize,
    pub room: (usize, usize),
    pub mail_stop: (usize, usize),
    /// Tables with fewer rows than this are not profiles.
    pub min_rows: usize,
}

impl Default for ProfileLayout {
    fn default() -> Self {
        Self {
            name: (2, 0),
            address_rows: (14, 17),
            address_column: 3,
            room: (18, 3),
            mail_stop: (19, 3),
            min_rows: 3,
        }
    }
}

/// The fields of one profile page, before any name or address parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapedProfile {
    /// The name printed on the profile itself; empty when absent.
    pub name: String,
    pub address_lines: Vec<String>,
    pub room: String,
    pub mail_stop: String,
    pub email: Option<String>,
}

impl ProfileLayout {
    pub fn read(&self, table: &ScrapedTable) -> Result<ScrapedProfile, ExtractError> {
        if table.len() < self.min_rows {
            return Err(ExtractError::Incomplete { rows: table.len() });
        }

        let cell = |(row, column): (usize, usize)| {
            table
                .cell(row, column)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let (first_row, last_row) = self.address_rows;
        let address_lines = (first_row..=last_row)
            .filter_map(|row| table.cell(row, self.address_column))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();

        let email = table
            .cells()
            .find_map(|value| EMAIL_PATTERN.find(value))
            .map(|m| m.as_str().to_lowercase());

        Ok(ScrapedProfile {
            name: cell(self.name),
            address_lines,
            room: cell(self.room),
            mail_stop: cell(self.mail_stop),
            email,
        })
    }
}
