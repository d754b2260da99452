use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::ExtractError;
use crate::TARGET_CONVERTER;

/// Cell value the directory uses for an empty layout slot.
pub const BLANK_SENTINEL: &str = "/icons/ecblank.gif";

lazy_static! {
    static ref ROW_TAG: Regex = Regex::new(r"\[ROW:\s*(\d+)\s*\]").unwrap();
    static ref COL_TAG: Regex = Regex::new(r"<COL:\s*(\d+)\s*>").unwrap();
}

/// One table row. `columns` is positional (0-based); discarded cells leave an
/// empty string in their slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedRow {
    pub index: usize,
    pub columns: Vec<String>,
}

impl ExtractedRow {
    /// The cell at `column`, or `None` when it is absent or was discarded.
    pub fn column(&self, column: usize) -> Option<&str> {
        self.columns
            .get(column)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Rows in ascending index order. Indices need not be contiguous.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapedTable {
    pub rows: Vec<ExtractedRow>,
}

impl ScrapedTable {
    pub fn row(&self, index: usize) -> Option<&ExtractedRow> {
        self.rows
            .binary_search_by_key(&index, |row| row.index)
            .ok()
            .map(|pos| &self.rows[pos])
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.row(row).and_then(|r| r.column(column))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All kept cells, row by row.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .flat_map(|row| row.columns.iter())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Parses the converter's tagged text.
///
/// `[ROW:n]` opens row `n`; `<COL:k>text` sets 1-based column `k` of the
/// current row. Cells before the first row tag belong to row 0. Empty cells
/// and blank-placeholder cells are discarded, as are rows left without any
/// cell.
pub fn parse_tagged_table(text: &str) -> Result<ScrapedTable, ExtractError> {
    let mut rows: Vec<ExtractedRow> = Vec::new();
    let mut current_row = 0usize;
    let mut pairs_seen = 0usize;

    for line in text.lines() {
        if let Some(caps) = ROW_TAG.captures(line) {
            current_row = caps[1]
                .parse()
                .map_err(|_| ExtractError::Malformed(format!("bad row tag: {}", line)))?;
            continue;
        }

        let Some(caps) = COL_TAG.captures(line) else {
            continue;
        };
        let column: usize = caps[1]
            .parse()
            .map_err(|_| ExtractError::Malformed(format!("bad column tag: {}", line)))?;
        if column == 0 {
            return Err(ExtractError::Malformed(format!(
                "column tags are 1-based: {}",
                line
            )));
        }
        pairs_seen += 1;

        let tag_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let value = line[tag_end..].trim();
        if value.is_empty() || value.contains(BLANK_SENTINEL) {
            continue;
        }

        let pos = match rows.iter().position(|r| r.index == current_row) {
            Some(pos) => pos,
            None => {
                rows.push(ExtractedRow {
                    index: current_row,
                    columns: Vec::new(),
                });
                rows.len() - 1
            }
        };
        let row = &mut rows[pos];
        if row.columns.len() < column {
            row.columns.resize(column, String::new());
        }
        row.columns[column - 1] = value.to_string();
    }

    if pairs_seen == 0 {
        return Err(ExtractError::Malformed(
            "no row/column pairs found".to_string(),
        ));
    }

    rows.sort_by_key(|row| row.index);
    debug!(target: TARGET_CONVERTER, "Parsed {} rows from {} cells", rows.len(), pairs_seen);
    Ok(ScrapedTable { rows })
}
