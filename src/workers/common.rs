use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;

use crate::reconcile::{ItemOutcome, SkipReason};

/// Anything the pool can dispatch. The resume gate looks for the marker in
/// this text.
pub trait ResumeKey {
    fn resume_key(&self) -> &str;
}

impl ResumeKey for String {
    fn resume_key(&self) -> &str {
        self
    }
}

/// One line of profile work: `"Last, First; <token>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDescriptor {
    /// May be empty; the profile page carries its own name.
    pub display_name: String,
    pub token: String,
}

impl WorkDescriptor {
    pub fn parse_line(line: &str) -> Result<Self, SkipReason> {
        let (name, token) = line
            .split_once(';')
            .ok_or_else(|| SkipReason::BadWorkLine(format!("no ';' in '{}'", line)))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(SkipReason::BadWorkLine(format!("no profile token in '{}'", line)));
        }
        Ok(Self {
            display_name: name.trim().to_string(),
            token: token.to_string(),
        })
    }
}

/// A row of a header-less CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    pub fields: Vec<String>,
    line: String,
}

impl CsvRecord {
    pub fn new(fields: Vec<String>) -> Self {
        let line = fields.join(",");
        Self { fields, line }
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.trim())
    }
}

impl ResumeKey for CsvRecord {
    fn resume_key(&self) -> &str {
        &self.line
    }
}

/// Reads every record of a header-less CSV file; rows may differ in length.
pub fn read_csv_records(path: &Path) -> io::Result<Vec<CsvRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        records.push(CsvRecord::new(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        ));
    }
    Ok(records)
}

/// Per-run counters, one per outcome class.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// RFC 3339 start time of the run.
    pub started_at: String,
    pub dispatched: usize,
    pub passed_over: usize,
    pub updated: usize,
    pub canonicalized: usize,
    pub matched: usize,
    pub possible_name_updates: usize,
    pub possible_email_updates: usize,
    pub not_found: usize,
    pub skipped: usize,
    pub harvested: usize,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Updated { .. } => self.updated += 1,
            ItemOutcome::Canonicalized { .. } => self.canonicalized += 1,
            ItemOutcome::Matched { .. } => self.matched += 1,
            ItemOutcome::PossibleNameUpdate { .. } => self.possible_name_updates += 1,
            ItemOutcome::PossibleEmailUpdate { .. } => self.possible_email_updates += 1,
            ItemOutcome::NotFound { .. } => self.not_found += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Harvested { .. } => self.harvested += 1,
        }
    }

    /// Adds another worker's counters. Elapsed time is not summed.
    pub fn merge(&mut self, other: &RunSummary) {
        self.dispatched += other.dispatched;
        self.passed_over += other.passed_over;
        self.updated += other.updated;
        self.canonicalized += other.canonicalized;
        self.matched += other.matched;
        self.possible_name_updates += other.possible_name_updates;
        self.possible_email_updates += other.possible_email_updates;
        self.not_found += other.not_found;
        self.skipped += other.skipped;
        self.harvested += other.harvested;
    }

    /// Items that reached a decision, whatever it was.
    pub fn processed(&self) -> usize {
        self.updated
            + self.canonicalized
            + self.matched
            + self.possible_name_updates
            + self.possible_email_updates
            + self.not_found
            + self.skipped
            + self.harvested
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Started:                 {}", self.started_at)?;
        writeln!(f, "Dispatched:              {}", self.dispatched)?;
        writeln!(f, "Passed over (resume):    {}", self.passed_over)?;
        writeln!(f, "Updated:                 {}", self.updated)?;
        writeln!(f, "Canonicalized:           {}", self.canonicalized)?;
        writeln!(f, "Matched:                 {}", self.matched)?;
        writeln!(f, "Possible name updates:   {}", self.possible_name_updates)?;
        writeln!(f, "Possible email updates:  {}", self.possible_email_updates)?;
        writeln!(f, "Not found:               {}", self.not_found)?;
        writeln!(f, "Skipped:                 {}", self.skipped)?;
        writeln!(f, "Harvested prefixes:      {}", self.harvested)?;
        write!(f, "Elapsed time:            {:.1}s", self.elapsed_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_line() {
        let work = WorkDescriptor::parse_line(
            "Zuber, Jody; (LoadPerson)?OpenAgent&C20933A8A369FCFE85256EE400175DB2",
        )
        .unwrap();
        assert_eq!(work.display_name, "Zuber, Jody");
        assert_eq!(work.token, "(LoadPerson)?OpenAgent&C20933A8A369FCFE85256EE400175DB2");

        let nameless = WorkDescriptor::parse_line(" ; (LoadPerson)?OpenAgent&AB").unwrap();
        assert!(nameless.display_name.is_empty());

        assert!(WorkDescriptor::parse_line("Zuber, Jody").is_err());
        assert!(WorkDescriptor::parse_line("Zuber, Jody;  ").is_err());
    }

    #[test]
    fn test_read_csv_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\"Doe, Jane\",jane.doe@faa.gov").unwrap();
        writeln!(file, "\"Roe, Richard Q\",richard.roe@faa.gov,extra").unwrap();
        file.flush().unwrap();

        let records = read_csv_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field(0), Some("Doe, Jane"));
        assert_eq!(records[0].field(1), Some("jane.doe@faa.gov"));
        assert_eq!(records[1].fields.len(), 3);
        assert!(records[1].resume_key().contains("Roe, Richard Q"));
    }

    #[test]
    fn test_read_csv_records_tolerates_latin1() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\"Mu\xf1oz, Jose\",jose.munoz@faa.gov\n").unwrap();
        writeln!(file, "\"Doe, Jane\",jane.doe@faa.gov").unwrap();
        file.flush().unwrap();

        let records = read_csv_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field(0), Some("Mu\u{FFFD}oz, Jose"));
        assert_eq!(records[1].field(1), Some("jane.doe@faa.gov"));
    }

    #[test]
    fn test_summary_counts() {
        let mut first = RunSummary::default();
        first.record(&ItemOutcome::skipped("x", SkipReason::Fetch("down".into())));
        first.record(&ItemOutcome::Harvested {
            prefix: "aa".into(),
            lines: 3,
        });
        let mut second = RunSummary {
            dispatched: 2,
            ..RunSummary::default()
        };
        second.merge(&first);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.harvested, 1);
        assert_eq!(second.processed(), 2);
        assert_eq!(second.dispatched, 2);
    }
}
