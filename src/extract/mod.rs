//! Turning fetched profile pages into tables and fields.

mod address;
mod converter;
mod profile;
mod table;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

pub use self::address::{parse_address, AddressStatus, ParsedAddress};
pub use self::converter::{Converter, ExternalConverter};
pub use self::profile::{ProfileLayout, ScrapedProfile};
pub use self::table::{parse_tagged_table, ExtractedRow, ScrapedTable, BLANK_SENTINEL};

use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::TARGET_CONVERTER;

/// Writes a page to a scratch file, runs the converter on it and parses the
/// tagged result.
#[derive(Clone)]
pub struct Extractor {
    converter: Arc<dyn Converter>,
    work_dir: PathBuf,
}

impl Extractor {
    pub fn new(converter: Arc<dyn Converter>, work_dir: PathBuf) -> Self {
        Self { converter, work_dir }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(ExternalConverter::from_config(config)),
            config.work_dir.clone(),
        )
    }

    pub async fn extract(&self, html: &[u8]) -> Result<ScrapedTable, ExtractError> {
        let mut file = tempfile::Builder::new()
            .prefix("profile-")
            .suffix(".html")
            .tempfile_in(&self.work_dir)?;
        file.write_all(html)?;
        file.flush()?;
        debug!(target: TARGET_CONVERTER, "Wrote {} bytes to {}", html.len(), file.path().display());

        let converter = Arc::clone(&self.converter);
        // The temp file moves into the task so it outlives the conversion.
        let text = tokio::task::spawn_blocking(move || converter.convert(file.path()))
            .await
            .map_err(|err| ExtractError::Io(io::Error::other(err.to_string())))??;

        parse_tagged_table(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    struct Scripted {
        output: String,
        seen: Mutex<Vec<String>>,
    }

    impl Converter for Scripted {
        fn convert(&self, html_path: &Path) -> Result<String, ExtractError> {
            let html = std::fs::read_to_string(html_path)?;
            self.seen.lock().unwrap().push(html);
            Ok(self.output.clone())
        }
    }

    #[tokio::test]
    async fn test_extract_runs_converter_on_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Arc::new(Scripted {
            output: "[ROW:2]\n<COL:1>Jane Doe\n".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let extractor = Extractor::new(converter.clone(), dir.path().to_path_buf());

        let table = extractor.extract(b"<html>Jane</html>").await.unwrap();
        assert_eq!(table.cell(2, 0), Some("Jane Doe"));
        assert_eq!(converter.seen.lock().unwrap().as_slice(), ["<html>Jane</html>"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_untagged_output_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = Extractor::new(
            Arc::new(Scripted {
                output: "Service Unavailable".to_string(),
                seen: Mutex::new(Vec::new()),
            }),
            dir.path().to_path_buf(),
        );
        assert!(matches!(
            extractor.extract(b"<html></html>").await,
            Err(ExtractError::Malformed(_))
        ));
    }
}
