//! The external HTML-to-table converter.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::TARGET_CONVERTER;

/// Turns one HTML file into row/column tagged text.
///
/// Implementations block; callers run them off the async runtime.
pub trait Converter: Send + Sync {
    fn convert(&self, html_path: &Path) -> Result<String, ExtractError>;
}

/// Runs `program args... <html_path>` and reads the tagged text it leaves in
/// `<html_path stem>.txt` next to the input.
#[derive(Debug, Clone)]
pub struct ExternalConverter {
    program: String,
    args: Vec<String>,
}

impl ExternalConverter {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.converter_program, config.converter_args.clone())
    }

    pub fn output_path(html_path: &Path) -> PathBuf {
        html_path.with_extension("txt")
    }
}

impl Converter for ExternalConverter {
    fn convert(&self, html_path: &Path) -> Result<String, ExtractError> {
        debug!(target: TARGET_CONVERTER, "Running {} on {}", self.program, html_path.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(html_path)
            .output()
            .map_err(|err| ExtractError::ConverterSpawn {
                program: self.program.clone(),
                reason: err.to_string(),
            })?;

        let text_path = Self::output_path(html_path);
        if !output.status.success() {
            let _ = fs::remove_file(&text_path);
            return Err(ExtractError::ConverterFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = fs::read(&text_path);
        if let Err(err) = fs::remove_file(&text_path) {
            warn!(target: TARGET_CONVERTER, "Could not remove {}: {}", text_path.display(), err);
        }
        Ok(String::from_utf8_lossy(&bytes?).into_owned())
    }
}
