//! Result files and the status/result reporting interface.
//!
//! The engine does not talk to the controlling server itself. Callers hand a
//! [`ResultReporter`] implementation to [`crate::manager::ConfigManager::report`], which decides
//! between a failure report (every accumulated message, no files) and a success report.

use std::fmt;

use serde_json::Value;

use crate::error::ConfigResult;
use crate::formats::{OutputFormat, csv};

/// Data that can be written back as a result file.
pub trait ResultData {
    /// Wire format of [`Self::serialize`].
    fn format(&self) -> OutputFormat;

    /// Whether the data is consumed by iterating records.
    fn is_iterable(&self) -> bool;

    /// Encode the data in [`Self::format`].
    fn serialize(&self) -> ConfigResult<String>;

    /// Serialize into a named [`ResultFile`] (`<name>.<extension>`).
    fn to_result_file(&self, name: &str) -> ConfigResult<ResultFile> {
        let format = self.format();
        Ok(ResultFile {
            name: name.to_string(),
            file_name: format!("{name}.{}", format.extension()),
            content: self.serialize()?,
            content_type: format.content_type().to_string(),
        })
    }
}

/// One named result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    /// Key the file is reported under (e.g. `data`, `summary`).
    pub name: String,
    /// File name including extension.
    pub file_name: String,
    /// Encoded file body.
    pub content: String,
    /// MIME content type.
    pub content_type: String,
}

/// Final outcome of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job failed; `errors` is the complete, ordered failure list.
    Failure { errors: Vec<String> },
    /// The job succeeded.
    Success {
        /// Name of the file holding the primary result, if any.
        result_file: Option<String>,
        files: Vec<ResultFile>,
    },
}

/// Sink for job status updates and the final outcome.
pub trait ResultReporter {
    /// Report an intermediate, human-readable status message.
    fn update_status(&self, message: &str);

    /// Report the final outcome.
    fn update_results(&self, outcome: JobOutcome);
}

/// Two-column ("Description", "Value") table summarizing the parameters a job ran with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSummary {
    rows: Vec<(String, String)>,
}

impl ParameterSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a labelled section.
    pub fn section(&mut self, name: &str) -> &mut Self {
        self.rows.push(("Section".to_string(), name.to_string()));
        self
    }

    /// Add a parameter row, labelled `Parameter-<section>-<key>`.
    pub fn parameter(&mut self, section: &str, key: &str, value: &Value) -> &mut Self {
        self.rows
            .push((format!("Parameter-{section}-{key}"), csv::cell_text(value)));
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for ParameterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParameterSummary(rows={})", self.rows.len())
    }
}

impl ResultData for ParameterSummary {
    fn format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn is_iterable(&self) -> bool {
        false
    }

    fn serialize(&self) -> ConfigResult<String> {
        csv::write_rows(
            &["Description", "Value"],
            self.rows.iter().map(|(d, v)| [d.as_str(), v.as_str()]),
        )
    }
}
