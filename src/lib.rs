//! `tool-job-config` is the configuration and data-extraction layer used by pluggable analysis
//! tools. For each job it loads the job's settings, decides per field whether the value is a
//! literal constant or a pointer into an uploaded data file, produces merged records ready for
//! computation, and writes the (possibly annotated) data back out as a result file.
//!
//! The primary entrypoint is [`job::Job`], which owns a [`manager::ConfigManager`] and removes
//! the job's uploaded files when it goes out of scope.
//!
//! ## Settings document
//!
//! The file registered under the `config` namespace holds a JSON document with an
//! `"analysis settings"` member:
//!
//! ```json
//! {
//!   "analysis settings": {
//!     "computation_params": { "raisetopower": { "type": "numeric", "value": 2 } },
//!     "computation": {
//!       "factor": { "value": 10 },
//!       "value":  { "type": "property", "value": "power" }
//!     }
//!   }
//! }
//! ```
//!
//! A field is **mapped** when it has a truthy `property` flag or `"type": "property"` and a
//! non-null `value`; the value is then the name of a per-feature property. Every other field is a
//! **constant** (`null` when it has no value).
//!
//! ## Quick example
//!
//! ```no_run
//! use tool_job_config::job::Job;
//! use tool_job_config::manager::JobOptions;
//! use tool_job_config::report::ResultData;
//! use tool_job_config::types::InputFiles;
//!
//! # fn main() -> Result<(), tool_job_config::ConfigError> {
//! let files = InputFiles::new()
//!     .with_path("config", "/tmp/job/config.json")
//!     .with_path("computation", "/tmp/job/data.geojson");
//! let mut job = Job::new(files, JobOptions::default());
//!
//! let params = job.get_parameters("computation_params")?;
//! let power = params.get_or("raisetopower", 2).as_f64().unwrap_or(2.0);
//!
//! let mut features = job.get_features("computation")?;
//! let mut cursor = features.cursor();
//! while let Some(record) = cursor.next_record() {
//!     if let Some(v) = record.get("value").and_then(|v| v.as_f64()) {
//!         cursor.add_result("result", v.powf(power))?;
//!     }
//! }
//!
//! let data = features.to_result_file("data")?;
//! println!("{} ({} bytes)", data.file_name, data.content.len());
//! # Ok(())
//! # } // files are removed when `job` drops
//! ```
//!
//! ## Modules
//!
//! - [`job`]: scoped job lifetime and uploaded-file cleanup
//! - [`manager`]: settings loading, per-namespace dispatch, failure accumulation
//! - [`features`]: record iteration, result annotation and JSON serialization
//! - [`elements`]: single-row parameter sets and CSV serialization
//! - [`report`]: result files and the status/result reporting interface
//! - [`observability`]: observer hooks for logging and alerts
//! - [`formats`]: JSON/CSV readers and writers
//! - [`types`]: descriptors, bindings, settings and the input file registry
//! - [`error`]: error types

pub mod elements;
pub mod error;
pub mod features;
pub mod formats;
pub mod job;
pub mod manager;
pub mod observability;
pub mod report;
pub mod types;

pub use error::{ConfigError, ConfigResult};
