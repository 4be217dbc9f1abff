//! Scoped job lifetime with guaranteed removal of uploaded files.
//!
//! A [`Job`] owns the job's [`ConfigManager`]. When the job is closed, explicitly through
//! [`Job::close`] or implicitly when it is dropped (including while unwinding from a panic),
//! every file in the uploaded-file registry is deleted. Deletion is best effort: failures are
//! reported to the observer (or to the [`log`] facade when no observer is set) and returned in
//! the [`CleanupReport`], never raised.
//!
//! ```no_run
//! use tool_job_config::job::Job;
//! use tool_job_config::manager::JobOptions;
//! use tool_job_config::types::InputFiles;
//!
//! # fn main() -> Result<(), tool_job_config::ConfigError> {
//! let files = InputFiles::new()
//!     .with_path("config", "/tmp/job-42/config.json")
//!     .with_path("computation", "/tmp/job-42/data.geojson");
//!
//! let rows = Job::scope(files, JobOptions::default(), |cfg| -> Result<usize, tool_job_config::ConfigError> {
//!     let features = cfg.get_features("computation")?;
//!     Ok(features.feature_count())
//! })?;
//! println!("rows={rows}");
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;

use serde_json::Value;

use crate::error::ConfigResult;
use crate::manager::{ConfigManager, JobOptions};
use crate::types::InputFiles;

/// Outcome of removing a job's uploaded files.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Paths that were deleted.
    pub removed: Vec<PathBuf>,
    /// Paths that could not be deleted, with the reason.
    pub failed: Vec<(PathBuf, io::Error)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "removed={}, failed={}", self.removed.len(), self.failed.len())
    }
}

/// One job invocation. Dereferences to its [`ConfigManager`].
#[derive(Debug)]
pub struct Job {
    manager: ConfigManager,
    released: bool,
}

impl Job {
    pub fn new(files: InputFiles, options: JobOptions) -> Self {
        Self {
            manager: ConfigManager::new(files, options),
            released: false,
        }
    }

    /// Create a job from the platform's uploaded-file registry (see [`InputFiles::from_json`]).
    pub fn from_json(files: &Value, options: JobOptions) -> ConfigResult<Self> {
        Ok(Self::new(InputFiles::from_json(files)?, options))
    }

    /// Run `f` against a fresh job and close it afterwards, whatever `f` returns or if it panics.
    pub fn scope<R>(files: InputFiles, options: JobOptions, f: impl FnOnce(&mut ConfigManager) -> R) -> R {
        let mut job = Self::new(files, options);
        f(&mut job.manager)
    }

    pub fn manager(&mut self) -> &mut ConfigManager {
        &mut self.manager
    }

    /// Close the job now and report what was removed.
    pub fn close(mut self) -> CleanupReport {
        self.release()
    }

    fn release(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        if self.released {
            return report;
        }
        self.released = true;

        let observer = self.manager.options().observer.clone();
        let mut seen = HashSet::new();
        for path in self.manager.files().paths() {
            if !seen.insert(path.to_path_buf()) {
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => {
                    if let Some(obs) = &observer {
                        obs.on_cleanup(path, None);
                    }
                    report.removed.push(path.to_path_buf());
                }
                Err(e) => {
                    match &observer {
                        Some(obs) => obs.on_cleanup(path, Some(&e)),
                        None => log::warn!("failed to remove {}: {e}", path.display()),
                    }
                    report.failed.push((path.to_path_buf(), e));
                }
            }
        }
        report
    }
}

impl Deref for Job {
    type Target = ConfigManager;

    fn deref(&self) -> &ConfigManager {
        &self.manager
    }
}

impl DerefMut for Job {
    fn deref_mut(&mut self) -> &mut ConfigManager {
        &mut self.manager
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
