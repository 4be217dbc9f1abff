//! Observer hooks for job events.
//!
//! There is no global logger: a [`JobObserver`] handle is passed in through
//! [`crate::manager::JobOptions`] and called by the [`crate::manager::ConfigManager`] and
//! [`crate::job::Job`] that own it.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ConfigError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

impl JobSeverity {
    /// Severity assigned to an error when it is reported.
    pub fn for_error(e: &ConfigError) -> Self {
        match e {
            ConfigError::Io(_) => Self::Critical,
            ConfigError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => Self::Critical,
                _ => Self::Error,
            },
            ConfigError::MissingData { .. } => Self::Warning,
            ConfigError::ConfigLoad { .. }
            | ConfigError::DataLoad { .. }
            | ConfigError::AnnotationState { .. }
            | ConfigError::UnknownNamespace { .. }
            | ConfigError::Json(_) => Self::Error,
        }
    }
}

/// What an event is about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobContext {
    /// Namespace involved, if any.
    pub namespace: Option<String>,
    /// File involved, if any.
    pub path: Option<PathBuf>,
}

impl JobContext {
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }
}

impl fmt::Display for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "namespace={}", self.namespace.as_deref().unwrap_or("-"))?;
        match &self.path {
            Some(p) => write!(f, " path={}", p.display()),
            None => Ok(()),
        }
    }
}

/// Minimal stats reported after a document is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Number of features (or namespaces, for the settings document).
    pub features: usize,
}

/// Observer interface for job events.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait JobObserver: Send + Sync {
    /// Called when a configuration or data document is loaded.
    fn on_loaded(&self, _ctx: &JobContext, _stats: LoadStats) {}

    /// Called for non-fatal conditions.
    fn on_warning(&self, _ctx: &JobContext, _message: &str) {}

    /// Called for every failure recorded by the manager.
    fn on_failure(&self, _ctx: &JobContext, _severity: JobSeverity, _error: &ConfigError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &JobContext, severity: JobSeverity, error: &ConfigError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called once per uploaded file removed at job close. `error` is set if removal failed.
    fn on_cleanup(&self, _path: &Path, _error: Option<&io::Error>) {}
}

/// Relays every job event to each wrapped observer, in registration order.
///
/// Lets one job feed, say, a [`LogObserver`] and a [`FileObserver`] at once.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn JobObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn JobObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeObserver({} observers)", self.observers.len())
    }
}

impl JobObserver for CompositeObserver {
    fn on_loaded(&self, ctx: &JobContext, stats: LoadStats) {
        for o in &self.observers {
            o.on_loaded(ctx, stats);
        }
    }

    fn on_warning(&self, ctx: &JobContext, message: &str) {
        for o in &self.observers {
            o.on_warning(ctx, message);
        }
    }

    fn on_failure(&self, ctx: &JobContext, severity: JobSeverity, error: &ConfigError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &JobContext, severity: JobSeverity, error: &ConfigError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_cleanup(&self, path: &Path, error: Option<&io::Error>) {
        for o in &self.observers {
            o.on_cleanup(path, error);
        }
    }
}

/// Logs job events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl JobObserver for StdErrObserver {
    fn on_loaded(&self, ctx: &JobContext, stats: LoadStats) {
        eprintln!("[job][ok] {ctx} features={}", stats.features);
    }

    fn on_warning(&self, ctx: &JobContext, message: &str) {
        eprintln!("[job][Warning] {ctx} {message}");
    }

    fn on_failure(&self, ctx: &JobContext, severity: JobSeverity, error: &ConfigError) {
        eprintln!("[job][{severity:?}] {ctx} err={error}");
    }

    fn on_alert(&self, ctx: &JobContext, severity: JobSeverity, error: &ConfigError) {
        eprintln!("[ALERT][job][{severity:?}] {ctx} err={error}");
    }

    fn on_cleanup(&self, path: &Path, error: Option<&io::Error>) {
        match error {
            None => eprintln!("[job][cleanup] removed {}", path.display()),
            Some(e) => eprintln!("[job][cleanup] failed to remove {}: {e}", path.display()),
        }
    }
}

/// Forwards job events to the [`log`] facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl JobObserver for LogObserver {
    fn on_loaded(&self, ctx: &JobContext, stats: LoadStats) {
        log::debug!("loaded {ctx} features={}", stats.features);
    }

    fn on_warning(&self, ctx: &JobContext, message: &str) {
        log::warn!("{ctx} {message}");
    }

    fn on_failure(&self, ctx: &JobContext, severity: JobSeverity, error: &ConfigError) {
        match severity {
            JobSeverity::Info => log::info!("{ctx} {error}"),
            JobSeverity::Warning => log::warn!("{ctx} {error}"),
            JobSeverity::Error | JobSeverity::Critical => log::error!("{ctx} {error}"),
        }
    }

    fn on_alert(&self, ctx: &JobContext, severity: JobSeverity, error: &ConfigError) {
        log::error!("ALERT [{severity:?}] {ctx} {error}");
    }

    fn on_cleanup(&self, path: &Path, error: Option<&io::Error>) {
        match error {
            None => log::trace!("removed {}", path.display()),
            Some(e) => log::warn!("failed to remove {}: {e}", path.display()),
        }
    }
}

/// Keeps a job audit trail: one `<epoch seconds> <event> ...` line per event in a text file.
///
/// The file is opened for every event, so several jobs may share one trail. An audit line that
/// cannot be written is dropped; it never fails the job.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn record(&self, event: fmt::Arguments<'_>) {
        let _guard = self.lock.lock().ok();
        let Ok(mut trail) = OpenOptions::new().create(true).append(true).open(&self.path) else {
            return;
        };
        let _ = writeln!(trail, "{} {event}", epoch_secs());
    }
}

impl JobObserver for FileObserver {
    fn on_loaded(&self, ctx: &JobContext, stats: LoadStats) {
        self.record(format_args!("ok {ctx} features={}", stats.features));
    }

    fn on_warning(&self, ctx: &JobContext, message: &str) {
        self.record(format_args!("warn {ctx} msg={message}"));
    }

    fn on_failure(&self, ctx: &JobContext, severity: JobSeverity, error: &ConfigError) {
        self.record(format_args!("fail severity={severity:?} {ctx} err={error}"));
    }

    fn on_alert(&self, ctx: &JobContext, severity: JobSeverity, error: &ConfigError) {
        self.record(format_args!("ALERT severity={severity:?} {ctx} err={error}"));
    }

    fn on_cleanup(&self, path: &Path, error: Option<&io::Error>) {
        match error {
            None => self.record(format_args!("cleanup removed={}", path.display())),
            Some(e) => self.record(format_args!("cleanup failed={} err={e}", path.display())),
        }
    }
}

/// Timestamp prefix for audit-trail lines.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
