//! Job configuration manager.
//!
//! [`ConfigManager`] owns the uploaded-file registry and the job's settings, loads the settings
//! lazily, hands out per-namespace [`ElementSet`]s and [`FeatureSet`]s, and accumulates every
//! failure message encountered along the way. [`ConfigManager::is_valid`] is the single signal
//! that a job may proceed to computation.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::elements::ElementSet;
use crate::error::{ConfigError, ConfigResult};
use crate::features::FeatureSet;
use crate::formats::json::read_json_from_path;
use crate::observability::{JobContext, JobObserver, JobSeverity, LoadStats};
use crate::report::{JobOutcome, ResultFile, ResultReporter};
use crate::types::{InputFiles, Namespace, ToolConfiguration};

/// Options controlling how a job's configuration is located and reported.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct JobOptions {
    /// Namespace whose uploaded file holds the job configuration document.
    pub config_namespace: String,
    /// Key of the settings sub-document inside the configuration document.
    pub settings_key: String,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn JobObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: JobSeverity,
}

impl fmt::Debug for JobOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobOptions")
            .field("config_namespace", &self.config_namespace)
            .field("settings_key", &self.settings_key)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            config_namespace: "config".to_string(),
            settings_key: "analysis settings".to_string(),
            observer: None,
            alert_at_or_above: JobSeverity::Critical,
        }
    }
}

/// Single source of truth for one job's configuration and failure state.
pub struct ConfigManager {
    files: InputFiles,
    options: JobOptions,
    settings: Option<ToolConfiguration>,
    failures: Vec<String>,
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("files", &self.files.len())
            .field("options", &self.options)
            .field("loaded", &self.settings.is_some())
            .field("failures", &self.failures)
            .finish()
    }
}

impl ConfigManager {
    pub fn new(files: InputFiles, options: JobOptions) -> Self {
        Self {
            files,
            options,
            settings: None,
            failures: Vec::new(),
        }
    }

    /// Uploaded-file registry.
    pub fn files(&self) -> &InputFiles {
        &self.files
    }

    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Path of the data file registered for `namespace`.
    pub fn datafile(&self, namespace: &str) -> Option<&Path> {
        self.files.path(namespace)
    }

    /// Load the settings document, once.
    ///
    /// Reads the file registered under [`JobOptions::config_namespace`] and extracts the mapping
    /// under [`JobOptions::settings_key`]. On failure, the message is recorded and the next call
    /// tries again (and records again).
    pub fn load(&mut self) -> ConfigResult<&ToolConfiguration> {
        match self.settings {
            Some(ref cfg) => Ok(cfg),
            None => {
                let cfg = self.load_settings()?;
                Ok(&*self.settings.insert(cfg))
            }
        }
    }

    fn load_settings(&mut self) -> ConfigResult<ToolConfiguration> {
        let config_ns = self.options.config_namespace.clone();
        let ctx = JobContext::namespace(config_ns.as_str());
        let parsed = self
            .load_json(&config_ns)
            .map_err(|e| ConfigError::ConfigLoad {
                message: format!("JSON load of posted job configuration failed: {e}"),
            })
            .and_then(|doc| self.extract_settings(&doc));
        match parsed {
            Ok(cfg) => {
                let stats = LoadStats {
                    features: cfg.namespace_names().count(),
                };
                self.notify_loaded(&ctx, stats);
                Ok(cfg)
            }
            Err(e) => {
                self.record(&ctx, &e);
                Err(e)
            }
        }
    }

    fn extract_settings(&self, doc: &Value) -> ConfigResult<ToolConfiguration> {
        let key = &self.options.settings_key;
        let settings = doc
            .get(key)
            .ok_or_else(|| ConfigError::ConfigLoad {
                message: format!("No analysis settings: key '{key}' is missing"),
            })?
            .as_object()
            .ok_or_else(|| ConfigError::ConfigLoad {
                message: format!("No analysis settings: '{key}' is not a mapping"),
            })?;
        if settings.is_empty() {
            return Err(ConfigError::ConfigLoad {
                message: format!("No analysis settings: '{key}' is empty"),
            });
        }
        ToolConfiguration::from_settings(settings)
    }

    /// Read and parse the JSON file registered for `namespace`.
    pub fn load_json(&mut self, namespace: &str) -> ConfigResult<Value> {
        let mut ctx = JobContext::namespace(namespace);
        let result = match self.files.path(namespace) {
            None => Err(ConfigError::DataLoad {
                namespace: namespace.to_string(),
                message: "no file registered".to_string(),
            }),
            Some(path) => {
                ctx = ctx.with_path(path);
                read_json_from_path(path).map_err(|e| ConfigError::DataLoad {
                    namespace: namespace.to_string(),
                    message: format!("{} ({})", e, path.display()),
                })
            }
        };
        if let Err(e) = &result {
            self.record(&ctx, e);
        }
        result
    }

    /// The namespace's raw field values as a single-row [`ElementSet`].
    ///
    /// Mapped fields contribute the *name* of their source property; the data file is not read.
    pub fn get_parameters(&mut self, namespace: &str) -> ConfigResult<ElementSet> {
        let ns = self.namespace(namespace)?;
        Ok(ElementSet::new(ns.raw_values()))
    }

    /// The namespace's [`FeatureSet`], backed by its registered data file if there is one.
    ///
    /// A namespace with mapped fields and no data file produces an empty set and a warning, not
    /// a failure; use [`FeatureSet::require_data`] when at least one record is needed.
    pub fn get_features(&mut self, namespace: &str) -> ConfigResult<FeatureSet> {
        let bindings = self.namespace(namespace)?.bindings();
        let path = self.files.path(namespace).map(Path::to_path_buf);
        let mut ctx = JobContext::namespace(namespace);
        if let Some(p) = &path {
            ctx = ctx.with_path(p);
        }

        match FeatureSet::open(namespace, bindings, path.as_deref()) {
            Ok(set) => {
                if set.has_data() {
                    self.notify_loaded(
                        &ctx,
                        LoadStats {
                            features: set.feature_count(),
                        },
                    );
                } else if let Some(obs) = &self.options.observer {
                    obs.on_warning(&ctx, "mapped fields declared but no data file provided; no records");
                }
                Ok(set)
            }
            Err(e) => {
                self.record(&ctx, &e);
                Err(e)
            }
        }
    }

    fn namespace(&mut self, namespace: &str) -> ConfigResult<Namespace> {
        let found = self.load()?.namespace(namespace).cloned();
        found.ok_or_else(|| {
            let e = ConfigError::UnknownNamespace {
                namespace: namespace.to_string(),
            };
            self.record(&JobContext::namespace(namespace), &e);
            e
        })
    }

    /// Names of the configured namespaces (loads the settings if needed).
    pub fn namespaces(&mut self) -> ConfigResult<Vec<String>> {
        Ok(self.load()?.namespace_names().map(str::to_string).collect())
    }

    pub fn has_namespace(&mut self, namespace: &str) -> ConfigResult<bool> {
        Ok(self.load()?.namespace(namespace).is_some())
    }

    /// Record a failure message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    /// Every failure recorded so far, in order.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// True iff the settings loaded and no failure has been recorded.
    pub fn is_valid(&self) -> bool {
        self.settings.is_some() && self.failures.is_empty()
    }

    /// Send the job's final outcome to `reporter`.
    ///
    /// An invalid job reports its failures and nothing else; `files` are dropped.
    pub fn report(&self, reporter: &dyn ResultReporter, result_file: Option<&str>, files: Vec<ResultFile>) {
        let outcome = if self.is_valid() {
            JobOutcome::Success {
                result_file: result_file.map(str::to_string),
                files,
            }
        } else {
            let mut errors = self.failures.clone();
            if errors.is_empty() {
                errors.push("Invalid job configuration".to_string());
            }
            JobOutcome::Failure { errors }
        };
        reporter.update_results(outcome);
    }

    fn record(&mut self, ctx: &JobContext, e: &ConfigError) {
        self.failures.push(e.to_string());
        if let Some(obs) = &self.options.observer {
            let sev = JobSeverity::for_error(e);
            obs.on_failure(ctx, sev, e);
            if sev >= self.options.alert_at_or_above {
                obs.on_alert(ctx, sev, e);
            }
        }
    }

    fn notify_loaded(&self, ctx: &JobContext, stats: LoadStats) {
        if let Some(obs) = &self.options.observer {
            obs.on_loaded(ctx, stats);
        }
    }
}
