use thiserror::Error;

/// Convenience result type for configuration and feature operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error type returned by the configuration engine.
///
/// Every variant that a [`crate::manager::ConfigManager`] encounters is also rendered into its
/// `failures` list, so callers can keep going and report all problems at once.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The job configuration document is missing, unparseable, or has no usable settings.
    #[error("config load error: {message}")]
    ConfigLoad { message: String },

    /// A namespace's data file is registered but could not be read or parsed.
    #[error("data load error in namespace '{namespace}': {message}")]
    DataLoad { namespace: String, message: String },

    /// Mapped fields are declared but no data file is registered for the namespace.
    #[error("namespace '{namespace}' maps fields to file data but no data file was provided")]
    MissingData { namespace: String },

    /// A result was added while no record was active on the cursor.
    #[error("cannot add result '{field}': no current feature (iteration not started or already finished)")]
    AnnotationState { field: String },

    /// The namespace is not present in the loaded configuration.
    #[error("unknown namespace '{namespace}'")]
    UnknownNamespace { namespace: String },

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
