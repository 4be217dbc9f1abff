//! Wire formats read and written by the engine.
//!
//! - [`json`]: configuration documents and feature collections (`{"features": [...]}`)
//! - [`csv`]: single-row parameter tables and two-column summaries

pub mod csv;
pub mod json;

/// Supported result formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// JSON document.
    Json,
}

impl OutputFormat {
    /// Parse an output format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "geojson" => Some(Self::Json),
            _ => None,
        }
    }

    /// File extension used for results in this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// MIME content type declared for results in this format.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}
