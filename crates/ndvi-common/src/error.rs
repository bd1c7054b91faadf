//! Error types for the NDVI timelapse pipeline.

use thiserror::Error;

/// Result type alias using DatasetError.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Dataset descriptor could not be obtained or understood.
///
/// Fatal for the dataset: nothing downstream runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Dataset descriptor unreachable at '{path}': {message}")]
    Unreachable { path: String, message: String },

    #[error("Malformed dataset descriptor: {0}")]
    Malformed(String),

    #[error("Invalid dataset descriptor field '{field}': {message}")]
    InvalidField { field: String, message: String },
}

impl ConfigError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Malformed(format!("JSON error: {}", err))
    }
}

/// Raster bytes could not be turned into a frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("Malformed raster: {0}")]
    Malformed(String),

    #[error("Raster has {found} band(s), at least {required} required")]
    MissingBands { found: usize, required: usize },

    #[error("Band length {actual} does not match {width}x{height} raster")]
    LengthMismatch {
        width: usize,
        height: usize,
        actual: usize,
    },

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// A frame could not be obtained for a date.
///
/// Cloneable so that every caller coalesced onto the same load receives it.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("Failed to fetch raster for {date} from '{path}': {message}")]
    Transport {
        date: String,
        path: String,
        message: String,
    },

    #[error("Failed to decode raster for {date}: {source}")]
    Decode {
        date: String,
        #[source]
        source: DecodeError,
    },
}

impl LoadError {
    pub fn transport(date: impl Into<String>, path: impl Into<String>, message: impl Into<String>) -> Self {
        LoadError::Transport {
            date: date.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn decode(date: impl Into<String>, source: DecodeError) -> Self {
        LoadError::Decode {
            date: date.into(),
            source,
        }
    }

    /// Date the failed load was for.
    pub fn date(&self) -> &str {
        match self {
            LoadError::Transport { date, .. } | LoadError::Decode { date, .. } => date,
        }
    }
}

/// Primary error type for dataset activation and display.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Timestamp not found: {0}")]
    NotFound(String),

    #[error("Failed to publish features: {0}")]
    Publish(String),
}

impl DatasetError {
    /// Whether the dataset can keep running after this error.
    ///
    /// Load failures leave the previously shown frame in place; everything
    /// else stops activation of the dataset.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DatasetError::Load(_) | DatasetError::Publish(_))
    }
}
