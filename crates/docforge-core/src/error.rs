use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Unified error type for docforge-core
///
/// Every failure of the conversion pipeline lands in exactly one of these
/// variants and is propagated to the caller without retry:
/// - input decoding (base64, source formats, size bounds)
/// - format-specific conversion and rendering
/// - missing external tools
/// - scratch storage I/O
/// - configuration loading
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Input Errors
    // ==========================================================================
    /// Malformed base64 or an unrecognized source format
    #[error("decoding error: {0}")]
    Decoding(String),

    /// A merge was requested with no documents
    #[error("no documents to merge")]
    EmptyMerge,

    /// Image dimensions exceed the configured pixel budget
    #[error("image of {width}x{height} pixels exceeds the limit of {max_pixels} pixels")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    // ==========================================================================
    // Conversion Errors
    // ==========================================================================
    /// The format-specific transform failed for otherwise valid input
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// A conversion did not finish within its time budget
    #[error("conversion timed out after {timeout:?}")]
    ConversionTimeout { timeout: Duration },

    /// The HTML renderer reported an internal error
    #[error("rendering failed: {0}")]
    Rendering(String),

    // ==========================================================================
    // Environment Errors
    // ==========================================================================
    /// A required external tool is not installed or not on PATH
    #[error("required tool is unavailable: {0}")]
    ToolMissing(String),

    // ==========================================================================
    // Scratch Storage Errors
    // ==========================================================================
    /// Failed to write a staged file
    #[error("failed to write {}: {source}", path.display())]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path does not exist or is not a regular file
    #[error("cannot read {}: {reason}", path.display())]
    IoRead { path: PathBuf, reason: String },

    /// The file exists but reading it failed
    #[error("failed to read {}: {source}", path.display())]
    IoReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },
}

/// Coarse classification used at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller sent something we cannot convert
    ClientInput,
    /// Something failed on our side
    Server,
    /// The host is missing a required collaborator
    Environment,
}

impl Error {
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Decoding(_)
            | Self::EmptyMerge
            | Self::ImageTooLarge { .. }
            | Self::Conversion(_) => ErrorClass::ClientInput,
            Self::ToolMissing(_) => ErrorClass::Environment,
            Self::ConversionTimeout { .. }
            | Self::Rendering(_)
            | Self::IoWrite { .. }
            | Self::IoRead { .. }
            | Self::IoReadFailure { .. }
            | Self::ConfigLoad(_)
            | Self::ConfigInvalid { .. } => ErrorClass::Server,
        }
    }

    /// Stable machine-readable code for API consumers.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Decoding(_) => "decoding_error",
            Self::EmptyMerge => "empty_merge",
            Self::ImageTooLarge { .. } => "image_too_large",
            Self::Conversion(_) => "conversion_failure",
            Self::ConversionTimeout { .. } => "conversion_timeout",
            Self::Rendering(_) => "rendering_error",
            Self::ToolMissing(_) => "environment_error",
            Self::IoWrite { .. } | Self::IoRead { .. } | Self::IoReadFailure { .. } => "io_error",
            Self::ConfigLoad(_) | Self::ConfigInvalid { .. } => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
