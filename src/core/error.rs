/// fluentdb Error Module
///
/// This module defines the error type shared by every layer of the crate.
/// Configuration and result-access problems are returned as errors; native
/// connect and execute failures are reported as status (`connect()` returning
/// `false`, `succeeded()` returning `false`) and only become errors at the
/// edges that ask for them, such as the command-line runner.
use thiserror::Error;

use crate::core::native::NativeError;

/// Error type for fluentdb.
///
/// The variants fall into four groups:
/// - configuration (unsupported engine, option surface of another engine,
///   wrong payload kind, bad configuration file)
/// - connection state
/// - result access (row index, missing column)
/// - wrapped errors from the native layer, I/O and serialization
#[derive(Error, Debug)]
pub enum FluentError {
    /// The engine name is not present in the driver registry
    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// An engine-specific option surface was requested from a connection
    /// running a different engine
    #[error("Unknown {engine} driver method: {method}")]
    UnknownDriverMethod { engine: String, method: String },

    /// A payload accessor was requested from the other payload kind
    #[error("Unknown response method: {0}")]
    UnknownResponseMethod(String),

    /// A statement was prepared before a successful `connect()`
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// The native connection could not be opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed to execute
    #[error("Execution error: {0}")]
    Execution(String),

    /// Row index outside the fetched result, or a single-row accessor used
    /// on a result that does not hold exactly one row
    #[error("Invalid row index: {0}")]
    InvalidRowIndex(String),

    /// Column name not present in a record
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors raised by the native database layer
    #[error("Native driver error: {0}")]
    Native(#[from] NativeError),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Type alias for Result to use FluentError as the error type.
pub type Result<T> = std::result::Result<T, FluentError>;
