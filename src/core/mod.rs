/// Core Module for fluentdb
///
/// This module contains the building blocks of the crate: the native database
/// layer, driver profiles and the registry that resolves them, the fluent
/// connection/query/response layer, and the value, record and error types
/// they share.
pub mod db;
pub mod driver;
pub mod dsn;
pub mod error;
pub mod native;
pub mod record;
pub mod value;

// Re-export commonly used types for convenience
pub use error::{FluentError, Result};
