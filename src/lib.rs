// Core infrastructure modules
pub mod core;

// Configuration file support
pub mod config;

pub use crate::core::db::{
    BoundParam, Connection, ConnectionParams, EngineOptions, Payload, Query, ReadPayload,
    Response, StatementKind, WritePayload,
};
pub use crate::core::driver::{
    CommonOptions, Driver, DriverRegistry, EngineKind, MySqlOptions, SqlServerOptions,
    SqliteOptions,
};
pub use crate::core::record::Record;
pub use crate::core::value::{ParamType, Value};
pub use crate::core::{FluentError, Result};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
