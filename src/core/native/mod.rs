/// Native Database Layer
///
/// The traits in this module stand for the underlying database client:
/// opening a connection from a DSN, applying connection attributes, preparing
/// statements, binding, executing and fetching. Everything above this layer
/// (driver profiles, connections, queries, responses) talks to it only
/// through these traits.
///
/// ## Implementations
///
/// - **SQLite** (`sqlite.rs`): backed by `rusqlite`, used for the `sqlite`
///   engine and by the default client
/// - **Memory** (`memory.rs`): a scripted client that records every call,
///   used to exercise engines that have no server available
pub mod memory;
pub mod sqlite;

use std::fmt;
use thiserror::Error;

use crate::core::value::{ParamType, Value};

pub use memory::{MemoryClient, MemoryResult, RecordedExecution};
pub use sqlite::SqliteClient;

/// Error reported by a native client.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct NativeError {
    message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        NativeError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<rusqlite::Error> for NativeError {
    fn from(err: rusqlite::Error) -> Self {
        NativeError::new(err.to_string())
    }
}

/// How the native layer reports statement failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    Silent,
    Warning,
    #[default]
    Exception,
}

impl ErrorMode {
    /// Parses a mode name case-insensitively. Names other than `silent` and
    /// `warning` select `Exception`.
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "silent" => ErrorMode::Silent,
            "warning" => ErrorMode::Warning,
            _ => ErrorMode::Exception,
        }
    }
}

/// Case folding applied to fetched column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnCase {
    Lower,
    #[default]
    Natural,
    Upper,
}

impl ColumnCase {
    pub fn apply(&self, name: &str) -> String {
        match self {
            ColumnCase::Lower => name.to_lowercase(),
            ColumnCase::Natural => name.to_string(),
            ColumnCase::Upper => name.to_uppercase(),
        }
    }
}

/// Conversion between empty strings and NULL on fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullConversion {
    #[default]
    Natural,
    EmptyStringToNull,
    NullToEmptyString,
}

/// Native option keys.
///
/// The generic keys apply to every engine; the prefixed ones are only
/// understood by their engine's native client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    ErrorMode,
    Case,
    StringifyFetches,
    OracleNulls,
    MySqlUseBufferedQuery,
    MySqlMaxBufferSize,
    MySqlDirectQuery,
    SqlSrvClientBufferMaxKbSize,
    SqlSrvQueryTimeout,
    SqliteForeignKeys,
    SqliteJournalMode,
    SqliteBusyTimeout,
}

/// Value recorded for an [`Attribute`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    ErrorMode(ErrorMode),
    Case(ColumnCase),
    Nulls(NullConversion),
    Bool(bool),
    Int(u64),
    Text(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::ErrorMode(mode) => write!(f, "{:?}", mode),
            AttrValue::Case(case) => write!(f, "{:?}", case),
            AttrValue::Nulls(nulls) => write!(f, "{:?}", nulls),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Cursor requested when preparing a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    ForwardOnly,
}

/// One fetched row: column name and value pairs in column order.
pub type NativeRow = Vec<(String, Value)>;

/// Opens native connections.
pub trait NativeClient: Send + Sync {
    fn open(
        &self,
        dsn: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Box<dyn NativeConnection>, NativeError>;
}

/// An open native connection.
pub trait NativeConnection {
    fn set_attribute(&mut self, attribute: Attribute, value: &AttrValue) -> Result<(), NativeError>;

    fn prepare<'c>(
        &'c self,
        sql: &str,
        cursor: CursorKind,
    ) -> Result<Box<dyn NativeStatement + 'c>, NativeError>;

    /// Releases the connection.
    fn close(self: Box<Self>) -> Result<(), NativeError>;
}

/// A prepared native statement.
pub trait NativeStatement {
    /// Binds a value to a named placeholder such as `:id`.
    fn bind_value(&mut self, placeholder: &str, value: &Value, kind: ParamType) -> Result<(), NativeError>;

    /// Executes with the current bindings. Failure is reported through the
    /// return value and [`NativeStatement::error_message`].
    fn execute(&mut self) -> bool;

    /// Returns every remaining row of the last execution.
    fn fetch_all(&mut self) -> Result<Vec<NativeRow>, NativeError>;

    fn close_cursor(&mut self);

    /// Rows affected by the last execution.
    fn row_count(&self) -> u64;

    fn error_message(&self) -> Option<String>;
}

/// Client used when the caller does not supply one.
pub fn default_client() -> std::sync::Arc<dyn NativeClient> {
    std::sync::Arc::new(SqliteClient::new())
}
