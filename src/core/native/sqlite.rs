/// SQLite native client built on `rusqlite`.
///
/// Reads the database path from the `dbname` segment of a `sqlite:` DSN.
/// Generic attributes (error mode, column case, stringify, null conversion)
/// are applied while fetching; the SQLite attributes map to pragmas and the
/// busy handler.
use rusqlite::types::{Value as SqlValue, ValueRef};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{
    AttrValue, Attribute, ColumnCase, CursorKind, ErrorMode, NativeClient, NativeConnection,
    NativeError, NativeRow, NativeStatement, NullConversion,
};
use crate::core::dsn::Dsn;
use crate::core::value::{ParamType, Value};

const ENGINE: &str = "sqlite";

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteClient;

impl SqliteClient {
    pub fn new() -> Self {
        SqliteClient
    }
}

impl NativeClient for SqliteClient {
    fn open(
        &self,
        dsn: &str,
        _username: Option<&str>,
        _password: Option<&str>,
    ) -> Result<Box<dyn NativeConnection>, NativeError> {
        let path = database_path(dsn)?;

        debug!("Opening SQLite database {}", path);
        let conn = rusqlite::Connection::open(&path)?;

        Ok(Box::new(SqliteConnection {
            conn,
            settings: FetchSettings::default(),
        }))
    }
}

/// Reads the database path from a `sqlite:` DSN. When `dbname` is the only
/// segment the rest of the DSN is the path verbatim, so it may contain `;`.
fn database_path(dsn: &str) -> Result<String, NativeError> {
    if let Some(path) = dsn.strip_prefix("sqlite:dbname=") {
        if !path.contains('=') {
            return Ok(path.to_string());
        }
    }

    let dsn = Dsn::parse(dsn)?;
    if dsn.engine() != ENGINE {
        return Err(NativeError::new(format!(
            "could not find driver for engine '{}'",
            dsn.engine()
        )));
    }
    dsn.segment("dbname")
        .map(String::from)
        .ok_or_else(|| NativeError::new("missing dbname in data source name"))
}

/// Attributes that shape fetched rows and failure reporting.
#[derive(Debug, Default, Clone, Copy)]
struct FetchSettings {
    error_mode: ErrorMode,
    case: ColumnCase,
    stringify: bool,
    nulls: NullConversion,
}

impl FetchSettings {
    fn convert(&self, value: ValueRef<'_>) -> Value {
        let value = match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        };

        let value = match value {
            Value::Integer(i) if self.stringify => Value::Text(i.to_string()),
            Value::Real(f) if self.stringify => Value::Text(f.to_string()),
            other => other,
        };

        match (self.nulls, value) {
            (NullConversion::EmptyStringToNull, Value::Text(s)) if s.is_empty() => Value::Null,
            (NullConversion::NullToEmptyString, Value::Null) => Value::Text(String::new()),
            (_, other) => other,
        }
    }

    fn report(&self, message: &str) {
        match self.error_mode {
            ErrorMode::Silent => {}
            ErrorMode::Warning => warn!("SQLite statement failed: {}", message),
            ErrorMode::Exception => error!("SQLite statement failed: {}", message),
        }
    }
}

pub struct SqliteConnection {
    conn: rusqlite::Connection,
    settings: FetchSettings,
}

impl NativeConnection for SqliteConnection {
    fn set_attribute(&mut self, attribute: Attribute, value: &AttrValue) -> Result<(), NativeError> {
        match (attribute, value) {
            (Attribute::ErrorMode, AttrValue::ErrorMode(mode)) => self.settings.error_mode = *mode,
            (Attribute::Case, AttrValue::Case(case)) => self.settings.case = *case,
            (Attribute::StringifyFetches, AttrValue::Bool(on)) => self.settings.stringify = *on,
            (Attribute::OracleNulls, AttrValue::Nulls(nulls)) => self.settings.nulls = *nulls,
            (Attribute::SqliteForeignKeys, AttrValue::Bool(on)) => {
                self.conn.pragma_update(None, "foreign_keys", *on)?;
            }
            (Attribute::SqliteJournalMode, AttrValue::Text(mode)) => {
                let applied: String = self.conn.pragma_update_and_check(
                    None,
                    "journal_mode",
                    mode.as_str(),
                    |row| row.get(0),
                )?;
                debug!("SQLite journal mode is now {}", applied);
            }
            (Attribute::SqliteBusyTimeout, AttrValue::Int(seconds)) => {
                self.conn.busy_timeout(Duration::from_secs(*seconds))?;
            }
            (attribute, value) => {
                return Err(NativeError::new(format!(
                    "unsupported attribute {:?} = {} for engine '{}'",
                    attribute, value, ENGINE
                )));
            }
        }
        Ok(())
    }

    fn prepare<'c>(
        &'c self,
        sql: &str,
        _cursor: CursorKind,
    ) -> Result<Box<dyn NativeStatement + 'c>, NativeError> {
        if sql.trim().is_empty() {
            return Err(NativeError::new("empty statement"));
        }
        let stmt = self.conn.prepare(sql)?;
        Ok(Box::new(SqliteStatement {
            conn: &self.conn,
            stmt,
            settings: self.settings,
            buffered: None,
            changes: 0,
            error: None,
        }))
    }

    fn close(self: Box<Self>) -> Result<(), NativeError> {
        self.conn.close().map_err(|(_, e)| NativeError::from(e))
    }
}

/// Statement whose rows are read into a buffer during `execute`, so the
/// borrow on the underlying statement ends before `fetch_all`.
pub struct SqliteStatement<'c> {
    conn: &'c rusqlite::Connection,
    stmt: rusqlite::Statement<'c>,
    settings: FetchSettings,
    buffered: Option<Vec<NativeRow>>,
    changes: usize,
    error: Option<String>,
}

impl SqliteStatement<'_> {
    fn query_rows(&mut self) -> rusqlite::Result<Vec<NativeRow>> {
        let settings = self.settings;
        let columns: Vec<String> = self
            .stmt
            .column_names()
            .into_iter()
            .map(|name| settings.case.apply(name))
            .collect();

        let mut rows = self.stmt.raw_query();
        let mut fetched = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                values.push((name.clone(), settings.convert(row.get_ref(i)?)));
            }
            fetched.push(values);
        }
        Ok(fetched)
    }
}

impl NativeStatement for SqliteStatement<'_> {
    fn bind_value(&mut self, placeholder: &str, value: &Value, kind: ParamType) -> Result<(), NativeError> {
        let index = self.stmt.parameter_index(placeholder)?.ok_or_else(|| {
            NativeError::new(format!(
                "invalid parameter number: {} is not defined",
                placeholder
            ))
        })?;

        let value = match value.clone().coerce(kind) {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(i64::from(b)),
            Value::Integer(i) => SqlValue::Integer(i),
            Value::Real(f) => SqlValue::Real(f),
            Value::Text(s) => SqlValue::Text(s),
            Value::Blob(b) => SqlValue::Blob(b),
        };
        self.stmt.raw_bind_parameter(index, value)?;
        Ok(())
    }

    fn execute(&mut self) -> bool {
        self.buffered = None;
        self.changes = 0;
        self.error = None;

        let outcome = if self.stmt.column_count() > 0 {
            match self.query_rows() {
                Ok(rows) => {
                    // RETURNING clauses produce rows and still change the table
                    if !self.stmt.readonly() {
                        self.changes = self.conn.changes() as usize;
                    }
                    self.buffered = Some(rows);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        } else {
            match self.stmt.raw_execute() {
                Ok(changes) => {
                    self.changes = changes;
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };

        match outcome {
            Ok(()) => true,
            Err(e) => {
                let message = e.to_string();
                self.settings.report(&message);
                self.error = Some(message);
                false
            }
        }
    }

    fn fetch_all(&mut self) -> Result<Vec<NativeRow>, NativeError> {
        Ok(self.buffered.take().unwrap_or_default())
    }

    fn close_cursor(&mut self) {
        self.buffered = None;
    }

    fn row_count(&self) -> u64 {
        self.changes as u64
    }

    fn error_message(&self) -> Option<String> {
        self.error.clone()
    }
}
