/// Query Execution Module
///
/// A `Query` is a prepared statement plus the named parameters bound to it.
/// Binding only records values; `get()` and `exec()` bind every parameter as
/// `:name`, execute once and hand the statement to a [`Response`].
use std::fmt;
use tracing::debug;

use crate::core::db::Response;
use crate::core::native::{NativeError, NativeRow, NativeStatement};
use crate::core::value::{ParamType, Value};

/// A value bound to a named placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub value: Value,
    pub kind: ParamType,
}

/// A prepared statement awaiting execution.
pub struct Query<'c> {
    sql: String,
    stmt: Box<dyn NativeStatement + 'c>,
    params: Vec<(String, BoundParam)>,
    success: bool,
    error: Option<String>,
}

impl<'c> Query<'c> {
    pub(crate) fn new(sql: String, stmt: Box<dyn NativeStatement + 'c>) -> Self {
        let error = stmt.error_message();
        Query {
            sql,
            stmt,
            params: Vec::new(),
            success: false,
            error,
        }
    }

    /// The normalized SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> StatementKind {
        StatementKind::from_sql(&self.sql)
    }

    /// Binds `value` to `:name`. A leading `:` in `name` is optional and
    /// binding the same name again replaces the earlier value.
    pub fn bind(mut self, name: &str, value: impl Into<Value>, kind: ParamType) -> Self {
        let name = name.trim_start_matches(':').to_string();
        let param = BoundParam {
            value: value.into(),
            kind,
        };
        match self.params.iter_mut().find(|(bound, _)| *bound == name) {
            Some((_, slot)) => *slot = param,
            None => self.params.push((name, param)),
        }
        self
    }

    pub fn bind_string(self, name: &str, value: impl Into<String>) -> Self {
        self.bind(name, Value::Text(value.into()), ParamType::Str)
    }

    pub fn bind_integer(self, name: &str, value: i64) -> Self {
        self.bind(name, Value::Integer(value), ParamType::Int)
    }

    pub fn bind_boolean(self, name: &str, value: bool) -> Self {
        self.bind(name, Value::Bool(value), ParamType::Bool)
    }

    pub fn bind_null(self, name: &str) -> Self {
        self.bind(name, Value::Null, ParamType::Null)
    }

    /// Bound parameters in first-bind order, names without the `:`.
    pub fn params(&self) -> &[(String, BoundParam)] {
        &self.params
    }

    /// Whether the last execution succeeded; `false` before execution.
    pub fn succeeded(&self) -> bool {
        self.success
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// SQL text and bound parameters, one per line.
    pub fn dump_params(&self) -> String {
        let mut out = format!("SQL: [{}] {}\nParams: {}", self.sql.len(), self.sql, self.params.len());
        for (name, param) in &self.params {
            out.push_str(&format!("\n:{} ({}) = {}", name, param.kind, param.value));
        }
        out
    }

    /// Executes and wraps the statement in a read response. The response is
    /// returned whether or not execution succeeded.
    pub fn get(mut self) -> Response<'c> {
        self.execute();
        Response::reading(self.sql, self.success, self.error, self.stmt)
    }

    /// Executes and wraps the statement in a write response.
    pub fn exec(mut self) -> Response<'c> {
        self.execute();
        Response::writing(self.sql, self.success, self.error, self.stmt)
    }

    fn execute(&mut self) -> bool {
        for (name, param) in &self.params {
            let placeholder = format!(":{}", name);
            if let Err(e) = self.stmt.bind_value(&placeholder, &param.value, param.kind) {
                debug!("Skipping execution of {:?}: {}", self.sql, e);
                self.success = false;
                self.error = Some(e.to_string());
                return false;
            }
        }

        self.success = self.stmt.execute();
        self.error = if self.success {
            None
        } else {
            self.stmt.error_message()
        };
        debug!(
            "Executed {:?} with {} params: {}",
            self.sql,
            self.params.len(),
            if self.success { "ok" } else { "failed" }
        );
        self.success
    }
}

impl fmt::Debug for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("success", &self.success)
            .field("error", &self.error)
            .finish()
    }
}

/// Stands in for a statement the native layer refused to prepare.
pub(crate) struct UnpreparedStatement {
    message: String,
}

impl UnpreparedStatement {
    pub(crate) fn new(message: String) -> Self {
        UnpreparedStatement { message }
    }
}

impl NativeStatement for UnpreparedStatement {
    fn bind_value(&mut self, _placeholder: &str, _value: &Value, _kind: ParamType) -> Result<(), NativeError> {
        Err(NativeError::new(self.message.clone()))
    }

    fn execute(&mut self) -> bool {
        false
    }

    fn fetch_all(&mut self) -> Result<Vec<NativeRow>, NativeError> {
        Ok(Vec::new())
    }

    fn close_cursor(&mut self) {}

    fn row_count(&self) -> u64 {
        0
    }

    fn error_message(&self) -> Option<String> {
        Some(self.message.clone())
    }
}

/// Represents the type of SQL statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Pragma,
    Other,
}

impl StatementKind {
    /// Classifies a statement by its leading keyword.
    pub fn from_sql(sql: &str) -> Self {
        let sql_upper = sql.trim_start().to_uppercase();
        let keyword = sql_upper
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or("");

        match keyword {
            "SELECT" | "WITH" | "VALUES" | "SHOW" | "DESCRIBE" | "EXPLAIN" => StatementKind::Select,
            "INSERT" | "REPLACE" => StatementKind::Insert,
            "UPDATE" => StatementKind::Update,
            "DELETE" => StatementKind::Delete,
            "CREATE" => StatementKind::Create,
            "DROP" => StatementKind::Drop,
            "ALTER" => StatementKind::Alter,
            "PRAGMA" => StatementKind::Pragma,
            _ => StatementKind::Other,
        }
    }

    /// Whether the statement is read with `get()` rather than `exec()`.
    pub fn returns_rows(&self) -> bool {
        matches!(self, StatementKind::Select | StatementKind::Pragma)
    }
}
