use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    AttrValue, Attribute, CursorKind, NativeClient, NativeConnection, NativeError, NativeRow,
    NativeStatement,
};
use crate::core::value::{ParamType, Value};

/// A statement execution recorded by the memory client.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedExecution {
    pub sql: String,
    pub params: Vec<(String, Value, ParamType)>,
}

/// Scripted outcome for one SQL text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryResult {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    affected: u64,
    failure: Option<String>,
}

impl MemoryResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column names for the result.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of values in column order.
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// Set the affected-row count reported after execution.
    pub fn affected(mut self, count: u64) -> Self {
        self.affected = count;
        self
    }

    /// Make execution fail with the given message.
    pub fn failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    fn native_rows(&self) -> Vec<NativeRow> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    results: HashMap<String, MemoryResult>,
    connect_failure: Option<String>,
    prepare_failures: HashMap<String, String>,
    rejected_attributes: Vec<Attribute>,
    opens: Vec<(String, Option<String>, Option<String>)>,
    attributes: Vec<(Attribute, AttrValue)>,
    prepared: Vec<String>,
    cursors: Vec<CursorKind>,
    executions: Vec<RecordedExecution>,
    closed: usize,
}

/// An in-memory native client for testing.
///
/// Results are scripted per SQL text and every call is recorded so tests can
/// verify what reached the native layer. Clones share state, so a test can
/// keep one handle while a connection owns another.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use fluentdb::core::native::{MemoryClient, MemoryResult};
/// use fluentdb::core::value::Value;
/// use fluentdb::{Connection, DriverRegistry};
///
/// let client = MemoryClient::new().with_result(
///     "SELECT id FROM users",
///     MemoryResult::new().columns(&["id"]).row(vec![Value::from(1)]),
/// );
/// let mut conn = Connection::new("mysql", DriverRegistry::standard(), Arc::new(client.clone())).unwrap();
/// conn.set_database("app");
/// assert!(conn.connect());
/// assert_eq!(client.last_dsn().unwrap(), "mysql:host=localhost;dbname=app");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script the outcome of a SQL text.
    pub fn with_result(self, sql: impl Into<String>, result: MemoryResult) -> Self {
        self.set_result(sql, result);
        self
    }

    /// Replace the outcome of a SQL text, also for statements already prepared.
    pub fn set_result(&self, sql: impl Into<String>, result: MemoryResult) {
        self.lock().results.insert(sql.into(), result);
    }

    /// Make every `open` fail with the given message.
    pub fn with_connect_failure(self, message: impl Into<String>) -> Self {
        self.lock().connect_failure = Some(message.into());
        self
    }

    /// Make preparing the given SQL text fail.
    pub fn with_prepare_failure(self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock().prepare_failures.insert(sql.into(), message.into());
        self
    }

    /// Make applying the given attribute fail.
    pub fn with_rejected_attribute(self, attribute: Attribute) -> Self {
        self.lock().rejected_attributes.push(attribute);
        self
    }

    /// Number of successful and failed `open` calls.
    pub fn open_count(&self) -> usize {
        self.lock().opens.len()
    }

    pub fn last_dsn(&self) -> Option<String> {
        self.lock().opens.last().map(|(dsn, _, _)| dsn.clone())
    }

    pub fn last_credentials(&self) -> Option<(Option<String>, Option<String>)> {
        self.lock()
            .opens
            .last()
            .map(|(_, user, password)| (user.clone(), password.clone()))
    }

    /// Attributes applied to opened connections, in application order.
    pub fn attributes(&self) -> Vec<(Attribute, AttrValue)> {
        self.lock().attributes.clone()
    }

    pub fn prepared(&self) -> Vec<String> {
        self.lock().prepared.clone()
    }

    /// Cursor requested by the most recent prepare.
    pub fn last_cursor(&self) -> Option<CursorKind> {
        self.lock().cursors.last().copied()
    }

    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.lock().executions.clone()
    }

    pub fn last_execution(&self) -> Option<RecordedExecution> {
        self.lock().executions.last().cloned()
    }

    pub fn close_count(&self) -> usize {
        self.lock().closed
    }
}

impl NativeClient for MemoryClient {
    fn open(
        &self,
        dsn: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Box<dyn NativeConnection>, NativeError> {
        let mut state = self.lock();
        state.opens.push((
            dsn.to_string(),
            username.map(String::from),
            password.map(String::from),
        ));
        if let Some(message) = &state.connect_failure {
            return Err(NativeError::new(message.clone()));
        }
        Ok(Box::new(MemoryConnection {
            client: self.clone(),
        }))
    }
}

struct MemoryConnection {
    client: MemoryClient,
}

impl NativeConnection for MemoryConnection {
    fn set_attribute(&mut self, attribute: Attribute, value: &AttrValue) -> Result<(), NativeError> {
        let mut state = self.client.lock();
        if state.rejected_attributes.contains(&attribute) {
            return Err(NativeError::new(format!("unsupported attribute {:?}", attribute)));
        }
        state.attributes.push((attribute, value.clone()));
        Ok(())
    }

    fn prepare<'c>(
        &'c self,
        sql: &str,
        cursor: CursorKind,
    ) -> Result<Box<dyn NativeStatement + 'c>, NativeError> {
        let mut state = self.client.lock();
        if let Some(message) = state.prepare_failures.get(sql) {
            return Err(NativeError::new(message.clone()));
        }
        state.prepared.push(sql.to_string());
        state.cursors.push(cursor);
        Ok(Box::new(MemoryStatement {
            client: self.client.clone(),
            sql: sql.to_string(),
            bindings: Vec::new(),
            executed: false,
            error: None,
        }))
    }

    fn close(self: Box<Self>) -> Result<(), NativeError> {
        self.client.lock().closed += 1;
        Ok(())
    }
}

struct MemoryStatement {
    client: MemoryClient,
    sql: String,
    bindings: Vec<(String, Value, ParamType)>,
    executed: bool,
    error: Option<String>,
}

impl MemoryStatement {
    fn current_result(&self) -> MemoryResult {
        self.client
            .lock()
            .results
            .get(&self.sql)
            .cloned()
            .unwrap_or_default()
    }
}

impl NativeStatement for MemoryStatement {
    fn bind_value(&mut self, placeholder: &str, value: &Value, kind: ParamType) -> Result<(), NativeError> {
        if !self.sql.contains(placeholder) {
            return Err(NativeError::new(format!(
                "invalid parameter number: {} is not defined",
                placeholder
            )));
        }
        let bound = (placeholder.to_string(), value.clone(), kind);
        match self.bindings.iter_mut().find(|(name, _, _)| name == placeholder) {
            Some(slot) => *slot = bound,
            None => self.bindings.push(bound),
        }
        Ok(())
    }

    fn execute(&mut self) -> bool {
        self.client.lock().executions.push(RecordedExecution {
            sql: self.sql.clone(),
            params: self.bindings.clone(),
        });
        self.error = self.current_result().failure;
        self.executed = self.error.is_none();
        self.executed
    }

    fn fetch_all(&mut self) -> Result<Vec<NativeRow>, NativeError> {
        if !self.executed {
            return Ok(Vec::new());
        }
        Ok(self.current_result().native_rows())
    }

    fn close_cursor(&mut self) {}

    fn row_count(&self) -> u64 {
        if self.executed {
            self.current_result().affected
        } else {
            0
        }
    }

    fn error_message(&self) -> Option<String> {
        self.error.clone()
    }
}
