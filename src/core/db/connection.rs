/// Connection Management Module
///
/// This module provides the `Connection` type: connection parameters, the
/// lazily opened native handle, the engine's option surface and the entry
/// point for preparing statements.
///
/// A `Connection` has no internal locking. One connection serves one logical
/// call sequence; sharing it across threads needs external synchronization.
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::db::query::{Query, UnpreparedStatement};
use crate::core::db::ConnectionParams;
use crate::core::driver::{
    record, CommonOptions, Driver, DriverRegistry, EngineKind, MySqlOptions, SqlServerOptions,
    SqliteOptions,
};
use crate::core::dsn;
use crate::core::native::{
    self, AttrValue, Attribute, CursorKind, NativeClient, NativeConnection, NativeError,
    NativeStatement,
};
use crate::core::{FluentError, Result};

/// The option surface of whichever engine a connection runs.
pub enum EngineOptions<'c> {
    MySql(MySqlOptions<'c>),
    SqlServer(SqlServerOptions<'c>),
    Sqlite(SqliteOptions<'c>),
}

/// A database connection.
///
/// Setters only record state. The DSN is assembled and the native handle is
/// opened on the first `connect()`; options recorded later take effect on the
/// next `connect()` after `close()`.
pub struct Connection {
    engine: String,
    driver: Box<dyn Driver>,
    client: Arc<dyn NativeClient>,
    params: ConnectionParams,
    username: Option<String>,
    password: Option<String>,
    dsn: Option<String>,
    native: Option<Box<dyn NativeConnection>>,
    connected: bool,
    error: Option<String>,
}

impl Connection {
    /// Creates a connection for `engine`, resolved through `registry`, that
    /// opens its native handle through `client`.
    ///
    /// # Errors
    ///
    /// Returns `FluentError::UnsupportedDriver` if the registry does not know
    /// the engine.
    pub fn new(engine: &str, registry: &DriverRegistry, client: Arc<dyn NativeClient>) -> Result<Self> {
        let driver = registry.resolve(engine)?;

        let mut conn = Connection {
            engine: engine.to_string(),
            driver,
            client,
            params: ConnectionParams::default(),
            username: None,
            password: None,
            dsn: None,
            native: None,
            connected: false,
            error: None,
        };
        conn.error_mode_exception();

        Ok(conn)
    }

    /// Creates a connection from the standard registry and the default native
    /// client.
    ///
    /// # Examples
    ///
    /// ```
    /// use fluentdb::Connection;
    ///
    /// let mut conn = Connection::for_engine("sqlite", ":memory:").unwrap();
    /// assert!(conn.connect());
    /// assert_eq!(conn.dsn(), Some("sqlite:dbname=:memory:"));
    /// ```
    pub fn for_engine(engine: &str, database: &str) -> Result<Self> {
        let mut conn = Self::new(engine, DriverRegistry::standard(), native::default_client())?;
        conn.set_database(database);
        Ok(conn)
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn engine_kind(&self) -> EngineKind {
        self.driver.kind()
    }

    pub fn set_database(&mut self, database: impl Into<String>) -> &mut Self {
        self.params.set_database(database);
        self
    }

    pub fn database(&self) -> &str {
        self.params.database()
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> &mut Self {
        self.username = Some(username.into());
        self
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn set_password(&mut self, password: impl Into<String>) -> &mut Self {
        self.password = Some(password.into());
        self
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_server(&mut self, server: impl Into<String>) -> &mut Self {
        self.params.set_server(server);
        self
    }

    pub fn server(&self) -> &str {
        self.params.server()
    }

    pub fn set_port(&mut self, port: u16) -> &mut Self {
        self.params.set_port(Some(port));
        self
    }

    pub fn port(&self) -> Option<u16> {
        self.params.port()
    }

    pub fn set_charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.params.set_charset(Some(charset.into()));
        self
    }

    pub fn charset(&self) -> Option<&str> {
        self.params.charset()
    }

    /// Sets a complete DSN; the driver profile then builds no segments.
    pub fn set_dsn(&mut self, dsn: impl Into<String>) -> &mut Self {
        self.dsn = Some(dsn.into());
        self
    }

    /// The explicit DSN, or the one assembled by the first `connect()`.
    pub fn dsn(&self) -> Option<&str> {
        self.dsn.as_deref()
    }

    /// Records a native option; the last value for a key wins.
    pub fn add_option(&mut self, attribute: Attribute, value: AttrValue) -> &mut Self {
        record(&mut self.params, self.native.is_some(), attribute, value);
        self
    }

    pub fn options(&self) -> &std::collections::BTreeMap<Attribute, AttrValue> {
        self.params.options()
    }

    /// Appends a `name=value` DSN segment.
    pub fn add_dsn_segment(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        self.params.add_dsn_segment(name, value);
        self
    }

    pub fn dsn_segments(&self) -> &[String] {
        self.params.dsn_segments()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Message of the last failed `connect()`.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn native_handle(&self) -> Option<&dyn NativeConnection> {
        self.native.as_deref()
    }

    /// Opens the native handle if none is open.
    ///
    /// Returns whether the connection is established. A failure keeps its
    /// message in [`Connection::error_message`].
    pub fn connect(&mut self) -> bool {
        if self.native.is_some() {
            return self.connected;
        }

        let dsn = match &self.dsn {
            Some(dsn) => dsn.clone(),
            None => {
                self.driver.build_dsn(&mut self.params);
                let dsn = dsn::assemble(&self.engine, self.params.dsn_segments());
                self.dsn = Some(dsn.clone());
                dsn
            }
        };

        match self.open(&dsn) {
            Ok(native) => {
                info!("Connected to {}", dsn);
                self.native = Some(native);
                self.connected = true;
                self.error = None;
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", dsn, e);
                self.connected = false;
                self.error = Some(e.to_string());
            }
        }

        self.connected
    }

    fn open(&self, dsn: &str) -> std::result::Result<Box<dyn NativeConnection>, NativeError> {
        let mut native = self
            .client
            .open(dsn, self.username.as_deref(), self.password.as_deref())?;

        for (attribute, value) in self.params.options() {
            if let Err(e) = native.set_attribute(*attribute, value) {
                if let Err(close_err) = native.close() {
                    warn!("Failed to release rejected connection: {}", close_err);
                }
                return Err(e);
            }
        }

        Ok(native)
    }

    /// Prepares a forward-only statement.
    ///
    /// Leading and trailing whitespace is trimmed and each pair of spaces is
    /// replaced by a single space. A native prepare failure does not raise:
    /// the returned query reports it through `succeeded()` and
    /// `error_message()`.
    ///
    /// # Errors
    ///
    /// Returns `FluentError::NotConnected` without an open native handle.
    pub fn query(&self, sql: &str) -> Result<Query<'_>> {
        let native = self.native.as_deref().ok_or_else(|| {
            FluentError::NotConnected(format!(
                "{} connection has no open handle; call connect() first",
                self.engine
            ))
        })?;

        let sql = normalize_sql(sql);
        let stmt: Box<dyn NativeStatement + '_> = match native.prepare(&sql, CursorKind::ForwardOnly) {
            Ok(stmt) => stmt,
            Err(e) => {
                debug!("Failed to prepare statement {:?}: {}", sql, e);
                Box::new(UnpreparedStatement::new(e.to_string()))
            }
        };

        Ok(Query::new(sql, stmt))
    }

    /// Closes the native handle and clears the connected flag.
    pub fn close(&mut self) -> &mut Self {
        if let Some(native) = self.native.take() {
            match native.close() {
                Ok(()) => debug!("Closed {} connection", self.engine),
                Err(e) => warn!("Failed to close {} connection: {}", self.engine, e),
            }
        }
        self.connected = false;
        self
    }

    /// MySQL option surface.
    ///
    /// # Errors
    ///
    /// `FluentError::UnknownDriverMethod` on a non-MySQL connection.
    pub fn mysql_options(&mut self) -> Result<MySqlOptions<'_>> {
        self.expect_kind(EngineKind::MySql, "mysql_options")?;
        let live = self.native.is_some();
        Ok(MySqlOptions::new(&mut self.params, live))
    }

    /// SQL Server option surface.
    ///
    /// # Errors
    ///
    /// `FluentError::UnknownDriverMethod` on a non-SQL Server connection.
    pub fn sqlsrv_options(&mut self) -> Result<SqlServerOptions<'_>> {
        self.expect_kind(EngineKind::SqlServer, "sqlsrv_options")?;
        let live = self.native.is_some();
        Ok(SqlServerOptions::new(&mut self.params, live))
    }

    /// SQLite option surface.
    ///
    /// # Errors
    ///
    /// `FluentError::UnknownDriverMethod` on a non-SQLite connection.
    pub fn sqlite_options(&mut self) -> Result<SqliteOptions<'_>> {
        self.expect_kind(EngineKind::Sqlite, "sqlite_options")?;
        let live = self.native.is_some();
        Ok(SqliteOptions::new(&mut self.params, live))
    }

    /// The option surface of this connection's engine.
    pub fn engine_options(&mut self) -> EngineOptions<'_> {
        let live = self.native.is_some();
        match self.driver.kind() {
            EngineKind::MySql => EngineOptions::MySql(MySqlOptions::new(&mut self.params, live)),
            EngineKind::SqlServer => {
                EngineOptions::SqlServer(SqlServerOptions::new(&mut self.params, live))
            }
            EngineKind::Sqlite => EngineOptions::Sqlite(SqliteOptions::new(&mut self.params, live)),
        }
    }

    fn expect_kind(&self, kind: EngineKind, method: &str) -> Result<()> {
        if self.driver.kind() == kind {
            Ok(())
        } else {
            Err(FluentError::UnknownDriverMethod {
                engine: self.engine.clone(),
                method: method.to_string(),
            })
        }
    }
}

impl CommonOptions for Connection {
    fn record_option(&mut self, attribute: Attribute, value: AttrValue) -> &mut Self {
        self.add_option(attribute, value)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("engine", &self.engine)
            .field("server", &self.params.server())
            .field("database", &self.params.database())
            .field("username", &self.username)
            .field("dsn", &self.dsn)
            .field("connected", &self.connected)
            .field("error", &self.error)
            .finish()
    }
}

/// Trims the statement and replaces each pair of spaces with one space,
/// scanning left to right without overlap.
pub(crate) fn normalize_sql(sql: &str) -> String {
    sql.trim().replace("  ", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::native::{ErrorMode, MemoryClient, MemoryResult};
    use crate::core::value::Value;

    fn mysql(client: &MemoryClient) -> Connection {
        Connection::new("mysql", DriverRegistry::standard(), Arc::new(client.clone())).unwrap()
    }

    #[test]
    fn test_unsupported_engine_fails_construction() {
        let client = MemoryClient::new();
        let err = Connection::new("oracle", DriverRegistry::standard(), Arc::new(client)).unwrap_err();
        match err {
            FluentError::UnsupportedDriver(name) => assert_eq!(name, "oracle"),
            other => panic!("Expected UnsupportedDriver, got {:?}", other),
        }
        assert!(Connection::for_engine("oracle", "app").is_err());
    }

    #[test]
    fn test_defaults() {
        let conn = mysql(&MemoryClient::new());
        assert_eq!(conn.engine(), "mysql");
        assert_eq!(conn.server(), "localhost");
        assert_eq!(conn.port(), None);
        assert_eq!(conn.dsn(), None);
        assert!(!conn.is_connected());
        assert_eq!(
            conn.options().get(&Attribute::ErrorMode),
            Some(&AttrValue::ErrorMode(ErrorMode::Exception))
        );
    }

    #[test]
    fn test_connect_builds_dsn_and_applies_options() {
        let client = MemoryClient::new();
        let mut conn = mysql(&client);
        conn.set_server("db1")
            .set_database("app")
            .set_port(3307)
            .set_charset("utf8mb4")
            .set_username("app")
            .set_password("secret")
            .lowercase();

        assert!(conn.connect());
        assert!(conn.is_connected());
        assert_eq!(
            client.last_dsn().as_deref(),
            Some("mysql:host=db1;dbname=app;port=3307;charset=utf8mb4")
        );
        assert_eq!(conn.dsn(), client.last_dsn().as_deref());
        assert_eq!(
            client.last_credentials(),
            Some((Some("app".to_string()), Some("secret".to_string())))
        );
        assert_eq!(client.attributes().len(), 2);
    }

    #[test]
    fn test_connect_is_idempotent() {
        let client = MemoryClient::new();
        let mut conn = mysql(&client);
        conn.set_database("app");

        assert!(conn.connect());
        assert!(conn.connect());
        assert_eq!(client.open_count(), 1);
        assert_eq!(conn.dsn_segments().len(), 2);
    }

    #[test]
    fn test_reconnect_reuses_assembled_dsn() {
        let client = MemoryClient::new();
        let mut conn = mysql(&client);
        conn.set_database("app");
        assert!(conn.connect());

        conn.close();
        assert!(!conn.is_connected());
        assert_eq!(client.close_count(), 1);

        conn.set_server("elsewhere");
        assert!(conn.connect());
        assert_eq!(client.open_count(), 2);
        assert_eq!(client.last_dsn().as_deref(), Some("mysql:host=localhost;dbname=app"));
        assert_eq!(conn.dsn_segments().len(), 2);
    }

    #[test]
    fn test_explicit_dsn_skips_profile() {
        let client = MemoryClient::new();
        let mut conn = mysql(&client);
        conn.set_dsn("mysql:host=override;dbname=x").set_database("ignored");

        assert!(conn.connect());
        assert!(conn.dsn_segments().is_empty());
        assert_eq!(client.last_dsn().as_deref(), Some("mysql:host=override;dbname=x"));
    }

    #[test]
    fn test_manual_segments_precede_profile_segments() {
        let client = MemoryClient::new();
        let mut conn = mysql(&client);
        conn.set_database("app").add_dsn_segment("unix_socket", "/tmp/mysql.sock");

        assert!(conn.connect());
        assert_eq!(
            client.last_dsn().as_deref(),
            Some("mysql:unix_socket=/tmp/mysql.sock;host=localhost;dbname=app")
        );
    }

    #[test]
    fn test_connect_failure_is_reported_not_raised() {
        let client = MemoryClient::new().with_connect_failure("Access denied for user");
        let mut conn = mysql(&client);

        assert!(!conn.connect());
        assert!(!conn.is_connected());
        assert_eq!(conn.error_message(), Some("Access denied for user"));
        assert!(conn.native_handle().is_none());

        match conn.query("SELECT 1").unwrap_err() {
            FluentError::NotConnected(_) => {}
            other => panic!("Expected NotConnected, got {:?}", other),
        }
    }

    #[test]
    fn test_rejected_option_fails_connect() {
        let client = MemoryClient::new().with_rejected_attribute(Attribute::MySqlDirectQuery);
        let mut conn = mysql(&client);
        conn.mysql_options().unwrap().direct_query();

        assert!(!conn.connect());
        assert!(conn.error_message().unwrap().contains("MySqlDirectQuery"));
        assert_eq!(client.close_count(), 1);
    }

    #[test]
    fn test_options_after_connect_are_not_applied() {
        let client = MemoryClient::new();
        let mut conn = mysql(&client);
        assert!(conn.connect());
        let applied = client.attributes().len();

        conn.uppercase();
        assert!(conn.connect());
        assert_eq!(client.attributes().len(), applied);
        assert!(conn.options().contains_key(&Attribute::Case));

        conn.close();
        assert!(conn.connect());
        assert!(client
            .attributes()
            .iter()
            .any(|(attribute, _)| *attribute == Attribute::Case));
    }

    #[test]
    fn test_engine_option_handles() {
        let client = MemoryClient::new();
        let mut conn = Connection::new("sqlsrv", DriverRegistry::standard(), Arc::new(client)).unwrap();

        conn.sqlsrv_options().unwrap().set_timeout(30).set_max_buffer_size(512);
        assert_eq!(conn.options().get(&Attribute::SqlSrvQueryTimeout), Some(&AttrValue::Int(30)));

        match conn.mysql_options().err().unwrap() {
            FluentError::UnknownDriverMethod { engine, method } => {
                assert_eq!(engine, "sqlsrv");
                assert_eq!(method, "mysql_options");
            }
            other => panic!("Expected UnknownDriverMethod, got {:?}", other),
        }
        assert!(conn.sqlite_options().is_err());

        match conn.engine_options() {
            EngineOptions::SqlServer(mut options) => {
                options.set_timeout(60);
            }
            _ => panic!("Expected SQL Server options"),
        }
        assert_eq!(conn.options().get(&Attribute::SqlSrvQueryTimeout), Some(&AttrValue::Int(60)));
    }

    #[test]
    fn test_query_normalizes_whitespace() {
        let client = MemoryClient::new();
        let mut conn = mysql(&client);
        assert!(conn.connect());

        let query = conn.query("  SELECT  *    FROM users\n ").unwrap();
        assert_eq!(query.sql(), "SELECT * FROM users");
        assert_eq!(client.prepared(), vec!["SELECT * FROM users".to_string()]);

        // tabs and single newlines are left alone
        let query = conn.query("SELECT\t1").unwrap();
        assert_eq!(query.sql(), "SELECT\t1");
        assert_eq!(normalize_sql("a    b"), "a  b");
        assert_eq!(normalize_sql("a   b"), "a  b");
    }

    #[test]
    fn test_query_prepares_forward_only_cursor() {
        let client = MemoryClient::new();
        let mut conn = mysql(&client);
        assert!(conn.connect());
        assert_eq!(client.last_cursor(), None);

        conn.query("SELECT 1").unwrap();
        assert_eq!(client.last_cursor(), Some(CursorKind::ForwardOnly));
    }

    #[test]
    fn test_prepare_failure_reports_through_query() {
        let client = MemoryClient::new().with_prepare_failure("SELEC 1", "syntax error");
        let mut conn = mysql(&client);
        assert!(conn.connect());

        let response = conn.query("SELEC 1").unwrap().get();
        assert!(!response.succeeded());
        assert_eq!(response.error_message(), Some("syntax error"));
        assert!(response.read().unwrap().is_empty().unwrap());
        assert!(client.executions().is_empty());
    }

    #[test]
    fn test_drop_closes_native_handle() {
        let client = MemoryClient::new().with_result(
            "SELECT 1 AS one",
            MemoryResult::new().columns(&["one"]).row(vec![Value::from(1)]),
        );
        {
            let mut conn = mysql(&client);
            assert!(conn.connect());
        }
        assert_eq!(client.close_count(), 1);
    }
}
