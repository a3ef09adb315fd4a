use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::db::Connection;
use crate::core::driver::{CommonOptions, DriverRegistry, EngineKind};
use crate::core::native::{self, AttrValue, Attribute, ErrorMode, NativeClient};
use crate::core::{FluentError, Result};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub options: Option<OptionsConfig>,
    pub mysql: Option<MySqlConfig>,
    pub sqlsrv: Option<SqlServerConfig>,
    pub sqlite: Option<SqliteConfig>,
}

/// Connection target and credentials.
#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    pub engine: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub charset: Option<String>,
    pub dsn: Option<String>,
}

/// Options understood by every engine.
#[derive(Debug, Deserialize)]
pub struct OptionsConfig {
    pub error_mode: Option<String>,
    pub case: Option<String>,
    pub stringify: Option<bool>,
    pub nulls: Option<String>,
}

/// MySQL-family options.
#[derive(Debug, Deserialize)]
pub struct MySqlConfig {
    pub buffered_query: Option<bool>,
    pub max_buffer_size: Option<u64>,
    pub direct_query: Option<bool>,
}

/// SQL Server options.
#[derive(Debug, Deserialize)]
pub struct SqlServerConfig {
    pub max_buffer_size: Option<u64>,
    pub timeout: Option<u64>,
}

/// SQLite options.
#[derive(Debug, Deserialize)]
pub struct SqliteConfig {
    pub foreign_keys: Option<bool>,
    pub journal_mode: Option<String>,
    pub busy_timeout: Option<u64>,
}

/// Directory holding fluentdb's configuration, under the platform config
/// directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fluentdb")
}

impl Config {
    /// `<config dir>/fluentdb/config.toml`
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Builds an unconnected connection from the standard registry and the
    /// default native client.
    pub fn build(&self) -> Result<Connection> {
        self.build_with(DriverRegistry::standard(), native::default_client())
    }

    /// Builds an unconnected connection with every configured parameter and
    /// option recorded on it.
    ///
    /// # Errors
    ///
    /// - `FluentError::UnsupportedDriver` if the engine is unknown
    /// - `FluentError::Config` for an option name that is not recognized or
    ///   an engine section that does not match the engine
    pub fn build_with(&self, registry: &DriverRegistry, client: Arc<dyn NativeClient>) -> Result<Connection> {
        let target = &self.connection;
        let mut conn = Connection::new(&target.engine, registry, client)?;

        conn.set_database(target.database.as_str());
        if let Some(username) = &target.username {
            conn.set_username(username.as_str());
        }
        if let Some(password) = &target.password {
            conn.set_password(password.as_str());
        }
        if let Some(server) = &target.server {
            conn.set_server(server.as_str());
        }
        if let Some(port) = target.port {
            conn.set_port(port);
        }
        if let Some(charset) = &target.charset {
            conn.set_charset(charset.as_str());
        }
        if let Some(dsn) = &target.dsn {
            conn.set_dsn(dsn.as_str());
        }

        if let Some(options) = &self.options {
            apply_common_options(&mut conn, options)?;
        }
        self.apply_engine_options(&mut conn)?;

        Ok(conn)
    }

    fn apply_engine_options(&self, conn: &mut Connection) -> Result<()> {
        let kind = conn.engine_kind();
        let engine = conn.engine().to_string();
        let mismatch = |section: &str| {
            FluentError::Config(format!(
                "[{}] section does not apply to the {} engine",
                section, engine
            ))
        };

        if let Some(mysql) = &self.mysql {
            if kind != EngineKind::MySql {
                return Err(mismatch("mysql"));
            }
            let mut options = conn.mysql_options()?;
            if let Some(enabled) = mysql.buffered_query {
                options.record_option(Attribute::MySqlUseBufferedQuery, AttrValue::Bool(enabled));
            }
            if let Some(size) = mysql.max_buffer_size {
                options.set_max_buffer_size(size);
            }
            if let Some(enabled) = mysql.direct_query {
                options.record_option(Attribute::MySqlDirectQuery, AttrValue::Bool(enabled));
            }
        }

        if let Some(sqlsrv) = &self.sqlsrv {
            if kind != EngineKind::SqlServer {
                return Err(mismatch("sqlsrv"));
            }
            let mut options = conn.sqlsrv_options()?;
            if let Some(size) = sqlsrv.max_buffer_size {
                options.set_max_buffer_size(size);
            }
            if let Some(seconds) = sqlsrv.timeout {
                options.set_timeout(seconds);
            }
        }

        if let Some(sqlite) = &self.sqlite {
            if kind != EngineKind::Sqlite {
                return Err(mismatch("sqlite"));
            }
            let mut options = conn.sqlite_options()?;
            if let Some(enabled) = sqlite.foreign_keys {
                options.foreign_keys(enabled);
            }
            if let Some(mode) = &sqlite.journal_mode {
                options.journal_mode(mode);
            }
            if let Some(seconds) = sqlite.busy_timeout {
                options.busy_timeout(seconds);
            }
        }

        Ok(())
    }
}

fn apply_common_options(conn: &mut Connection, options: &OptionsConfig) -> Result<()> {
    if let Some(mode) = &options.error_mode {
        conn.set_error_mode(ErrorMode::from_name(mode));
    }

    match options.case.as_deref() {
        None => {}
        Some("lower") => {
            conn.lowercase();
        }
        Some("natural") => {
            conn.natural();
        }
        Some("upper") => {
            conn.uppercase();
        }
        Some(other) => {
            return Err(FluentError::Config(format!(
                "unknown case '{}', expected lower, natural or upper",
                other
            )))
        }
    }

    if let Some(enabled) = options.stringify {
        conn.stringify(enabled);
    }

    match options.nulls.as_deref() {
        None => {}
        Some("empty_string_to_null") => {
            conn.empty_string_to_null();
        }
        Some("null_to_empty_string") => {
            conn.null_to_empty_string();
        }
        Some(other) => {
            return Err(FluentError::Config(format!(
                "unknown null conversion '{}', expected empty_string_to_null or null_to_empty_string",
                other
            )))
        }
    }

    Ok(())
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// use fluentdb::config::load_config;
///
/// let config = load_config("config.toml").expect("Failed to load config");
/// let mut conn = config.build().expect("Invalid configuration");
/// conn.connect();
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
