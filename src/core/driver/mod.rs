/// Driver Profiles
///
/// A driver profile knows one engine's DSN syntax and option surface. It is
/// stateless: `build_dsn` is handed the connection's parameters, and the
/// option handles write into those same parameters. Nothing reaches the
/// native layer until `Connection::connect`.
///
/// ## Layout
///
/// - `mysql.rs`, `sqlsrv.rs`, `sqlite.rs`: one profile and one option handle
///   per engine
/// - `registry.rs`: engine name → profile constructor
///
/// Adding an engine means one profile, one option handle and one registry
/// entry; `Connection` does not change.
pub mod mysql;
pub mod registry;
pub mod sqlite;
pub mod sqlsrv;

use std::fmt;
use tracing::debug;

use crate::core::db::ConnectionParams;
use crate::core::native::{AttrValue, Attribute, ColumnCase, ErrorMode, NullConversion};

pub use mysql::{MySql, MySqlOptions};
pub use registry::{DriverFactory, DriverRegistry};
pub use sqlite::{Sqlite, SqliteOptions};
pub use sqlsrv::{SqlServer, SqlServerOptions};

/// Engine families with a dedicated option surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    MySql,
    SqlServer,
    Sqlite,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::MySql => "mysql",
            EngineKind::SqlServer => "sqlsrv",
            EngineKind::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// Per-engine strategy.
pub trait Driver: fmt::Debug + Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Appends the engine's DSN segments to the connection parameters.
    /// Called once, right before the first connection attempt.
    fn build_dsn(&self, params: &mut ConnectionParams);
}

/// Option setters shared by every engine.
///
/// Each call records a native option on the connection; it is applied when
/// the connection is opened.
pub trait CommonOptions {
    fn record_option(&mut self, attribute: Attribute, value: AttrValue) -> &mut Self;

    /// Specifies how the driver reports failures.
    fn set_error_mode(&mut self, mode: ErrorMode) -> &mut Self {
        self.record_option(Attribute::ErrorMode, AttrValue::ErrorMode(mode))
    }

    fn error_mode_silent(&mut self) -> &mut Self {
        self.set_error_mode(ErrorMode::Silent)
    }

    fn error_mode_warning(&mut self) -> &mut Self {
        self.set_error_mode(ErrorMode::Warning)
    }

    fn error_mode_exception(&mut self) -> &mut Self {
        self.set_error_mode(ErrorMode::Exception)
    }

    /// Folds column names to lowercase.
    fn lowercase(&mut self) -> &mut Self {
        self.record_option(Attribute::Case, AttrValue::Case(ColumnCase::Lower))
    }

    /// Keeps column names as returned by the database.
    fn natural(&mut self) -> &mut Self {
        self.record_option(Attribute::Case, AttrValue::Case(ColumnCase::Natural))
    }

    /// Folds column names to uppercase.
    fn uppercase(&mut self) -> &mut Self {
        self.record_option(Attribute::Case, AttrValue::Case(ColumnCase::Upper))
    }

    /// Converts numeric values to strings on fetch.
    fn stringify(&mut self, enabled: bool) -> &mut Self {
        self.record_option(Attribute::StringifyFetches, AttrValue::Bool(enabled))
    }

    fn empty_string_to_null(&mut self) -> &mut Self {
        self.record_option(
            Attribute::OracleNulls,
            AttrValue::Nulls(NullConversion::EmptyStringToNull),
        )
    }

    fn null_to_empty_string(&mut self) -> &mut Self {
        self.record_option(
            Attribute::OracleNulls,
            AttrValue::Nulls(NullConversion::NullToEmptyString),
        )
    }
}

/// Records an option, noting when it cannot reach an already open handle.
pub(crate) fn record(params: &mut ConnectionParams, live: bool, attribute: Attribute, value: AttrValue) {
    if live {
        debug!(
            "Option {:?} recorded on an open connection; it applies on the next connect",
            attribute
        );
    }
    params.add_option(attribute, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<(Attribute, AttrValue)>);

    impl CommonOptions for Recorder {
        fn record_option(&mut self, attribute: Attribute, value: AttrValue) -> &mut Self {
            self.0.push((attribute, value));
            self
        }
    }

    #[test]
    fn test_common_setters_record_native_keys() {
        let mut recorder = Recorder::default();
        recorder
            .error_mode_warning()
            .uppercase()
            .stringify(false)
            .null_to_empty_string();

        assert_eq!(
            recorder.0,
            vec![
                (Attribute::ErrorMode, AttrValue::ErrorMode(ErrorMode::Warning)),
                (Attribute::Case, AttrValue::Case(ColumnCase::Upper)),
                (Attribute::StringifyFetches, AttrValue::Bool(false)),
                (
                    Attribute::OracleNulls,
                    AttrValue::Nulls(NullConversion::NullToEmptyString)
                ),
            ]
        );
    }

    #[test]
    fn test_engine_kind_display() {
        assert_eq!(EngineKind::MySql.to_string(), "mysql");
        assert_eq!(EngineKind::SqlServer.to_string(), "sqlsrv");
        assert_eq!(EngineKind::Sqlite.to_string(), "sqlite");
    }
}
