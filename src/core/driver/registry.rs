use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};

use super::{Driver, MySql, SqlServer, Sqlite};
use crate::core::{FluentError, Result};

/// Constructor for a driver profile.
pub type DriverFactory = fn() -> Box<dyn Driver>;

static STANDARD: Lazy<DriverRegistry> = Lazy::new(DriverRegistry::with_builtin_drivers);

/// Table of supported engine names.
///
/// The registry is a plain value handed to `Connection::new`; the standard
/// table is built once and never mutated.
#[derive(Debug, Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// `mysql`, `sqlsrv` and `sqlite`.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        registry
            .register("mysql", || Box::new(MySql))
            .register("sqlsrv", || Box::new(SqlServer))
            .register("sqlite", || Box::new(Sqlite));
        registry
    }

    /// The process-wide builtin registry.
    pub fn standard() -> &'static DriverRegistry {
        &STANDARD
    }

    /// Adds or replaces an engine.
    pub fn register(&mut self, name: impl Into<String>, factory: DriverFactory) -> &mut Self {
        self.drivers.insert(name.into(), factory);
        self
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    pub fn supported_names(&self) -> BTreeSet<&str> {
        self.drivers.keys().map(String::as_str).collect()
    }

    /// Builds the profile for an engine name.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Driver>> {
        self.drivers
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| FluentError::UnsupportedDriver(name.to_string()))
    }
}
