use std::collections::BTreeMap;
use std::fmt;

use crate::core::native::{AttrValue, Attribute};

/// The parts of a connection a driver profile reads and writes: target
/// fields, recorded native options and the DSN segments built from them.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    database: String,
    server: String,
    port: Option<u16>,
    charset: Option<String>,
    options: BTreeMap<Attribute, AttrValue>,
    dsn_segments: Vec<String>,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        ConnectionParams {
            database: String::new(),
            server: "localhost".to_string(),
            port: None,
            charset: None,
            options: BTreeMap::new(),
            dsn_segments: Vec::new(),
        }
    }
}

impl ConnectionParams {
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn options(&self) -> &BTreeMap<Attribute, AttrValue> {
        &self.options
    }

    pub fn dsn_segments(&self) -> &[String] {
        &self.dsn_segments
    }

    /// Appends one `name=value` segment.
    pub fn add_dsn_segment(&mut self, name: &str, value: impl fmt::Display) -> &mut Self {
        self.dsn_segments.push(format!("{}={}", name, value));
        self
    }

    /// Records a native option; the last value for a key wins.
    pub fn add_option(&mut self, attribute: Attribute, value: AttrValue) -> &mut Self {
        self.options.insert(attribute, value);
        self
    }

    pub(crate) fn set_database(&mut self, database: impl Into<String>) -> &mut Self {
        self.database = database.into();
        self
    }

    pub(crate) fn set_server(&mut self, server: impl Into<String>) -> &mut Self {
        self.server = server.into();
        self
    }

    pub(crate) fn set_port(&mut self, port: Option<u16>) -> &mut Self {
        self.port = port;
        self
    }

    pub(crate) fn set_charset(&mut self, charset: Option<String>) -> &mut Self {
        self.charset = charset;
        self
    }
}
