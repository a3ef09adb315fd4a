use super::{record, CommonOptions, Driver, EngineKind};
use crate::core::db::ConnectionParams;
use crate::core::native::{AttrValue, Attribute};

/// MySQL-family profile.
///
/// DSN: `host=<server>;dbname=<database>[;port=<port>][;charset=<charset>]`
#[derive(Debug, Default, Clone, Copy)]
pub struct MySql;

impl Driver for MySql {
    fn kind(&self) -> EngineKind {
        EngineKind::MySql
    }

    fn build_dsn(&self, params: &mut ConnectionParams) {
        let server = params.server().to_string();
        let database = params.database().to_string();
        let port = params.port();
        let charset = params.charset().map(String::from);

        params
            .add_dsn_segment("host", server)
            .add_dsn_segment("dbname", database);

        if let Some(port) = port {
            params.add_dsn_segment("port", port);
        }
        if let Some(charset) = charset {
            params.add_dsn_segment("charset", charset);
        }
    }
}

/// MySQL option surface of a connection.
pub struct MySqlOptions<'c> {
    params: &'c mut ConnectionParams,
    live: bool,
}

impl<'c> MySqlOptions<'c> {
    pub(crate) fn new(params: &'c mut ConnectionParams, live: bool) -> Self {
        MySqlOptions { params, live }
    }

    /// Forces queries to be buffered.
    pub fn use_buffered_query(&mut self) -> &mut Self {
        self.record_option(Attribute::MySqlUseBufferedQuery, AttrValue::Bool(true))
    }

    /// Size of the buffer that holds results.
    pub fn set_max_buffer_size(&mut self, size: u64) -> &mut Self {
        self.record_option(Attribute::MySqlMaxBufferSize, AttrValue::Int(size))
    }

    /// Executes queries directly instead of preparing them server side.
    pub fn direct_query(&mut self) -> &mut Self {
        self.record_option(Attribute::MySqlDirectQuery, AttrValue::Bool(true))
    }
}

impl CommonOptions for MySqlOptions<'_> {
    fn record_option(&mut self, attribute: Attribute, value: AttrValue) -> &mut Self {
        record(self.params, self.live, attribute, value);
        self
    }
}
