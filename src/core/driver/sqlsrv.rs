use super::{record, CommonOptions, Driver, EngineKind};
use crate::core::db::ConnectionParams;
use crate::core::native::{AttrValue, Attribute};

/// SQL Server profile.
///
/// DSN: `server=<server>[,<port>];database=<database>`. There is no charset
/// segment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServer;

impl Driver for SqlServer {
    fn kind(&self) -> EngineKind {
        EngineKind::SqlServer
    }

    fn build_dsn(&self, params: &mut ConnectionParams) {
        let server = match params.port() {
            Some(port) => format!("{},{}", params.server(), port),
            None => params.server().to_string(),
        };
        let database = params.database().to_string();

        params
            .add_dsn_segment("server", server)
            .add_dsn_segment("database", database);
    }
}

/// SQL Server option surface of a connection.
pub struct SqlServerOptions<'c> {
    params: &'c mut ConnectionParams,
    live: bool,
}

impl<'c> SqlServerOptions<'c> {
    pub(crate) fn new(params: &'c mut ConnectionParams, live: bool) -> Self {
        SqlServerOptions { params, live }
    }

    /// Size in KB of the client-side buffer that holds results.
    pub fn set_max_buffer_size(&mut self, size_kb: u64) -> &mut Self {
        self.record_option(Attribute::SqlSrvClientBufferMaxKbSize, AttrValue::Int(size_kb))
    }

    /// Query timeout in seconds.
    pub fn set_timeout(&mut self, seconds: u64) -> &mut Self {
        self.record_option(Attribute::SqlSrvQueryTimeout, AttrValue::Int(seconds))
    }
}

impl CommonOptions for SqlServerOptions<'_> {
    fn record_option(&mut self, attribute: Attribute, value: AttrValue) -> &mut Self {
        record(self.params, self.live, attribute, value);
        self
    }
}
