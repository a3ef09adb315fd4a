use super::{record, CommonOptions, Driver, EngineKind};
use crate::core::db::ConnectionParams;
use crate::core::native::{AttrValue, Attribute};

/// SQLite profile. The database name is a file path or `:memory:`.
///
/// DSN: `dbname=<database>`
#[derive(Debug, Default, Clone, Copy)]
pub struct Sqlite;

impl Driver for Sqlite {
    fn kind(&self) -> EngineKind {
        EngineKind::Sqlite
    }

    fn build_dsn(&self, params: &mut ConnectionParams) {
        let database = params.database().to_string();
        params.add_dsn_segment("dbname", database);
    }
}

/// SQLite option surface of a connection.
pub struct SqliteOptions<'c> {
    params: &'c mut ConnectionParams,
    live: bool,
}

impl<'c> SqliteOptions<'c> {
    pub(crate) fn new(params: &'c mut ConnectionParams, live: bool) -> Self {
        SqliteOptions { params, live }
    }

    pub fn foreign_keys(&mut self, enabled: bool) -> &mut Self {
        self.record_option(Attribute::SqliteForeignKeys, AttrValue::Bool(enabled))
    }

    /// Journal mode name such as `wal`, `delete` or `memory`.
    pub fn journal_mode(&mut self, mode: &str) -> &mut Self {
        self.record_option(Attribute::SqliteJournalMode, AttrValue::Text(mode.to_string()))
    }

    /// How long to wait on a locked database, in seconds.
    pub fn busy_timeout(&mut self, seconds: u64) -> &mut Self {
        self.record_option(Attribute::SqliteBusyTimeout, AttrValue::Int(seconds))
    }
}

impl CommonOptions for SqliteOptions<'_> {
    fn record_option(&mut self, attribute: Attribute, value: AttrValue) -> &mut Self {
        record(self.params, self.live, attribute, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsn() {
        let mut params = ConnectionParams::default();
        params.set_database(":memory:").set_port(Some(1)).set_charset(Some("utf8".into()));
        Sqlite.build_dsn(&mut params);
        assert_eq!(params.dsn_segments(), &["dbname=:memory:"]);
    }

    #[test]
    fn test_options() {
        let mut params = ConnectionParams::default();
        SqliteOptions::new(&mut params, true)
            .foreign_keys(true)
            .journal_mode("wal")
            .busy_timeout(5);

        let options = params.options();
        assert_eq!(options.get(&Attribute::SqliteForeignKeys), Some(&AttrValue::Bool(true)));
        assert_eq!(
            options.get(&Attribute::SqliteJournalMode),
            Some(&AttrValue::Text("wal".to_string()))
        );
        assert_eq!(options.get(&Attribute::SqliteBusyTimeout), Some(&AttrValue::Int(5)));
    }
}
