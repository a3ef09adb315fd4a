/// Data source names of the form `engine:name=value;name=value`.
use crate::core::native::NativeError;

/// Joins an engine prefix and `name=value` segments into a DSN, keeping the
/// segment order.
pub fn assemble(engine: &str, segments: &[String]) -> String {
    format!("{}:{}", engine, segments.join(";"))
}

/// A parsed DSN, as read back by native clients.
#[derive(Debug, Clone, PartialEq)]
pub struct Dsn {
    engine: String,
    segments: Vec<(String, String)>,
}

impl Dsn {
    pub fn parse(dsn: &str) -> Result<Self, NativeError> {
        let (engine, body) = dsn
            .split_once(':')
            .ok_or_else(|| NativeError::new(format!("invalid data source name: {}", dsn)))?;
        if engine.is_empty() {
            return Err(NativeError::new(format!("missing engine in data source name: {}", dsn)));
        }

        let segments = body
            .split(';')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.split_once('=')
                    .map(|(name, value)| (name.trim().to_string(), value.to_string()))
                    .ok_or_else(|| NativeError::new(format!("malformed data source segment: {}", s)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Dsn {
            engine: engine.to_string(),
            segments,
        })
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// First value for a segment name.
    pub fn segment(&self, name: &str) -> Option<&str> {
        self.segments
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn segments(&self) -> &[(String, String)] {
        &self.segments
    }
}
