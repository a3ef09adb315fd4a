/// Database Module
///
/// The fluent layer that callers use, built on the driver profiles and the
/// native layer.
///
/// ## Architecture
///
/// - **Connection Parameters** (`params.rs`): target fields, recorded options
///   and DSN segments that driver profiles read and write
/// - **Connection Management** (`connection.rs`): deferred connect, option
///   surfaces and statement preparation
/// - **Query Execution** (`query.rs`): parameter binding and execution
/// - **Responses** (`response.rs`): read and write payloads
///
/// ## Lifetimes
///
/// `Query` and `Response` borrow the `Connection` they came from, so a
/// connection cannot be closed or dropped while its statements are alive.
pub mod connection;
pub mod params;
pub mod query;
pub mod response;

pub use connection::{Connection, EngineOptions};
pub use params::ConnectionParams;
pub use query::{BoundParam, Query, StatementKind};
pub use response::{Payload, ReadPayload, Response, WritePayload};
