/// Response Module
///
/// The outcome of running a `Query`: the SQL text, whether execution
/// succeeded and a payload that is either the rows a read produced or the
/// row count a write affected.
///
/// Read payloads fetch lazily. The first accessor drains the statement, closes
/// its cursor and keeps the materialized records; every later accessor reads
/// the kept records.
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::fmt;
use tracing::trace;

use crate::core::native::NativeStatement;
use crate::core::record::Record;
use crate::core::value::Value;
use crate::core::{FluentError, Result};

/// What a response carries.
pub enum Payload<'c> {
    Read(ReadPayload<'c>),
    Write(WritePayload<'c>),
}

/// The result of executing a query.
pub struct Response<'c> {
    sql: String,
    success: bool,
    error: Option<String>,
    payload: Payload<'c>,
}

impl<'c> Response<'c> {
    pub(crate) fn reading(
        sql: String,
        success: bool,
        error: Option<String>,
        stmt: Box<dyn NativeStatement + 'c>,
    ) -> Self {
        Response {
            sql,
            success,
            error,
            payload: Payload::Read(ReadPayload {
                stmt: RefCell::new(stmt),
                rows: OnceCell::new(),
            }),
        }
    }

    pub(crate) fn writing(
        sql: String,
        success: bool,
        error: Option<String>,
        stmt: Box<dyn NativeStatement + 'c>,
    ) -> Self {
        Response {
            sql,
            success,
            error,
            payload: Payload::Write(WritePayload { stmt }),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Native error text of a failed execution.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn payload(&self) -> &Payload<'c> {
        &self.payload
    }

    pub fn into_payload(self) -> Payload<'c> {
        self.payload
    }

    /// The read payload.
    ///
    /// # Errors
    ///
    /// `FluentError::UnknownResponseMethod` on a response built by `exec()`.
    pub fn read(&self) -> Result<&ReadPayload<'c>> {
        match &self.payload {
            Payload::Read(read) => Ok(read),
            Payload::Write(_) => Err(FluentError::UnknownResponseMethod(
                "read accessors on a write response".to_string(),
            )),
        }
    }

    /// The write payload.
    ///
    /// # Errors
    ///
    /// `FluentError::UnknownResponseMethod` on a response built by `get()`.
    pub fn write(&self) -> Result<&WritePayload<'c>> {
        match &self.payload {
            Payload::Write(write) => Ok(write),
            Payload::Read(_) => Err(FluentError::UnknownResponseMethod(
                "affected_rows on a read response".to_string(),
            )),
        }
    }
}

impl fmt::Debug for Response<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("sql", &self.sql)
            .field("success", &self.success)
            .field("error", &self.error)
            .field("payload", &self.payload)
            .finish()
    }
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Read(read) => read.fmt(f),
            Payload::Write(write) => write.fmt(f),
        }
    }
}

/// Rows produced by `Query::get`.
pub struct ReadPayload<'c> {
    stmt: RefCell<Box<dyn NativeStatement + 'c>>,
    rows: OnceCell<Vec<Record>>,
}

impl<'c> ReadPayload<'c> {
    /// Every row, fetched from the native statement on the first call.
    pub fn fetch_all(&self) -> Result<&[Record]> {
        let rows = self.rows.get_or_try_init(|| -> Result<Vec<Record>> {
            let mut stmt = self.stmt.borrow_mut();
            let fetched = stmt.fetch_all()?;
            stmt.close_cursor();
            trace!("Materialized {} rows", fetched.len());
            Ok(fetched
                .into_iter()
                .enumerate()
                .map(|(index, row)| Record::new(row, index))
                .collect())
        })?;
        Ok(rows)
    }

    pub fn all(&self) -> Result<&[Record]> {
        self.fetch_all()
    }

    /// The record at zero-based position `index`.
    pub fn row_at(&self, index: usize) -> Result<&Record> {
        let rows = self.fetch_all()?;
        rows.get(index).ok_or_else(|| {
            FluentError::InvalidRowIndex(format!(
                "row {} requested from a result of {} rows",
                index,
                rows.len()
            ))
        })
    }

    pub fn first(&self) -> Result<&Record> {
        self.row_at(0)
    }

    pub fn last(&self) -> Result<&Record> {
        self.fetch_all()?
            .last()
            .ok_or_else(|| FluentError::InvalidRowIndex("last row requested from an empty result".to_string()))
    }

    pub fn row_count(&self) -> Result<usize> {
        Ok(self.fetch_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.fetch_all()?.is_empty())
    }

    /// Column names of the first record.
    pub fn column_names(&self) -> Result<Vec<&str>> {
        Ok(self.first()?.keys())
    }

    /// One column's value from every record, in row order.
    pub fn pluck(&self, column: &str) -> Result<Vec<&Value>> {
        self.fetch_all()?.iter().map(|record| record.get(column)).collect()
    }

    /// Every record as a plain JSON object.
    pub fn to_list(&self) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        Ok(self.fetch_all()?.iter().map(Record::to_map).collect())
    }

    /// A JSON array of objects with keys in fetch order.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self.fetch_all()?)?)
    }

    /// A field of a single-row result.
    ///
    /// # Errors
    ///
    /// `FluentError::InvalidRowIndex` unless the result holds exactly one
    /// row, `FluentError::MissingField` if the column is absent.
    pub fn field(&self, name: &str) -> Result<&Value> {
        let count = self.row_count()?;
        if count > 1 {
            return Err(FluentError::InvalidRowIndex(format!(
                "field {} requested from a result of {} rows",
                name, count
            )));
        }
        self.first()?.get(name)
    }
}

impl fmt::Debug for ReadPayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadPayload")
            .field("rows", &self.rows.get())
            .finish()
    }
}

/// Row count produced by `Query::exec`.
pub struct WritePayload<'c> {
    stmt: Box<dyn NativeStatement + 'c>,
}

impl WritePayload<'_> {
    /// Rows affected by the execution; 0 after a failure.
    pub fn affected_rows(&self) -> u64 {
        self.stmt.row_count()
    }
}

impl fmt::Debug for WritePayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WritePayload")
            .field("affected_rows", &self.affected_rows())
            .finish()
    }
}
