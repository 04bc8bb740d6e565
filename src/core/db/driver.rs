/// Driver Seam Module
///
/// The gateway core talks to a backend only through the traits in this
/// module. A driver turns a connection descriptor into its own connection
/// string grammar, opens physical connections, and binds catalog records to
/// the typed descriptors below so nothing above this layer indexes into
/// untyped tuples.

use crate::core::db::connection::ConnectionDescriptor;
use thiserror::Error;

/// A backend-neutral cell or parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

/// Faults raised by a backend driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Errors reported by the SQLite library
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Errors reported by any other backend, carried as diagnostic text
    #[error("{0}")]
    Backend(String),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// One record of a driver's table catalog primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    /// Backend object type, e.g. "table" or "view"
    pub table_type: String,
}

/// One record of a driver's column catalog primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type as written in the table definition (may be empty)
    pub type_name: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub default_value: Option<String>,
}

/// Opens physical connections for one backend.
pub trait Driver: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Renders the descriptor in this backend's connection string grammar.
    fn connection_string(&self, descriptor: &ConnectionDescriptor) -> String;

    /// Opens a physical connection. Implementations release anything they
    /// allocated before returning an error.
    fn connect(&self, connection_string: &str) -> DriverResult<Box<dyn Connection>>;
}

/// An open physical connection owning exactly one cursor.
pub trait Connection: Send {
    fn cursor(&mut self) -> &mut dyn Cursor;

    /// Confirms every change applied since the last commit.
    fn commit(&mut self) -> DriverResult<()>;

    /// Closes the connection. Calling it again after success is a no-op.
    fn close(&mut self) -> DriverResult<()>;
}

/// Statement execution and catalog access on an open connection.
pub trait Cursor {
    /// Runs one statement with positionally bound parameters.
    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<()>;

    /// Column names of the last result set, `None` when the last statement
    /// produced no result set.
    fn description(&self) -> Option<&[String]>;

    /// Drains every remaining row of the last result set.
    fn fetch_all(&mut self) -> DriverResult<Vec<Vec<Value>>>;

    /// Rows returned or affected by the last statement.
    fn row_count(&self) -> usize;

    /// Table catalog primitive.
    fn tables(&mut self) -> DriverResult<Vec<TableDescriptor>>;

    /// Column catalog primitive for one table.
    fn columns(&mut self, table: &str) -> DriverResult<Vec<ColumnDescriptor>>;
}
