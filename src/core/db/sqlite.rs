/// SQLite Driver Module
///
/// Adapts `rusqlite` to the driver seam. The database field of the
/// descriptor names the database file; the remaining descriptor fields are
/// validated upstream but have no place in the SQLite URI grammar.
///
/// Write statements open an implicit transaction on first use so that a
/// change only becomes durable through an explicit commit. Closing a
/// connection with an open transaction rolls it back.

use crate::core::db::connection::ConnectionDescriptor;
use crate::core::db::driver::{
    ColumnDescriptor, Connection, Cursor, Driver, DriverError, DriverResult, TableDescriptor, Value,
};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, OpenFlags, Row, ToSql};
use std::time::Duration;
use tracing::debug;

/// Table catalog primitive. Record layout: 0 = object type, 1 = name, 2 = owning table.
/// Only names starting with the literal `sqlite_` are reserved.
const TABLE_CATALOG_SQL: &str = r"SELECT type, name, tbl_name FROM sqlite_master
     WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite\_%' ESCAPE '\'";
const TABLE_TYPE_FIELD: usize = 0;
const TABLE_NAME_FIELD: usize = 1;

/// Column catalog primitive. Record layout follows `PRAGMA table_info`:
/// 0 = cid, 1 = name, 2 = declared type, 3 = notnull, 4 = default, 5 = pk.
const COLUMN_CATALOG_SQL: &str = "SELECT * FROM pragma_table_info(?1)";
const COLUMN_NAME_FIELD: usize = 1;
const COLUMN_TYPE_FIELD: usize = 2;
const COLUMN_NOT_NULL_FIELD: usize = 3;
const COLUMN_DEFAULT_FIELD: usize = 4;
const COLUMN_PK_FIELD: usize = 5;

fn table_descriptor(row: &Row) -> rusqlite::Result<TableDescriptor> {
    Ok(TableDescriptor {
        name: row.get(TABLE_NAME_FIELD)?,
        table_type: row.get(TABLE_TYPE_FIELD)?,
    })
}

fn column_descriptor(row: &Row) -> rusqlite::Result<ColumnDescriptor> {
    Ok(ColumnDescriptor {
        name: row.get(COLUMN_NAME_FIELD)?,
        type_name: row.get(COLUMN_TYPE_FIELD)?,
        not_null: row.get(COLUMN_NOT_NULL_FIELD)?,
        primary_key: row.get(COLUMN_PK_FIELD)?,
        default_value: row.get(COLUMN_DEFAULT_FIELD)?,
    })
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(f) => ValueRef::Real(*f),
            Value::Text(t) => ValueRef::Text(t.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

/// Escapes the characters that carry meaning inside a SQLite URI path.
fn escape_uri_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for ch in path.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '?' => escaped.push_str("%3f"),
            '#' => escaped.push_str("%23"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Driver for SQLite database files.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    busy_timeout: Duration,
    create_if_missing: bool,
}

impl SqliteDriver {
    pub fn new(busy_timeout: Duration, create_if_missing: bool) -> Self {
        SqliteDriver {
            busy_timeout,
            create_if_missing,
        }
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        SqliteDriver::new(Duration::from_millis(5_000), false)
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn connection_string(&self, descriptor: &ConnectionDescriptor) -> String {
        let mode = if self.create_if_missing { "rwc" } else { "rw" };
        format!("file:{}?mode={}", escape_uri_path(&descriptor.database), mode)
    }

    fn connect(&self, connection_string: &str) -> DriverResult<Box<dyn Connection>> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = rusqlite::Connection::open_with_flags(connection_string, flags)?;

        // On failure `conn` is dropped here, which closes the half-configured handle.
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        debug!("Opened SQLite connection: {}", connection_string);
        Ok(Box::new(SqliteConnection::new(conn)))
    }
}

/// Materialized output of one statement.
struct StatementOutput {
    description: Option<Vec<String>>,
    rows: Vec<Vec<Value>>,
    row_count: usize,
}

fn run_statement(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[Value],
) -> DriverResult<StatementOutput> {
    let mut stmt = conn.prepare(sql)?;

    if !stmt.readonly() && conn.is_autocommit() {
        conn.execute_batch("BEGIN")?;
    }

    let column_count = stmt.column_count();
    if column_count == 0 {
        let changed = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(StatementOutput {
            description: None,
            rows: Vec::new(),
            row_count: changed,
        });
    }

    let description: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = Vec::new();
    let mut result_rows = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = result_rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(Value::from(row.get_ref(i)?));
        }
        rows.push(values);
    }

    let row_count = rows.len();
    Ok(StatementOutput {
        description: Some(description),
        rows,
        row_count,
    })
}

/// An open SQLite connection together with its single cursor state.
pub struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
    description: Option<Vec<String>>,
    rows: Vec<Vec<Value>>,
    row_count: usize,
}

impl SqliteConnection {
    fn new(conn: rusqlite::Connection) -> Self {
        SqliteConnection {
            conn: Some(conn),
            description: None,
            rows: Vec::new(),
            row_count: 0,
        }
    }

    fn handle(&self) -> DriverResult<&rusqlite::Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| DriverError::Backend("connection is closed".to_string()))
    }
}

impl Connection for SqliteConnection {
    fn cursor(&mut self) -> &mut dyn Cursor {
        self
    }

    fn commit(&mut self) -> DriverResult<()> {
        let conn = self.handle()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.description = None;
        self.rows.clear();
        match self.conn.take() {
            // A failed close hands the handle back; dropping it releases it anyway.
            Some(conn) => conn.close().map_err(|(_, err)| DriverError::Sqlite(err)),
            None => Ok(()),
        }
    }
}

impl Cursor for SqliteConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<()> {
        self.description = None;
        self.rows.clear();
        self.row_count = 0;

        let output = run_statement(self.handle()?, sql, params)?;
        self.description = output.description;
        self.rows = output.rows;
        self.row_count = output.row_count;
        Ok(())
    }

    fn description(&self) -> Option<&[String]> {
        self.description.as_deref()
    }

    fn fetch_all(&mut self) -> DriverResult<Vec<Vec<Value>>> {
        Ok(std::mem::take(&mut self.rows))
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn tables(&mut self) -> DriverResult<Vec<TableDescriptor>> {
        let conn = self.handle()?;
        let mut stmt = conn.prepare(TABLE_CATALOG_SQL)?;
        let tables = stmt
            .query_map([], table_descriptor)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tables)
    }

    fn columns(&mut self, table: &str) -> DriverResult<Vec<ColumnDescriptor>> {
        let conn = self.handle()?;
        let mut stmt = conn.prepare(COLUMN_CATALOG_SQL)?;
        let columns = stmt
            .query_map([table], column_descriptor)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }
}
