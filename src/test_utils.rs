/// # Test Utilities Module
///
/// Shared testing infrastructure for sqlgate unit and integration tests.
///
/// This module provides:
/// - Isolated on-disk SQLite database fixtures
/// - A recording driver that counts opens, closes and commits and can
///   inject faults at every stage of a session
/// - GatewayError assertion macros

use crate::config::ConnectionParams;
use crate::core::db::driver::{
    ColumnDescriptor, Connection, Cursor, Driver, DriverError, DriverResult, TableDescriptor, Value,
};
use crate::core::db::{ConnectionDescriptor, SqliteDriver};
use crate::core::Result;
use crate::gateway::Gateway;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SAMPLE_SCHEMA: &str = "
    CREATE TABLE Client (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );

    CREATE TABLE Orders (
        id INTEGER PRIMARY KEY,
        client_id INTEGER NOT NULL REFERENCES Client (id),
        total REAL DEFAULT 0,
        note TEXT
    );

    INSERT INTO Client (name) VALUES ('Alice');
    INSERT INTO Client (name) VALUES ('Bob');
    INSERT INTO Orders (client_id, total, note) VALUES (1, 19.5, 'first order');
    INSERT INTO Orders (client_id, total, note) VALUES (2, 5.0, NULL);
";

/// Isolated database file removed when the fixture is dropped
pub struct DatabaseFixture {
    path: PathBuf,
    connection: Option<rusqlite::Connection>,
}

impl DatabaseFixture {
    /// Create a new empty database file in the temp directory
    pub fn new() -> Result<Self> {
        let path = std::env::temp_dir().join(format!("sqlgate_fixture_{}.db", Uuid::new_v4()));
        let connection = rusqlite::Connection::open(&path).map_err(DriverError::from)?;
        Ok(DatabaseFixture {
            path,
            connection: Some(connection),
        })
    }

    /// Create fixture with the Client/Orders sample schema and rows
    pub fn with_sample_data() -> Result<Self> {
        let fixture = Self::new()?;
        fixture
            .connection()
            .execute_batch(SAMPLE_SCHEMA)
            .map_err(DriverError::from)?;
        Ok(fixture)
    }

    /// Direct connection for seeding and verifying data outside the gateway
    pub fn connection(&self) -> &rusqlite::Connection {
        match &self.connection {
            Some(connection) => connection,
            None => unreachable!("fixture connection is only released on drop"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connection parameters pointing at this fixture
    pub fn params(&self) -> ConnectionParams {
        ConnectionParams {
            database: Some(self.path.to_string_lossy().into_owned()),
            ..ConnectionParams::default()
        }
    }

    pub fn descriptor(&self) -> ConnectionDescriptor {
        ConnectionDescriptor {
            host: "localhost".to_string(),
            port: 4900,
            database: self.path.to_string_lossy().into_owned(),
            user: "admin".to_string(),
            password: String::new(),
        }
    }

    /// Gateway backed by the SQLite driver and this fixture's database
    pub fn gateway(&self) -> Gateway {
        Gateway::new(Arc::new(SqliteDriver::default()), self.params())
    }
}

impl Drop for DatabaseFixture {
    fn drop(&mut self) {
        self.connection.take();
        let _ = std::fs::remove_file(&self.path);
        let _ = std::fs::remove_file(self.path.with_extension("db-journal"));
    }
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    committed: AtomicUsize,
    executed: Mutex<Vec<(String, Vec<Value>)>>,
}

#[derive(Debug, Clone, Default)]
struct Script {
    connect_error: Option<String>,
    execute_error: Option<String>,
    commit_error: Option<String>,
    close_error: Option<String>,
    catalog_error: Option<String>,
    description: Option<Vec<String>>,
    rows: Vec<Vec<Value>>,
    tables: Vec<TableDescriptor>,
    columns: Vec<(String, Vec<ColumnDescriptor>)>,
}

/// Scriptable in-memory driver that records how sessions use it.
///
/// Clones share counters, so a test can keep one clone and hand another
/// to a factory.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    script: Script,
    counters: Arc<Counters>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver whose every connection attempt fails
    pub fn failing_connect(message: &str) -> Self {
        let mut driver = Self::new();
        driver.script.connect_error = Some(message.to_string());
        driver
    }

    pub fn fail_execute(mut self, message: &str) -> Self {
        self.script.execute_error = Some(message.to_string());
        self
    }

    pub fn fail_commit(mut self, message: &str) -> Self {
        self.script.commit_error = Some(message.to_string());
        self
    }

    pub fn fail_close(mut self, message: &str) -> Self {
        self.script.close_error = Some(message.to_string());
        self
    }

    /// Makes both catalog primitives fail
    pub fn fail_catalog(mut self, message: &str) -> Self {
        self.script.catalog_error = Some(message.to_string());
        self
    }

    /// Result set returned by every executed statement
    pub fn with_result_set(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.script.description = Some(columns.iter().map(|c| c.to_string()).collect());
        self.script.rows = rows;
        self
    }

    pub fn with_tables(mut self, tables: Vec<TableDescriptor>) -> Self {
        self.script.tables = tables;
        self
    }

    pub fn with_columns(mut self, table: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.script.columns.push((table.to_string(), columns));
        self
    }

    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> usize {
        self.counters.committed.load(Ordering::SeqCst)
    }

    /// Statements and parameters in the order the driver received them
    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.counters
            .executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

impl Driver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn connection_string(&self, descriptor: &ConnectionDescriptor) -> String {
        format!(
            "recording://{}@{}:{}/{}",
            descriptor.user, descriptor.host, descriptor.port, descriptor.database
        )
    }

    fn connect(&self, _connection_string: &str) -> DriverResult<Box<dyn Connection>> {
        if let Some(message) = &self.script.connect_error {
            return Err(DriverError::Backend(message.clone()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingConnection {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
            description: None,
            rows: Vec::new(),
            row_count: 0,
        }))
    }
}

struct RecordingConnection {
    script: Script,
    counters: Arc<Counters>,
    description: Option<Vec<String>>,
    rows: Vec<Vec<Value>>,
    row_count: usize,
}

fn scripted_failure(error: &Option<String>) -> DriverResult<()> {
    match error {
        Some(message) => Err(DriverError::Backend(message.clone())),
        None => Ok(()),
    }
}

impl Connection for RecordingConnection {
    fn cursor(&mut self) -> &mut dyn Cursor {
        self
    }

    fn commit(&mut self) -> DriverResult<()> {
        scripted_failure(&self.script.commit_error)?;
        self.counters.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> DriverResult<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        scripted_failure(&self.script.close_error)
    }
}

impl Cursor for RecordingConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> DriverResult<()> {
        if let Ok(mut executed) = self.counters.executed.lock() {
            executed.push((sql.to_string(), params.to_vec()));
        }
        scripted_failure(&self.script.execute_error)?;

        self.description = self.script.description.clone();
        self.rows = self.script.rows.clone();
        self.row_count = if self.description.is_some() { self.rows.len() } else { 1 };
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
        scripted_failure(&self.script.catalog_error)?;
        Ok(self.script.tables.clone())
    }

    fn columns(&mut self, table: &str) -> DriverResult<Vec<ColumnDescriptor>> {
        scripted_failure(&self.script.catalog_error)?;
        Ok(self
            .script
            .columns
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default())
    }
}

/// Asserts that a result is an error of the given `GatewayError` variant
#[macro_export]
macro_rules! assert_gateway_error {
    ($result:expr, $expected_type:ident, $context:expr) => {
        match $result {
            Err($crate::core::GatewayError::$expected_type(..)) => {}
            Ok(_) => panic!("Expected {} error but got Ok in {}", stringify!($expected_type), $context),
            Err(other) => panic!("Expected {} but got {:?} in {}", stringify!($expected_type), other, $context),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GatewayError;

    #[test]
    fn test_database_fixture_creation() {
        let fixture = DatabaseFixture::new().unwrap();
        let path = fixture.path().to_path_buf();
        assert!(path.exists());
        drop(fixture);
        assert!(!path.exists());
    }

    #[test]
    fn test_sample_data_fixture() {
        let fixture = DatabaseFixture::with_sample_data().unwrap();

        let count: i64 = fixture
            .connection()
            .query_row("SELECT COUNT(*) FROM Client", [], |row| row.get(0))
            .expect("Failed to count clients");
        assert_eq!(count, 2);
        assert_eq!(fixture.params().descriptor().unwrap(), fixture.descriptor());
    }

    #[test]
    fn test_recording_driver_clones_share_counters() {
        let driver = RecordingDriver::new();
        let clone = driver.clone();
        let mut connection = clone.connect("recording://").unwrap();
        connection.close().unwrap();
        assert_eq!(driver.opened(), 1);
        assert_eq!(driver.closed(), 1);
    }

    #[test]
    fn test_recording_driver_scripted_columns() {
        let id = ColumnDescriptor {
            name: "id".to_string(),
            type_name: "INTEGER".to_string(),
            not_null: false,
            primary_key: true,
            default_value: None,
        };
        let driver = RecordingDriver::new().with_columns("Client", vec![id.clone()]);
        let mut connection = driver.connect("recording://").unwrap();

        assert_eq!(connection.cursor().columns("Client").unwrap(), vec![id]);
        assert!(connection.cursor().columns("Missing").unwrap().is_empty());
    }

    #[test]
    fn test_error_assertion_macro() {
        let result: Result<i32> = Err(GatewayError::Validation("Test error".to_string()));
        assert_gateway_error!(result, Validation, "macro test");
    }
}
