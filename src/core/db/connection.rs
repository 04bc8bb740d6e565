/// Connection Management Module
///
/// This module owns the lifetime of physical connections. A connection is
/// opened per request through `ConnectionFactory`, wrapped in a `Session`,
/// and closed exactly once when the request ends, whichever way it ends.

use crate::core::db::driver::{Connection, Cursor, Driver};
use crate::core::{GatewayError, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Parameters identifying one backend database.
///
/// Built once per request; every field except `password` is required.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl ConnectionDescriptor {
    /// Validates raw parameters and builds a descriptor.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Configuration` when host, port, database or user
    /// is missing or empty, or when the port is not a valid TCP port.
    pub fn new(
        host: Option<&str>,
        port: Option<&str>,
        database: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        let host = required("host", host)?;
        let port = required("port", port)?;
        let database = required("database", database)?;
        let user = required("user", user)?;

        let port = port.parse::<u16>().map_err(|_| {
            GatewayError::Configuration(format!("port must be a number between 0 and 65535, got '{}'", port))
        })?;

        Ok(ConnectionDescriptor {
            host: host.to_string(),
            port,
            database: database.to_string(),
            user: user.to_string(),
            password: password.unwrap_or_default().to_string(),
        })
    }
}

fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(GatewayError::Configuration(format!(
            "missing connection parameter '{}'",
            field
        ))),
    }
}

// Keeps the password out of logs and panic messages.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Opens sessions through a backend driver.
#[derive(Clone)]
pub struct ConnectionFactory {
    driver: Arc<dyn Driver>,
}

impl ConnectionFactory {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        ConnectionFactory { driver }
    }

    /// Opens a physical connection for the descriptor.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Connection` with the driver's diagnostic when
    /// the backend cannot be reached or refuses the connection.
    pub fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Session> {
        let connection_string = self.driver.connection_string(descriptor);
        debug!(
            driver = self.driver.name(),
            host = %descriptor.host,
            database = %descriptor.database,
            "Opening session"
        );

        let connection = self
            .driver
            .connect(&connection_string)
            .map_err(GatewayError::Connection)?;
        Ok(Session::new(connection))
    }

    /// Runs `body` with a freshly opened session and closes it afterwards.
    ///
    /// The session is closed on every path out of `body`, including errors
    /// and panics.
    pub fn with_session<T, F>(&self, descriptor: &ConnectionDescriptor, body: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut session = self.open(descriptor)?;
        let outcome = body(&mut session);
        session.close();
        outcome
    }
}

/// A single-use holder of one open connection and its cursor.
pub struct Session {
    connection: Option<Box<dyn Connection>>,
}

impl Session {
    fn new(connection: Box<dyn Connection>) -> Self {
        Session {
            connection: Some(connection),
        }
    }

    fn connection(&mut self) -> Result<&mut Box<dyn Connection>> {
        self.connection
            .as_mut()
            .ok_or_else(|| GatewayError::ExecutionState("session is already closed".to_string()))
    }

    /// Returns the session's cursor.
    pub fn cursor(&mut self) -> Result<&mut dyn Cursor> {
        Ok(self.connection()?.cursor())
    }

    /// Commits pending changes on the underlying connection.
    pub fn commit(&mut self) -> Result<()> {
        self.connection()?.commit()?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Closes the underlying connection. Later calls do nothing, and a
    /// failing close is logged rather than raised.
    pub fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            match connection.close() {
                Ok(()) => debug!("Session closed"),
                Err(e) => warn!("Failed to close session cleanly: {}", e),
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
