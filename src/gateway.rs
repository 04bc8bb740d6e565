//! Gateway operations.
//!
//! Every public method here is one externally callable operation. Each call
//! builds its own connection descriptor, opens its own session and closes it
//! before returning, so a `Gateway` can be shared freely across threads.
//!
//! Faults are translated at a single boundary (`respond`): configuration
//! faults are returned as `Err`, everything else becomes an error envelope
//! inside `Ok(Response::Failure(..))`.

use crate::codec::{ErrorEnvelope, ResultCodec};
use crate::config::{Config, ConnectionParams};
use crate::core::db::{
    ConnectionFactory, Driver, QueryExecutor, SchemaIntrospector, Session, Statement, StatementGuard,
    Value, Verb,
};
use crate::core::{GatewayError, Result};
use crate::prompts;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

pub const INSERT_SUCCESS: &str = "Insert operation completed successfully.";
pub const UPDATE_SUCCESS: &str = "Update operation completed successfully.";

/// What an operation hands back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// JSON document or success message
    Payload(String),
    /// The operation failed; the envelope describes why
    Failure(ErrorEnvelope),
}

impl Response {
    pub fn is_failure(&self) -> bool {
        matches!(self, Response::Failure(_))
    }

    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            Response::Failure(envelope) => Some(envelope),
            Response::Payload(_) => None,
        }
    }

    /// The string handed to the routing layer: the payload, or the
    /// serialized envelope.
    pub fn into_string(self) -> String {
        match self {
            Response::Payload(payload) => payload,
            Response::Failure(envelope) => envelope.to_json(),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Payload(payload) => f.write_str(payload),
            Response::Failure(envelope) => write!(f, "{}", envelope),
        }
    }
}

/// Converts an operation outcome into a response at the operation boundary.
fn respond(operation: &str, outcome: Result<String>) -> Result<Response> {
    match outcome {
        Ok(payload) => {
            info!(operation, "Operation completed");
            Ok(Response::Payload(payload))
        }
        Err(e @ GatewayError::Configuration(_)) => {
            error!(operation, "Operation aborted: {}", e);
            Err(e)
        }
        Err(e) => {
            let envelope = ResultCodec::encode_error(&e);
            warn!(operation, kind = envelope.kind.as_str(), "Operation failed: {}", envelope.message);
            Ok(Response::Failure(envelope))
        }
    }
}

/// The database access core exposed as plain methods.
#[derive(Clone)]
pub struct Gateway {
    factory: ConnectionFactory,
    params: ConnectionParams,
}

impl Gateway {
    pub fn new(driver: Arc<dyn Driver>, params: ConnectionParams) -> Self {
        Gateway {
            factory: ConnectionFactory::new(driver),
            params,
        }
    }

    /// Builds a gateway from resolved configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let driver = config.driver.sqlite_driver()?;
        Ok(Gateway::new(Arc::new(driver), config.connection.clone()))
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Lists all table names as a JSON array.
    pub fn list_tables(&self) -> Result<Response> {
        self.operation("list_tables", || {
            self.with_session(|session| {
                let tables = SchemaIntrospector::new(session).list_tables()?;
                ResultCodec::encode_json(&tables)
            })
        })
    }

    /// Lists the column names of one table as a JSON array.
    pub fn list_columns(&self, table_name: &str) -> Result<Response> {
        self.operation("list_columns", || {
            self.with_session(|session| {
                let names: Vec<String> = SchemaIntrospector::new(session)
                    .list_columns(table_name)?
                    .into_iter()
                    .map(|column| column.name)
                    .collect();
                ResultCodec::encode_json(&names)
            })
        })
    }

    /// Lists name, declared type and description of each column of one table.
    pub fn describe_columns(&self, table_name: &str) -> Result<Response> {
        self.operation("describe_columns", || {
            self.with_session(|session| {
                let columns = SchemaIntrospector::new(session).list_columns(table_name)?;
                ResultCodec::encode_json(&columns)
            })
        })
    }

    /// Maps every table name to its column names, in table discovery order.
    pub fn list_tables_with_columns(&self) -> Result<Response> {
        self.operation("list_tables_with_columns", || {
            self.with_session(|session| {
                let tables = SchemaIntrospector::new(session).list_tables_with_columns()?;
                let mapping: Map<String, JsonValue> = tables
                    .into_iter()
                    .map(|table| {
                        let names: Vec<String> = table.columns.into_iter().map(|c| c.name).collect();
                        (table.name, JsonValue::from(names))
                    })
                    .collect();
                ResultCodec::encode_json(&mapping)
            })
        })
    }

    /// Runs a SELECT statement and returns its rows as a JSON array of objects.
    pub fn select_query(&self, query: &str, params: &[Value]) -> Result<Response> {
        self.operation("select_query", || {
            let guarded = StatementGuard::check(Statement::new(query, params.to_vec()), Verb::Select)?;
            self.with_session(|session| {
                let result = QueryExecutor::new(session).fetch(&guarded)?;
                ResultCodec::encode(&result)
            })
        })
    }

    /// Runs and commits an INSERT statement.
    pub fn insert_query(&self, query: &str, params: &[Value]) -> Result<Response> {
        self.write_query("insert_query", Verb::Insert, INSERT_SUCCESS, query, params)
    }

    /// Runs and commits an UPDATE statement.
    pub fn update_query(&self, query: &str, params: &[Value]) -> Result<Response> {
        self.write_query("update_query", Verb::Update, UPDATE_SUCCESS, query, params)
    }

    /// Conversation starter for building a query against one table.
    pub fn help_build_query(&self, table_name: &str) -> Result<Response> {
        self.operation("help_build_query", || {
            ResultCodec::encode_json(&prompts::help_build_query(table_name))
        })
    }

    /// Conversation starter for exploring the rows of one table.
    pub fn explore_data(&self, table_name: &str) -> Result<Response> {
        self.operation("explore_data", || ResultCodec::encode_json(&prompts::explore_data(table_name)))
    }

    pub fn use_database_schema(&self) -> Result<Response> {
        self.operation("use_database_schema", || {
            ResultCodec::encode_json(&prompts::use_database_schema())
        })
    }

    /// Reports a fault raised before the named operation could start, such
    /// as undecodable call arguments, through the usual operation boundary.
    pub(crate) fn reject(&self, operation: &str, fault: GatewayError) -> Result<Response> {
        self.operation(operation, || Err(fault))
    }

    fn write_query(
        &self,
        operation: &str,
        verb: Verb,
        success: &str,
        query: &str,
        params: &[Value],
    ) -> Result<Response> {
        self.operation(operation, || {
            let guarded = StatementGuard::check(Statement::new(query, params.to_vec()), verb)?;
            self.with_session(|session| {
                QueryExecutor::new(session).apply(&guarded)?;
                Ok(success.to_string())
            })
        })
    }

    fn with_session<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let descriptor = self.params.descriptor()?;
        self.factory.with_session(&descriptor, body)
    }

    fn operation<F>(&self, name: &str, body: F) -> Result<Response>
    where
        F: FnOnce() -> Result<String>,
    {
        let span = info_span!("operation", operation = name, request_id = %Uuid::new_v4());
        let _entered = span.enter();
        respond(name, body())
    }
}
