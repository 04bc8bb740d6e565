//! Explicit operation table handed to the external routing layer.
//!
//! The table is built once at startup. Each entry maps an operation name to
//! a handler that decodes JSON call arguments and invokes the matching
//! `Gateway` method.

use crate::codec::ResultCodec;
use crate::core::db::Value;
use crate::core::{GatewayError, Result};
use crate::gateway::{Gateway, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Handler signature shared by every operation.
pub type Handler = fn(&Gateway, &JsonValue) -> Result<Response>;

/// One registered operation.
#[derive(Clone)]
pub struct Operation {
    pub name: &'static str,
    pub description: &'static str,
    handler: Handler,
}

#[derive(Debug, Deserialize)]
struct TableArgs {
    table_name: String,
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
    #[serde(default)]
    params: Vec<JsonValue>,
}

fn decode<T: DeserializeOwned>(args: &JsonValue) -> Result<T> {
    Ok(T::deserialize(args)?)
}

fn table_name(args: &JsonValue) -> Result<String> {
    decode::<TableArgs>(args).map(|args| args.table_name)
}

fn query_args(args: &JsonValue) -> Result<(String, Vec<Value>)> {
    let args: QueryArgs = decode(args)?;
    let params = ResultCodec::decode_params(&args.params)?;
    Ok((args.query, params))
}

fn list_tables(gateway: &Gateway, _args: &JsonValue) -> Result<Response> {
    gateway.list_tables()
}

fn list_columns(gateway: &Gateway, args: &JsonValue) -> Result<Response> {
    match table_name(args) {
        Ok(table) => gateway.list_columns(&table),
        Err(e) => gateway.reject("list_columns", e),
    }
}

fn describe_columns(gateway: &Gateway, args: &JsonValue) -> Result<Response> {
    match table_name(args) {
        Ok(table) => gateway.describe_columns(&table),
        Err(e) => gateway.reject("describe_columns", e),
    }
}

fn list_tables_with_columns(gateway: &Gateway, _args: &JsonValue) -> Result<Response> {
    gateway.list_tables_with_columns()
}

fn select_query(gateway: &Gateway, args: &JsonValue) -> Result<Response> {
    match query_args(args) {
        Ok((query, params)) => gateway.select_query(&query, &params),
        Err(e) => gateway.reject("select_query", e),
    }
}

fn insert_query(gateway: &Gateway, args: &JsonValue) -> Result<Response> {
    match query_args(args) {
        Ok((query, params)) => gateway.insert_query(&query, &params),
        Err(e) => gateway.reject("insert_query", e),
    }
}

fn update_query(gateway: &Gateway, args: &JsonValue) -> Result<Response> {
    match query_args(args) {
        Ok((query, params)) => gateway.update_query(&query, &params),
        Err(e) => gateway.reject("update_query", e),
    }
}

fn help_build_query(gateway: &Gateway, args: &JsonValue) -> Result<Response> {
    match table_name(args) {
        Ok(table) => gateway.help_build_query(&table),
        Err(e) => gateway.reject("help_build_query", e),
    }
}

fn explore_data(gateway: &Gateway, args: &JsonValue) -> Result<Response> {
    match table_name(args) {
        Ok(table) => gateway.explore_data(&table),
        Err(e) => gateway.reject("explore_data", e),
    }
}

fn use_database_schema(gateway: &Gateway, _args: &JsonValue) -> Result<Response> {
    gateway.use_database_schema()
}

/// Maps operation names to handlers.
pub struct OperationTable {
    operations: BTreeMap<&'static str, Operation>,
}

impl OperationTable {
    /// Builds the table with every gateway operation and prompt registered.
    pub fn new() -> Self {
        let mut table = OperationTable {
            operations: BTreeMap::new(),
        };
        table.register("list_tables", "List all tables in the database", list_tables);
        table.register("list_columns", "List all columns in a table", list_columns);
        table.register(
            "describe_columns",
            "List name, type and description of each column in a table",
            describe_columns,
        );
        table.register(
            "list_tables_with_columns",
            "List all tables with their column names",
            list_tables_with_columns,
        );
        table.register("select_query", "Execute a select query", select_query);
        table.register("insert_query", "Execute an insert query", insert_query);
        table.register("update_query", "Execute an update query", update_query);

        table.register("help_build_query", "Help the user build a query", help_build_query);
        table.register("explore_data", "Explore the data in a table", explore_data);
        table.register("use_database_schema", "Use the database schema", use_database_schema);
        table
    }

    fn register(&mut self, name: &'static str, description: &'static str, handler: Handler) {
        self.operations.insert(
            name,
            Operation {
                name,
                description,
                handler,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Registered operations, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Invokes the named operation with JSON arguments.
    ///
    /// Unknown names and undecodable arguments come back as `internal`
    /// error envelopes; only configuration faults are returned as `Err`.
    pub fn dispatch(&self, gateway: &Gateway, name: &str, args: &JsonValue) -> Result<Response> {
        match self.get(name) {
            Some(operation) => (operation.handler)(gateway, args),
            None => gateway.reject(name, GatewayError::UnknownOperation(name.to_string())),
        }
    }
}

impl Default for OperationTable {
    fn default() -> Self {
        OperationTable::new()
    }
}
