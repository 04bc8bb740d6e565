/// Query Execution Module
///
/// This module runs guarded statements against an open session. Reads are
/// drained completely and paired with the result-set column names; writes
/// are committed before the call returns.

use crate::core::db::connection::Session;
use crate::core::db::driver::Value;
use crate::core::db::guard::GuardedStatement;
use crate::core::{GatewayError, Result};
use tracing::{debug, warn};

/// Represents the materialized result of a read statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names in result-set order
    pub columns: Vec<String>,
    /// Rows in backend return order
    pub rows: Vec<Vec<Value>>,
    /// Number of rows returned
    pub row_count: usize,
}

impl QueryResult {
    /// Creates a new QueryResult from column names and row data
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        QueryResult {
            columns,
            rows,
            row_count,
        }
    }
}

/// What running a guarded statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// A read returned a result set
    Rows(QueryResult),
    /// A write was applied and committed
    Applied { rows_affected: usize },
}

/// Statement execution service bound to one session
pub struct QueryExecutor<'a> {
    session: &'a mut Session,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new QueryExecutor for the given session
    pub fn new(session: &'a mut Session) -> Self {
        QueryExecutor { session }
    }

    /// Runs a guarded statement, reading or writing according to its verb.
    pub fn run(&mut self, guarded: &GuardedStatement) -> Result<ExecutionOutcome> {
        if guarded.verb().is_write() {
            let rows_affected = self.apply(guarded)?;
            Ok(ExecutionOutcome::Applied { rows_affected })
        } else {
            Ok(ExecutionOutcome::Rows(self.fetch(guarded)?))
        }
    }

    /// Executes a read statement and returns every row it produced.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Execution` when the backend rejects the
    /// statement, and `GatewayError::ExecutionState` when it reports no
    /// result-set columns or a row does not match the column count.
    pub fn fetch(&mut self, guarded: &GuardedStatement) -> Result<QueryResult> {
        let statement = guarded.statement();
        let cursor = self.session.cursor()?;

        debug!(sql = %statement.text, params = statement.params.len(), "Executing query");
        cursor.execute(&statement.text, &statement.params)?;
        let rows = cursor.fetch_all()?;

        let columns = cursor
            .description()
            .map(<[String]>::to_vec)
            .ok_or_else(|| GatewayError::ExecutionState("statement returned no result set".to_string()))?;

        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(GatewayError::ExecutionState(format!(
                "row has {} values but the result set has {} columns",
                row.len(),
                columns.len()
            )));
        }

        Ok(QueryResult::new(columns, rows))
    }

    /// Executes a write statement and commits it.
    ///
    /// # Returns
    ///
    /// The number of rows the backend reports as affected.
    pub fn apply(&mut self, guarded: &GuardedStatement) -> Result<usize> {
        let statement = guarded.statement();
        let rows_affected = {
            let cursor = self.session.cursor()?;
            debug!(sql = %statement.text, params = statement.params.len(), "Executing write");
            cursor.execute(&statement.text, &statement.params)?;
            cursor.row_count()
        };

        if let Err(e) = self.session.commit() {
            warn!("Commit failed, pending change will be rolled back: {}", e);
            return Err(e);
        }

        debug!(rows_affected, "Write committed");
        Ok(rows_affected)
    }
}
