/// Gateway Error Module
///
/// This module defines the error taxonomy of the gateway core. Every fault
/// raised inside an operation is one of these variants; the operation
/// boundary turns all of them except `Configuration` into an error envelope.
use crate::core::db::driver::DriverError;
use thiserror::Error;

/// Error type for every gateway operation.
///
/// Variants map onto the stages of a request:
/// - building the connection descriptor (`Configuration`)
/// - opening the physical connection (`Connection`)
/// - guarding the statement text and parameters (`Validation`)
/// - running statements and catalog calls (`Execution`, `ExecutionState`)
/// - decoding call arguments and routing (`Arguments`, `UnknownOperation`)
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or invalid connection parameters, raised before any I/O
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backend unreachable, authentication failure or open failure
    #[error("Connection error: {0}")]
    Connection(#[source] DriverError),

    /// Wrong leading verb, embedded statement separator or unsupported parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// The backend rejected a statement, a catalog call or a commit
    #[error("Execution error: {0}")]
    Execution(#[from] DriverError),

    /// Execution could not proceed, or its result cannot be materialized
    #[error("Execution error: {0}")]
    ExecutionState(String),

    /// Call arguments could not be decoded or results could not be encoded
    #[error("Argument error: {0}")]
    Arguments(#[from] serde_json::Error),

    /// The operation table has no handler registered under this name
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

impl GatewayError {
    /// Returns `true` when the fault originated in the backend driver.
    pub fn is_driver_fault(&self) -> bool {
        matches!(self, GatewayError::Connection(_) | GatewayError::Execution(_))
    }
}

/// Type alias for Result to use GatewayError as the error type.
pub type Result<T> = std::result::Result<T, GatewayError>;
