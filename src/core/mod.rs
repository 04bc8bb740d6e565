/// Core Module for sqlgate
///
/// This module contains the database access core: connection lifetime,
/// statement guarding, execution, catalog introspection and the error
/// taxonomy shared by all of them.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{GatewayError, Result};
