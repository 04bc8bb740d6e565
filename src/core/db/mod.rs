/// Database Module
///
/// This module provides the database access core of the gateway,
/// organized into focused submodules.
///
/// ## Architecture
///
/// - **Driver Seam** (`driver.rs`): backend traits, values and catalog descriptors
/// - **SQLite Driver** (`sqlite.rs`): the `rusqlite` implementation of the seam
/// - **Connection Management** (`connection.rs`): descriptors, the connection factory and scoped sessions
/// - **Statement Guard** (`guard.rs`): leading-verb and separator checks
/// - **Query Execution** (`query.rs`): runs guarded statements and materializes rows
/// - **Schema Introspection** (`schema.rs`): table and column enumeration
///
/// ## Error Handling
///
/// Driver faults surface as `DriverError` and are lifted into `GatewayError`
/// at the session boundary.
pub mod connection;
pub mod driver;
pub mod guard;
pub mod query;
pub mod schema;
pub mod sqlite;

pub use connection::*;
pub use driver::{Driver, DriverError, Value};
pub use guard::*;
pub use query::*;
pub use schema::*;
pub use sqlite::SqliteDriver;
