// Core infrastructure modules
pub mod core;

// Gateway surface
pub mod codec;
pub mod config;
pub mod gateway;
pub mod prompts;
pub mod router;

// Testing infrastructure
pub mod test_utils;

pub use codec::{ErrorEnvelope, FaultKind, ResultCodec};
pub use gateway::{Gateway, Response};
pub use router::OperationTable;
