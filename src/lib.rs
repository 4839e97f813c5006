// Address History Service - Core Library
// Exposes the store, validation, and persistence modules for the CLI,
// API server, and tests

pub mod db;
pub mod error;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use db::{get_person, insert_person, list_persons, setup_database, Person};
pub use error::HistoryError;
pub use schema::{AddressPayload, FieldError, ValidationResult};
pub use store::{
    append_segment, get_current, segment_history, AddressSegment, AppendOutcome,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
