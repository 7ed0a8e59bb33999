mod client;
mod error;
mod types;

pub use client::DocumentClient;
pub use error::ClientError;
pub use types::{BulkOutcome, Credentials, UpdateOne, WriteError};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::{BulkCall, MemoryClient, MemorySession};

#[cfg(feature = "mongodb")]
mod mongo;

#[cfg(feature = "mongodb")]
pub use mongo::{MongoClient, MongoSession};
