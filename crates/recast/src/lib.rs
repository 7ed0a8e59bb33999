mod batch;
mod config;
mod error;
mod mutator;
mod report;
mod request;
mod state;
mod transform;
mod validate;

pub use batch::BatchWriter;
pub use config::MutatorConfig;
pub use error::MutatorError;
pub use mutator::Mutator;
pub use report::{CollectionReport, MutationReport};
pub use request::{
    IntoPattern, IntoReplacement, MutationRequest, MutationRequestBuilder, Pattern, Replacement,
};
pub use state::ExecutionState;
pub use transform::{ID_FIELD, Transformer, UnsupportedField};

pub use recast_client::{Credentials, DocumentClient};
