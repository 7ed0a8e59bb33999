use std::fmt::Display;

use recast_client::{ClientError, WriteError};

use crate::state::ExecutionState;

#[derive(Debug, thiserror::Error)]
pub enum MutatorError {
    #[error("{0}")]
    Configuration(String),

    #[error("Invalid input: find takes a regular expression as an argument")]
    InvalidPattern,

    #[error("invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("unsupported regular expression flag: {0}")]
    RegexFlag(char),

    #[error("Invalid input: replace_with takes a string, number, or boolean as input")]
    InvalidReplacement,

    #[error("no pattern was set: call find before replace_with")]
    MissingPattern,

    #[error("no replacement was set: call replace_with before build")]
    MissingReplacement,

    #[error("{0}")]
    Connectivity(String),

    #[error("field {field} of document {id} in {collection} is {kind}, not a string")]
    FieldType {
        collection: String,
        id: String,
        field: String,
        kind: String,
    },

    #[error("a document in {collection} has no _id")]
    MissingIdentity { collection: String },

    #[error("batch write to {collection} failed: {}", describe_write_errors(.errors))]
    BatchWrite {
        collection: String,
        errors: Vec<WriteError>,
    },

    #[error("connection error: {0}")]
    Connection(#[from] ClientError),

    #[error("mutation did not complete: {}", join(.0))]
    Aborted(Vec<MutatorError>),

    #[error("illegal state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ExecutionState,
        to: ExecutionState,
    },

    #[error("this mutator has already executed")]
    AlreadyExecuted,
}

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_write_errors(errors: &[WriteError]) -> String {
    if errors.is_empty() {
        "the server did not acknowledge the batch".to_string()
    } else {
        join(errors)
    }
}
