use bson::Document;
use recast_client::{BulkOutcome, DocumentClient, UpdateOne};
use tracing::info;

use crate::error::MutatorError;
use crate::transform::ID_FIELD;

/// Writes one collection's transformed documents back in a single bulk call.
pub struct BatchWriter<'a, C: DocumentClient> {
    client: &'a C,
    session: &'a C::Session,
    database: &'a str,
}

impl<'a, C: DocumentClient> BatchWriter<'a, C> {
    pub fn new(client: &'a C, session: &'a C::Session, database: &'a str) -> Self {
        Self {
            client,
            session,
            database,
        }
    }

    /// Transport failures surface as [`MutatorError::Connection`]; anything
    /// short of a fully acknowledged batch is a [`MutatorError::BatchWrite`]
    /// carrying every per-item error.
    pub async fn write(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<BulkOutcome, MutatorError> {
        let updates = to_updates(collection, documents)?;
        if updates.is_empty() {
            info!(database = self.database, collection, "nothing to write");
            return Ok(BulkOutcome {
                acknowledged: true,
                ..Default::default()
            });
        }

        let count = updates.len();
        let outcome = self
            .client
            .bulk_update(self.session, self.database, collection, updates)
            .await?;

        if !outcome.is_success() {
            return Err(MutatorError::BatchWrite {
                collection: collection.to_string(),
                errors: outcome.write_errors,
            });
        }

        info!(
            database = self.database,
            collection,
            count,
            matched = outcome.matched,
            modified = outcome.modified,
            "batch acknowledged"
        );
        Ok(outcome)
    }
}

/// Turn each document into "update the document with this `_id`, setting
/// every other field".
fn to_updates(collection: &str, documents: Vec<Document>) -> Result<Vec<UpdateOne>, MutatorError> {
    documents
        .into_iter()
        .map(|mut set| {
            let id = set
                .remove(ID_FIELD)
                .ok_or_else(|| MutatorError::MissingIdentity {
                    collection: collection.to_string(),
                })?;
            Ok(UpdateOne { id, set })
        })
        .collect()
}
