use async_trait::async_trait;
use bson::Document;

use crate::error::ClientError;
use crate::types::{BulkOutcome, Credentials, UpdateOne};

/// The narrow slice of a document database driver the mutator depends on.
///
/// A session is handed out by `connect` and returned through `close`, which
/// takes it by value so that a session can only ever be released once.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    type Session: Send + Sync;

    async fn connect(
        &self,
        target: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Self::Session, ClientError>;

    async fn list_databases(&self, session: &Self::Session) -> Result<Vec<String>, ClientError>;

    async fn list_collections(
        &self,
        session: &Self::Session,
        database: &str,
    ) -> Result<Vec<String>, ClientError>;

    async fn fetch_all(
        &self,
        session: &Self::Session,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Document>, ClientError>;

    /// Submit every update in one round trip. Per-item failures are reported
    /// in the outcome; only transport failures surface as `Err`.
    async fn bulk_update(
        &self,
        session: &Self::Session,
        database: &str,
        collection: &str,
        updates: Vec<UpdateOne>,
    ) -> Result<BulkOutcome, ClientError>;

    async fn close(&self, session: Self::Session);
}
