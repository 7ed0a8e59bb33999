use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::Client;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, Credential};
use tracing::{debug, info};

use crate::client::DocumentClient;
use crate::error::ClientError;
use crate::types::{BulkOutcome, Credentials, UpdateOne, WriteError};

/// [`DocumentClient`] backed by the official MongoDB driver.
#[derive(Debug, Clone, Default)]
pub struct MongoClient {
    app_name: Option<String>,
}

pub struct MongoSession {
    client: Client,
}

impl MongoClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name reported to the server in the connection handshake.
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }
}

#[async_trait]
impl DocumentClient for MongoClient {
    type Session = MongoSession;

    async fn connect(
        &self,
        target: &str,
        credentials: Option<&Credentials>,
    ) -> Result<MongoSession, ClientError> {
        let mut options =
            ClientOptions::parse(target)
                .await
                .map_err(|e| ClientError::InvalidTarget {
                    target: target.to_string(),
                    reason: e.to_string(),
                })?;

        if let Some(creds) = credentials {
            let mut credential = Credential::default();
            credential.username = Some(creds.username.clone());
            credential.password = Some(creds.password.clone());
            credential.source = creds.source.clone();
            options.credential = Some(credential);
        }
        if let Some(name) = &self.app_name {
            options.app_name = Some(name.clone());
        }

        let client = Client::with_options(options)?;

        // The driver connects lazily; a ping forces server selection.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ClientError::Unreachable {
                target: target.to_string(),
                reason: e.to_string(),
            })?;

        info!(server = target, "connected to mongodb");
        Ok(MongoSession { client })
    }

    async fn list_databases(&self, session: &MongoSession) -> Result<Vec<String>, ClientError> {
        Ok(session.client.list_database_names().await?)
    }

    async fn list_collections(
        &self,
        session: &MongoSession,
        database: &str,
    ) -> Result<Vec<String>, ClientError> {
        Ok(session
            .client
            .database(database)
            .list_collection_names()
            .await?)
    }

    async fn fetch_all(
        &self,
        session: &MongoSession,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Document>, ClientError> {
        let cursor = session
            .client
            .database(database)
            .collection::<Document>(collection)
            .find(doc! {})
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs)
    }

    async fn bulk_update(
        &self,
        session: &MongoSession,
        database: &str,
        collection: &str,
        updates: Vec<UpdateOne>,
    ) -> Result<BulkOutcome, ClientError> {
        let statements: Vec<Document> = updates
            .into_iter()
            .map(|u| {
                doc! {
                    "q": { "_id": u.id },
                    "u": { "$set": u.set },
                    "multi": false,
                    "upsert": false,
                }
            })
            .collect();
        let count = statements.len();

        let result = session
            .client
            .database(database)
            .run_command(doc! {
                "update": collection,
                "updates": statements,
                "ordered": false,
            })
            .await;
        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                return match rejected_batch(&e.kind) {
                    Some(outcome) => {
                        debug!(database, collection, count, error = %e, "update command rejected");
                        Ok(outcome)
                    }
                    None => Err(e.into()),
                };
            }
        };
        debug!(database, collection, count, ?reply, "update command reply");

        Ok(parse_update_reply(&reply))
    }

    async fn close(&self, session: MongoSession) {
        session.client.shutdown().await;
        debug!("mongodb client shut down");
    }
}

// ── Reply parsing ───────────────────────────────────────────────

fn number(doc: &Document, key: &str) -> Option<i64> {
    match doc.get(key)? {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        // Integral doubles only; 2^63 itself is out of range for i64.
        Bson::Double(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            Some(*n as i64)
        }
        _ => None,
    }
}

fn count(doc: &Document, key: &str) -> u64 {
    number(doc, key)
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}

fn code(doc: &Document) -> i32 {
    number(doc, "code")
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(0)
}

fn parse_update_reply(reply: &Document) -> BulkOutcome {
    let mut write_errors: Vec<WriteError> = reply
        .get_array("writeErrors")
        .map(|errors| {
            errors
                .iter()
                .filter_map(Bson::as_document)
                .map(|e| WriteError {
                    index: number(e, "index").and_then(|n| usize::try_from(n).ok()),
                    code: code(e),
                    message: e.get_str("errmsg").unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    if let Ok(concern) = reply.get_document("writeConcernError") {
        write_errors.push(WriteError {
            index: None,
            code: code(concern),
            message: concern.get_str("errmsg").unwrap_or_default().to_string(),
        });
    }

    BulkOutcome {
        acknowledged: number(reply, "ok") == Some(1),
        matched: count(reply, "n"),
        modified: count(reply, "nModified"),
        write_errors,
    }
}

/// The server refused the whole `update` command. The batch was delivered,
/// so this is a failed batch rather than a transport problem.
fn rejected_batch(kind: &ErrorKind) -> Option<BulkOutcome> {
    let (code, message) = match kind {
        ErrorKind::Command(e) => (e.code, e.message.clone()),
        ErrorKind::Write(WriteFailure::WriteError(e)) => (e.code, e.message.clone()),
        ErrorKind::Write(WriteFailure::WriteConcernError(e)) => (e.code, e.message.clone()),
        _ => return None,
    };
    Some(BulkOutcome {
        acknowledged: false,
        write_errors: vec![WriteError {
            index: None,
            code,
            message,
        }],
        ..Default::default()
    })
}
