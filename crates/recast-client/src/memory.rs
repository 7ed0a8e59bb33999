use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bson::{Bson, Document};
use tracing::debug;

use crate::client::DocumentClient;
use crate::error::ClientError;
use crate::types::{BulkOutcome, Credentials, UpdateOne, WriteError};

const VALIDATION_FAILED: i32 = 121;

type Collections = BTreeMap<String, Vec<Document>>;

/// A record of one `bulk_update` call seen by a [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCall {
    pub database: String,
    pub collection: String,
    pub updates: usize,
}

#[derive(Default)]
struct ServerState {
    databases: BTreeMap<String, Collections>,
    rejected: Vec<(String, Bson)>,
    fail_bulk_writes: bool,
    fail_fetches: bool,
    next_session: u64,
    open: BTreeSet<u64>,
    connects: usize,
    closes: usize,
    bulk_calls: Vec<BulkCall>,
}

/// An in-process document server reachable at a single address.
///
/// Clones share the same server, so a test can keep one handle for seeding
/// and inspection while the mutator owns another.
#[derive(Clone)]
pub struct MemoryClient {
    address: String,
    credentials: Option<Credentials>,
    state: Arc<Mutex<ServerState>>,
}

/// A live handle on a [`MemoryClient`] server.
#[derive(Debug)]
pub struct MemorySession {
    id: u64,
}

impl MemoryClient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            credentials: None,
            state: Arc::new(Mutex::new(ServerState::default())),
        }
    }

    /// Refuse connections that do not present exactly these credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Seeding ─────────────────────────────────────────────────

    pub fn create_collection(&self, database: &str, collection: &str) {
        self.lock()
            .databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
    }

    pub fn insert_many(&self, database: &str, collection: &str, docs: Vec<Document>) {
        self.lock()
            .databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.lock()
            .databases
            .get(database)
            .and_then(|cols| cols.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    // ── Fault injection ─────────────────────────────────────────

    /// Make every update targeting `id` in `collection` fail with a write error.
    pub fn reject_update(&self, collection: &str, id: impl Into<Bson>) {
        self.lock()
            .rejected
            .push((collection.to_string(), id.into()));
    }

    /// Make every subsequent `bulk_update` fail at the transport level.
    pub fn fail_bulk_writes(&self) {
        self.lock().fail_bulk_writes = true;
    }

    /// Make every subsequent `fetch_all` fail at the transport level.
    pub fn fail_fetches(&self) {
        self.lock().fail_fetches = true;
    }

    // ── Inspection ──────────────────────────────────────────────

    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    pub fn open_sessions(&self) -> usize {
        self.lock().open.len()
    }

    pub fn bulk_calls(&self) -> Vec<BulkCall> {
        self.lock().bulk_calls.clone()
    }

    fn check_open(state: &ServerState, session: &MemorySession) -> Result<(), ClientError> {
        if state.open.contains(&session.id) {
            Ok(())
        } else {
            Err(ClientError::Transport(format!(
                "session {} is not open",
                session.id
            )))
        }
    }
}

#[async_trait]
impl DocumentClient for MemoryClient {
    type Session = MemorySession;

    async fn connect(
        &self,
        target: &str,
        credentials: Option<&Credentials>,
    ) -> Result<MemorySession, ClientError> {
        if target != self.address {
            return Err(ClientError::Unreachable {
                target: target.to_string(),
                reason: "connection refused".into(),
            });
        }
        let authenticated = match &self.credentials {
            Some(required) => credentials == Some(required),
            None => true,
        };
        if !authenticated {
            return Err(ClientError::Unreachable {
                target: target.to_string(),
                reason: "authentication failed".into(),
            });
        }

        let mut state = self.lock();
        state.connects += 1;
        state.next_session += 1;
        let id = state.next_session;
        state.open.insert(id);
        debug!(session = id, server = target, "memory session opened");
        Ok(MemorySession { id })
    }

    async fn list_databases(&self, session: &MemorySession) -> Result<Vec<String>, ClientError> {
        let state = self.lock();
        Self::check_open(&state, session)?;
        Ok(state.databases.keys().cloned().collect())
    }

    async fn list_collections(
        &self,
        session: &MemorySession,
        database: &str,
    ) -> Result<Vec<String>, ClientError> {
        let state = self.lock();
        Self::check_open(&state, session)?;
        Ok(state
            .databases
            .get(database)
            .map(|cols| cols.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_all(
        &self,
        session: &MemorySession,
        database: &str,
        collection: &str,
    ) -> Result<Vec<Document>, ClientError> {
        let state = self.lock();
        Self::check_open(&state, session)?;
        if state.fail_fetches {
            return Err(ClientError::Transport("cursor killed by peer".into()));
        }
        Ok(state
            .databases
            .get(database)
            .and_then(|cols| cols.get(collection))
            .cloned()
            .unwrap_or_default())
    }

    async fn bulk_update(
        &self,
        session: &MemorySession,
        database: &str,
        collection: &str,
        updates: Vec<UpdateOne>,
    ) -> Result<BulkOutcome, ClientError> {
        let mut state = self.lock();
        Self::check_open(&state, session)?;
        state.bulk_calls.push(BulkCall {
            database: database.to_string(),
            collection: collection.to_string(),
            updates: updates.len(),
        });
        if state.fail_bulk_writes {
            return Err(ClientError::Transport("connection reset by peer".into()));
        }

        let rejected: Vec<Bson> = state
            .rejected
            .iter()
            .filter(|(col, _)| col == collection)
            .map(|(_, id)| id.clone())
            .collect();

        let mut outcome = BulkOutcome {
            acknowledged: true,
            ..Default::default()
        };
        let docs = state
            .databases
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        for (index, update) in updates.into_iter().enumerate() {
            if rejected.contains(&update.id) {
                outcome.write_errors.push(WriteError {
                    index: Some(index),
                    code: VALIDATION_FAILED,
                    message: "Document failed validation".into(),
                });
                continue;
            }
            let Some(doc) = docs.iter_mut().find(|d| d.get("_id") == Some(&update.id)) else {
                continue;
            };
            outcome.matched += 1;
            let mut changed = false;
            for (key, value) in update.set {
                if doc.get(&key) != Some(&value) {
                    doc.insert(key, value);
                    changed = true;
                }
            }
            if changed {
                outcome.modified += 1;
            }
        }

        Ok(outcome)
    }

    async fn close(&self, session: MemorySession) {
        let mut state = self.lock();
        state.closes += 1;
        state.open.remove(&session.id);
        debug!(session = session.id, "memory session closed");
    }
}
