use bson::Document;
use recast_client::DocumentClient;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::batch::BatchWriter;
use crate::config::MutatorConfig;
use crate::error::MutatorError;
use crate::report::{CollectionReport, MutationReport};
use crate::request::MutationRequest;
use crate::state::ExecutionState;
use crate::transform::Transformer;
use crate::validate;

/// Runs one find-and-replace pass over the configured collections.
///
/// A mutator owns its client and executes at most once. Building the
/// [`MutationRequest`] never touches the database; [`Mutator::execute`] is the
/// only entry point that does.
pub struct Mutator<C: DocumentClient> {
    config: MutatorConfig,
    client: C,
    state: ExecutionState,
}

impl<C: DocumentClient> Mutator<C> {
    pub fn new(config: MutatorConfig, client: C) -> Result<Self, MutatorError> {
        config.validate()?;
        Ok(Self {
            config,
            client,
            state: ExecutionState::Idle,
        })
    }

    /// Construct from an untyped config object, see [`MutatorConfig::from_value`].
    pub fn from_value(value: Option<&Value>, client: C) -> Result<Self, MutatorError> {
        Self::new(MutatorConfig::from_value(value)?, client)
    }

    pub fn config(&self) -> &MutatorConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Validate the targets, then rewrite every configured collection in
    /// order. The session opened here is closed before returning, whatever
    /// the outcome.
    pub async fn execute(
        &mut self,
        request: &MutationRequest,
    ) -> Result<MutationReport, MutatorError> {
        if self.state != ExecutionState::Idle {
            return Err(MutatorError::AlreadyExecuted);
        }
        self.transition(ExecutionState::Validating)?;

        let session = match validate::connect(&self.client, &self.config).await {
            Ok(session) => session,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let result = self.run(&session, request).await;
        self.client.close(session).await;
        info!(server = %self.config.connection_target, "session closed");

        match result {
            Ok(report) => {
                self.transition(ExecutionState::Closed)?;
                info!(
                    database = %report.database,
                    modified = report.modified(),
                    "mutation complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        session: &C::Session,
        request: &MutationRequest,
    ) -> Result<MutationReport, MutatorError> {
        validate::check_targets(&self.client, session, &self.config).await?;
        self.transition(ExecutionState::Connected)?;

        let database = self.config.database_name.clone();
        let collections = self.config.collection_names.clone();
        let transformer = Transformer::new(request);
        let mut reports = Vec::with_capacity(collections.len());
        let mut failures = Vec::new();

        for (index, collection) in collections.iter().enumerate() {
            self.transition(ExecutionState::Processing(index))?;

            let documents = match self
                .client
                .fetch_all(session, &database, collection)
                .await
            {
                Ok(docs) => docs,
                Err(e) => {
                    failures.push(MutatorError::Connection(e));
                    break;
                }
            };
            let fetched = documents.len();
            debug!(database = %database, collection = %collection, fetched, "fetched documents");

            let transformed = match transform_all(&transformer, collection, &documents) {
                Ok(docs) => docs,
                Err(e) => {
                    warn!(collection = %collection, error = %e, "skipping collection");
                    failures.push(e);
                    continue;
                }
            };

            self.transition(ExecutionState::Saving(index))?;
            let writer = BatchWriter::new(&self.client, session, &database);
            match writer.write(collection, transformed).await {
                Ok(outcome) => reports.push(CollectionReport {
                    collection: collection.clone(),
                    fetched,
                    matched: outcome.matched,
                    modified: outcome.modified,
                }),
                Err(e @ MutatorError::Connection(_)) => {
                    failures.push(e);
                    break;
                }
                Err(e) => {
                    warn!(collection = %collection, error = %e, "batch rejected");
                    failures.push(e);
                }
            }
        }

        if !failures.is_empty() {
            return Err(MutatorError::Aborted(failures));
        }
        Ok(MutationReport {
            database,
            collections: reports,
        })
    }

    fn transition(&mut self, next: ExecutionState) -> Result<(), MutatorError> {
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state.advance(next)
    }

    fn fail(&mut self, error: &MutatorError) {
        debug_assert!(self.state.can_advance_to(ExecutionState::Failed));
        warn!(from = ?self.state, %error, "execution failed");
        self.state = ExecutionState::Failed;
    }
}

/// Transform a whole collection up front so that a bad document aborts the
/// batch before anything is written.
fn transform_all(
    transformer: &Transformer<'_>,
    collection: &str,
    documents: &[Document],
) -> Result<Vec<Document>, MutatorError> {
    documents
        .iter()
        .map(|doc| {
            transformer.apply(doc).map_err(|e| MutatorError::FieldType {
                collection: collection.to_string(),
                id: e
                    .id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "without _id".into()),
                field: e.field,
                kind: format!("{:?}", e.kind),
            })
        })
        .collect()
}
