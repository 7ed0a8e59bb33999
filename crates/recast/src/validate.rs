use recast_client::DocumentClient;
use tracing::{debug, info};

use crate::config::MutatorConfig;
use crate::error::MutatorError;

/// Open a session to the configured server. Any failure is reported as a
/// connectivity problem carrying the transport's message.
pub(crate) async fn connect<C: DocumentClient>(
    client: &C,
    config: &MutatorConfig,
) -> Result<C::Session, MutatorError> {
    let session = client
        .connect(&config.connection_target, config.credentials.as_ref())
        .await
        .map_err(|e| MutatorError::Connectivity(e.to_string()))?;
    info!(server = %config.connection_target, "session opened");
    Ok(session)
}

/// Best-effort pre-flight: the database exists and so does every configured
/// collection. Nothing is locked, so the answer can go stale immediately.
pub(crate) async fn check_targets<C: DocumentClient>(
    client: &C,
    session: &C::Session,
    config: &MutatorConfig,
) -> Result<(), MutatorError> {
    let databases = client
        .list_databases(session)
        .await
        .map_err(|e| MutatorError::Connectivity(e.to_string()))?;
    if !databases.iter().any(|d| *d == config.database_name) {
        return Err(MutatorError::Connectivity(format!(
            "database {} does not exist at {}",
            config.database_name, config.connection_target
        )));
    }

    let existing = client
        .list_collections(session, &config.database_name)
        .await
        .map_err(|e| MutatorError::Connectivity(e.to_string()))?;
    let missing: Vec<&str> = config
        .collection_names
        .iter()
        .filter(|name| !existing.contains(*name))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(MutatorError::Connectivity(format!(
            "collections do not exist in database {}: {}",
            config.database_name,
            missing.join(", ")
        )));
    }

    debug!(
        database = %config.database_name,
        collections = config.collection_names.len(),
        "pre-flight checks passed"
    );
    Ok(())
}
