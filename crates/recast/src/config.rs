use std::path::Path;

use recast_client::Credentials;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MutatorError;

const REQUIRED_KEYS: [&str; 3] = ["connectionTarget", "databaseName", "collectionNames"];
const OPTIONAL_KEYS: [&str; 1] = ["credentials"];

const NO_CONFIG: &str = "no configuration was supplied; pass a config object with \
                         connectionTarget, databaseName and collectionNames \
                         (from the command line: --config <file.json> or RECAST_CONFIG)";

/// Where to connect and which collections to rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MutatorConfig {
    pub connection_target: String,
    pub database_name: String,
    pub collection_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

impl MutatorConfig {
    pub fn new<I, S>(
        connection_target: impl Into<String>,
        database_name: impl Into<String>,
        collection_names: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            connection_target: connection_target.into(),
            database_name: database_name.into(),
            collection_names: collection_names.into_iter().map(Into::into).collect(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Build a config from an untyped JSON object.
    ///
    /// Checks run in order and stop at the first failure:
    /// 1. a config object is present
    /// 2. every key is a known config property
    /// 3. every required key is present
    pub fn from_value(value: Option<&Value>) -> Result<Self, MutatorError> {
        let Some(Value::Object(object)) = value else {
            return Err(MutatorError::Configuration(NO_CONFIG.into()));
        };

        if let Some(key) = object
            .keys()
            .find(|k| !REQUIRED_KEYS.contains(&k.as_str()) && !OPTIONAL_KEYS.contains(&k.as_str()))
        {
            return Err(MutatorError::Configuration(format!(
                "{key} is an invalid config property"
            )));
        }

        if let Some(key) = REQUIRED_KEYS.iter().find(|k| !object.contains_key(**k)) {
            return Err(MutatorError::Configuration(format!(
                "{key} is a required config property"
            )));
        }

        let config: Self = serde_json::from_value(Value::Object(object.clone()))
            .map_err(|e| MutatorError::Configuration(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MutatorError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MutatorError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            MutatorError::Configuration(format!("failed to parse {}: {e}", path.display()))
        })?;
        Self::from_value(Some(&value))
    }

    pub fn validate(&self) -> Result<(), MutatorError> {
        if self.connection_target.trim().is_empty() {
            return Err(MutatorError::Configuration(
                "connectionTarget must not be empty".into(),
            ));
        }
        if self.database_name.trim().is_empty() {
            return Err(MutatorError::Configuration(
                "databaseName must not be empty".into(),
            ));
        }
        if self.collection_names.is_empty() {
            return Err(MutatorError::Configuration(
                "collectionNames must name at least one collection".into(),
            ));
        }
        if self.collection_names.iter().any(|c| c.trim().is_empty()) {
            return Err(MutatorError::Configuration(
                "collectionNames must not contain empty names".into(),
            ));
        }
        Ok(())
    }
}
