//! Configuration for the resolver and the graph maintainer.
//!
//! ```json
//! {
//!   "resolver": { "absent_gender": "assume_male" },
//!   "unknown_types": "mirror_identity",
//!   "table_path": "/etc/kinship/table.json"
//! }
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::reciprocity::{ReciprocityTable, Resolver, ResolverConfig};
use crate::{Error, Result};

/// What the maintainer does with a relationship type the table does not
/// know. The resolver hands back the type unchanged either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTypePolicy {
    /// Mirror with the same label ("mentor" ↔ "mentor").
    #[default]
    MirrorIdentity,
    /// Store the forward edge only, marked one-way.
    OneWay,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinshipConfig {
    pub resolver: ResolverConfig,
    pub unknown_types: UnknownTypePolicy,
    /// JSON reciprocity table replacing the built-in vocabulary.
    pub table_path: Option<PathBuf>,
}

impl KinshipConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn with_unknown_types(mut self, policy: UnknownTypePolicy) -> Self {
        self.unknown_types = policy;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }

    /// The configured table, or a copy of the built-in one.
    pub fn load_table(&self) -> Result<Arc<ReciprocityTable>> {
        match &self.table_path {
            Some(path) => {
                let table = ReciprocityTable::from_path(path)?;
                tracing::info!(path = %path.display(), entries = table.len(), "loaded reciprocity table");
                Ok(Arc::new(table))
            }
            None => Ok(Arc::new(ReciprocityTable::builtin().clone())),
        }
    }

    pub fn build_resolver(&self) -> Result<Resolver> {
        Ok(Resolver::new(self.load_table()?, self.resolver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reciprocity::AbsentGenderPolicy;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(KinshipConfig::from_json_str("{}").unwrap(), KinshipConfig::default());
    }

    #[test]
    fn test_parse_full() {
        let cfg = KinshipConfig::from_json_str(
            r#"{
                "resolver": { "absent_gender": "no_reciprocal" },
                "unknown_types": "one_way"
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.resolver.absent_gender, AbsentGenderPolicy::NoReciprocal);
        assert_eq!(cfg.unknown_types, UnknownTypePolicy::OneWay);
        assert!(cfg.table_path.is_none());
    }

    #[test]
    fn test_bad_policy_is_config_error() {
        let err = KinshipConfig::from_json_str(r#"{ "unknown_types": "explode" }"#).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = KinshipConfig::from_path("/nonexistent/kinship.json").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_table_path() {
        let path = std::env::temp_dir().join(format!("kinship-table-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{
                "mentor": { "male": "mentee", "female": "mentee" },
                "mentee": { "male": "mentor", "female": "mentor" }
            }"#,
        )
        .unwrap();

        let cfg = KinshipConfig { table_path: Some(path.clone()), ..Default::default() };
        let resolver = cfg.build_resolver().unwrap();
        assert_eq!(resolver.resolve("mentor", None).label(), "mentee");
        assert!(resolver.resolve("son", None).is_unknown());
        assert_eq!(
            resolver.known_relationship_types().into_iter().collect::<Vec<_>>(),
            vec!["mentee".to_string(), "mentor".to_string()]
        );

        std::fs::remove_file(path).unwrap();
    }
}
