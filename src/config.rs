// ⚙️ Ingestion configuration

use crate::archive::ArchiveResolver;
use crate::parser::Dialect;
use crate::reconciliation::ReconciliationEngine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub db_path: PathBuf,

    /// Where compressed payloads are extracted; system temp dir when unset
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Placeholder opponent attached to bye-week meets
    #[serde(default = "default_bye_team_code")]
    pub bye_team_code: String,

    /// Inner-file preference inside a compressed container
    #[serde(default = "default_extension_priority")]
    pub extension_priority: Vec<Dialect>,
}

fn default_bye_team_code() -> String {
    "BYE".to_string()
}

fn default_extension_priority() -> Vec<Dialect> {
    vec![Dialect::Cl2, Dialect::Hy3]
}

impl IngestConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        IngestConfig {
            db_path: db_path.into(),
            scratch_dir: None,
            bye_team_code: default_bye_team_code(),
            extension_priority: default_extension_priority(),
        }
    }

    pub fn with_scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    pub fn resolver(&self) -> ArchiveResolver {
        ArchiveResolver::new(self.scratch_dir.clone(), self.extension_priority.clone())
    }

    pub fn engine(&self) -> ReconciliationEngine {
        ReconciliationEngine::with_bye_team(self.bye_team_code.clone())
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::new("swim-registrar.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.bye_team_code, "BYE");
        assert_eq!(config.extension_priority, vec![Dialect::Cl2, Dialect::Hy3]);
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: IngestConfig =
            serde_json::from_str(r#"{"db_path": "/tmp/meets.db", "extension_priority": ["hy3"]}"#)
                .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/meets.db"));
        assert_eq!(config.bye_team_code, "BYE");
        assert_eq!(config.extension_priority, vec![Dialect::Hy3]);
    }
}
