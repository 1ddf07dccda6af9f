//! Reconciler settings, loadable from JSON
use crate::errors::ReconcileError;
use serde::{Deserialize, Serialize};

/// What a cross-container move does when the destination rejects the node
/// after it has already been taken out of its source collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Put the object back where it was removed from.
    #[default]
    Restore,
    /// Leave the object outside of every collection and report `Detached`.
    Detach,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub cross_container_mismatch: MismatchPolicy,
    /// Reject `new_index` past the end instead of appending.
    pub strict_indices: bool,
}

impl ReconcilerConfig {
    pub fn from_json(text: &str) -> Result<Self, ReconcileError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_restore_and_clamp() {
        let config = ReconcilerConfig::from_json("{}").unwrap();
        assert_eq!(config, ReconcilerConfig::default());
        assert_eq!(config.cross_container_mismatch, MismatchPolicy::Restore);
        assert!(!config.strict_indices);
    }

    #[test]
    fn parses_snake_case_policy() {
        let text = r#"{ "cross_container_mismatch": "detach", "strict_indices": true }"#;
        let config = ReconcilerConfig::from_json(text).unwrap();
        assert_eq!(config.cross_container_mismatch, MismatchPolicy::Detach);
        assert!(config.strict_indices);
    }

    #[test]
    fn unknown_policy_is_a_serde_error() {
        let err =
            ReconcilerConfig::from_json(r#"{ "cross_container_mismatch": "panic" }"#).unwrap_err();
        assert!(matches!(err, ReconcileError::Serde(_)));
    }
}
