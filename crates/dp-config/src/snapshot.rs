//! Config snapshots for reproducible runs.
//!
//! A snapshot pins the exact diagram and settings content a model was built
//! from, so a reported strategy can be traced back to its inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::diagram::{DiagramFile, NodeKindSpec};
use crate::resolve::SettingsPath;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// SHA-256 hash of the diagram file content.
    pub diagram_hash: String,

    #[serde(default)]
    pub diagram_path: Option<String>,

    /// SHA-256 hash of the settings content.
    #[serde(default)]
    pub settings_hash: Option<String>,

    #[serde(default)]
    pub settings_path: Option<String>,

    /// Source of the settings (for diagnostics).
    pub settings_source: String,

    /// Combined hash of all inputs (for quick comparison).
    pub combined_hash: String,

    pub summary: DiagramSummary,
}

/// Key figures of the diagram for quick reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramSummary {
    pub chance_nodes: usize,
    pub decision_nodes: usize,
    pub value_nodes: usize,

    /// Size of the full path space (None on overflow).
    pub path_count: Option<u128>,

    pub objective: String,
    pub probability_cut: bool,
    pub forbidden_paths: usize,
    pub fixed_nodes: usize,
}

impl ConfigSnapshot {
    /// Create a new snapshot from a loaded diagram file and settings.
    pub fn new(
        file: &DiagramFile,
        diagram_text: &str,
        diagram_path: Option<&std::path::Path>,
        settings: &SettingsPath,
        settings_text: Option<&str>,
    ) -> Self {
        let diagram_hash = hash_content(diagram_text);
        let settings_hash = settings_text.map(hash_content);

        let combined = format!(
            "{}:{}",
            diagram_hash,
            settings_hash.as_deref().unwrap_or("none")
        );
        let combined_hash = hash_content(&combined);

        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            diagram_hash,
            diagram_path: diagram_path.map(|p| p.display().to_string()),
            settings_hash,
            settings_path: settings.path.as_ref().map(|p| p.display().to_string()),
            settings_source: settings.source.to_string(),
            combined_hash,
            summary: build_summary(file),
        }
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot matches another (same inputs).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.combined_hash == other.combined_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.combined_hash[..12.min(self.combined_hash.len())]
    }
}

fn build_summary(file: &DiagramFile) -> DiagramSummary {
    let count = |kind| file.nodes.iter().filter(|n| n.kind == kind).count();
    let objective = serde_json::to_value(file.model.objective.kind)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    DiagramSummary {
        chance_nodes: count(NodeKindSpec::Chance),
        decision_nodes: count(NodeKindSpec::Decision),
        value_nodes: count(NodeKindSpec::Value),
        path_count: file.path_count(),
        objective,
        probability_cut: file.model.probability_cut || file.model.lazy_probability_cut,
        forbidden_paths: file.model.forbidden_paths.len(),
        fixed_nodes: file.model.fixed.len(),
    }
}

/// Hash content with SHA-256 and return hex string.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = r#"{
        "schema_version": "1.0.0",
        "nodes": [
            {"name": "O", "kind": "chance", "states": ["lemon", "peach"]},
            {"name": "T", "kind": "decision", "states": ["no test", "test"]},
            {"name": "V", "kind": "value", "information_set": ["O", "T"]}
        ]
    }"#;

    fn snapshot() -> ConfigSnapshot {
        let file = DiagramFile::from_json_str(TEXT).unwrap();
        ConfigSnapshot::new(&file, TEXT, None, &SettingsPath::default(), None)
    }

    #[test]
    fn test_snapshot_summary() {
        let s = snapshot();
        assert_eq!(s.summary.chance_nodes, 1);
        assert_eq!(s.summary.decision_nodes, 1);
        assert_eq!(s.summary.value_nodes, 1);
        assert_eq!(s.summary.path_count, Some(4));
        assert_eq!(s.summary.objective, "expected_value");
        assert_eq!(s.settings_source, "builtin default");
        assert!(s.settings_hash.is_none());
    }

    #[test]
    fn test_snapshot_short_id() {
        assert_eq!(snapshot().short_id().len(), 12);
    }

    #[test]
    fn test_snapshot_matches() {
        // Same inputs hash identically regardless of timestamp
        assert!(snapshot().matches(&snapshot()));
    }

    #[test]
    fn test_hash_content() {
        let hash1 = hash_content("test");
        let hash2 = hash_content("test");
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, hash_content("test2"));
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let s = snapshot();
        let json = s.to_json().unwrap();
        let restored = ConfigSnapshot::from_json(&json).unwrap();
        assert!(s.matches(&restored));
        assert_eq!(restored.summary.path_count, Some(4));
    }
}
