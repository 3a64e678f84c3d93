//! Recording test double for the ingestor contract.
//!
//! Records every call so tests can assert over the full ingestion trace.
//! Lives in the library (not behind `cfg(test)`) because integration tests
//! drive the real orchestrator against it.

use crate::error::IndexResult;
use crate::graph::{NodeLabel, NodeRef, Props, RelType};
use crate::ingest::Ingestor;

/// An ingestor that records calls instead of talking to a store.
#[derive(Debug, Default)]
pub struct RecordingIngestor {
    pub nodes: Vec<(NodeLabel, Props)>,
    pub relationships: Vec<(NodeRef, RelType, NodeRef)>,
    pub writes: Vec<(String, Props)>,
    pub flush_count: usize,
}

impl RecordingIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key values of all recorded nodes with the given label.
    pub fn node_keys(&self, label: NodeLabel) -> Vec<String> {
        let key_attr = label.key_attr();
        self.nodes
            .iter()
            .filter(|(l, _)| *l == label)
            .filter_map(|(_, p)| p.get(key_attr).and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .collect()
    }

    /// The recorded properties of the node with the given label and key.
    pub fn node_props(&self, label: NodeLabel, key: &str) -> Option<&Props> {
        let key_attr = label.key_attr();
        self.nodes
            .iter()
            .filter(|(l, _)| *l == label)
            .map(|(_, p)| p)
            .find(|p| p.get(key_attr).and_then(|v| v.as_str()) == Some(key))
    }

    /// All `(from_key, to_key)` pairs for a relationship type.
    pub fn edges(&self, rel: RelType) -> Vec<(String, String)> {
        self.relationships
            .iter()
            .filter(|(_, r, _)| *r == rel)
            .map(|(f, _, t)| (f.key.clone(), t.key.clone()))
            .collect()
    }

    /// True if an edge of the given type connects the two keys.
    pub fn has_edge(&self, rel: RelType, from_key: &str, to_key: &str) -> bool {
        self.relationships
            .iter()
            .any(|(f, r, t)| *r == rel && f.key == from_key && t.key == to_key)
    }

    /// The deduplicated trace as comparable sets, for idempotence checks.
    pub fn trace(
        &self,
    ) -> (
        std::collections::BTreeSet<String>,
        std::collections::BTreeSet<String>,
    ) {
        let nodes = self
            .nodes
            .iter()
            .map(|(l, p)| format!("{}|{}", l.as_str(), serde_json::Value::Object(p.clone())))
            .collect();
        let rels = self
            .relationships
            .iter()
            .map(|(f, r, t)| format!("{}|{}|{}|{}|{}", f.label, f.key, r, t.label, t.key))
            .collect();
        (nodes, rels)
    }
}

impl Ingestor for RecordingIngestor {
    fn ensure_node_batch(&mut self, label: NodeLabel, props: Props) {
        self.nodes.push((label, props));
    }

    fn ensure_relationship_batch(&mut self, from: NodeRef, rel: RelType, to: NodeRef) {
        self.relationships.push((from, rel, to));
    }

    fn execute_write(&mut self, query: &str, params: Props) -> IndexResult<()> {
        self.writes.push((query.to_string(), params));
        Ok(())
    }

    fn flush_all(&mut self) -> IndexResult<()> {
        self.flush_count += 1;
        Ok(())
    }
}
