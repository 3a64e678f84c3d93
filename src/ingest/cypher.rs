//! Reference Cypher-emitting ingestor.
//!
//! Buffers node and edge upserts, deduplicates them by key, and renders
//! parameterised `MERGE` statements on flush. The wire transport is behind
//! [`CypherTransport`] so the same batching logic serves any Bolt/HTTP
//! driver; [`NullTransport`] supports dry runs.

use indexmap::IndexMap;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::IndexResult;
use crate::graph::{NodeLabel, NodeRef, Props, RelType};
use crate::ingest::Ingestor;

/// Executes rendered Cypher statements against a store.
pub trait CypherTransport {
    fn run(&mut self, query: &str, params: &Props) -> IndexResult<()>;
}

/// Transport that discards every statement. Used for dry runs and as the
/// default when no driver is wired in.
#[derive(Debug, Default)]
pub struct NullTransport {
    pub statements: usize,
}

impl CypherTransport for NullTransport {
    fn run(&mut self, query: &str, _params: &Props) -> IndexResult<()> {
        debug!(target: "codegraph::ingest", "discarding statement: {query}");
        self.statements += 1;
        Ok(())
    }
}

/// Batching ingestor that renders upserts as parameterised Cypher.
pub struct CypherIngestor<T: CypherTransport> {
    transport: T,
    batch_size: usize,
    // (label, key value) -> props; later upserts overwrite earlier ones
    nodes: IndexMap<(NodeLabel, String), Props>,
    edges: IndexMap<(NodeRef, RelType, NodeRef), ()>,
}

impl<T: CypherTransport> CypherIngestor<T> {
    pub fn new(transport: T, batch_size: usize) -> Self {
        Self {
            transport,
            batch_size: batch_size.max(1),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn submit_nodes(&mut self) -> IndexResult<()> {
        let drained: Vec<_> = self.nodes.drain(..).collect();
        for ((label, _), props) in drained {
            let query = format!(
                "MERGE (n:{} {{{}: $key}}) SET n += $props",
                label.as_str(),
                label.key_attr()
            );
            let key = props
                .get(label.key_attr())
                .cloned()
                .unwrap_or(Value::Null);
            let mut params = Props::new();
            params.insert("key".to_string(), key);
            params.insert("props".to_string(), Value::Object(props));
            self.transport.run(&query, &params)?;
        }
        Ok(())
    }

    fn submit_edges(&mut self) -> IndexResult<()> {
        let drained: Vec<_> = self.edges.drain(..).collect();
        for ((from, rel, to), ()) in drained {
            let query = format!(
                "MATCH (a:{} {{{}: $from_key}}) MATCH (b:{} {{{}: $to_key}}) MERGE (a)-[:{}]->(b)",
                from.label.as_str(),
                from.key_attr,
                to.label.as_str(),
                to.key_attr,
                rel.as_str()
            );
            let mut params = Props::new();
            params.insert("from_key".to_string(), json!(from.key));
            params.insert("to_key".to_string(), json!(to.key));
            self.transport.run(&query, &params)?;
        }
        Ok(())
    }
}

impl<T: CypherTransport> Ingestor for CypherIngestor<T> {
    fn ensure_node_batch(&mut self, label: NodeLabel, props: Props) {
        let key = props
            .get(label.key_attr())
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        self.nodes.insert((label, key), props);
        if self.nodes.len() >= self.batch_size {
            // Nodes can be submitted eagerly; edges wait for flush so their
            // endpoints exist first.
            if let Err(e) = self.submit_nodes() {
                tracing::error!(target: "codegraph::ingest", "node batch submit failed: {e}");
            }
        }
    }

    fn ensure_relationship_batch(&mut self, from: NodeRef, rel: RelType, to: NodeRef) {
        self.edges.insert((from, rel, to), ());
    }

    fn execute_write(&mut self, query: &str, params: Props) -> IndexResult<()> {
        self.transport.run(query, &params)
    }

    fn flush_all(&mut self) -> IndexResult<()> {
        let (n, e) = (self.nodes.len(), self.edges.len());
        self.submit_nodes()?;
        self.submit_edges()?;
        info!(target: "codegraph::ingest", "flushed {n} nodes, {e} edges");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::props;

    #[test]
    fn nodes_dedupe_by_key_and_flush_renders_merge() {
        let mut ingestor = CypherIngestor::new(NullTransport::default(), 100);
        ingestor.ensure_node_batch(
            NodeLabel::Module,
            props([("path", json!("a.py")), ("language", json!("python"))]),
        );
        ingestor.ensure_node_batch(
            NodeLabel::Module,
            props([("path", json!("a.py")), ("language", json!("python"))]),
        );
        ingestor.flush_all().unwrap();
        assert_eq!(ingestor.transport().statements, 1);
    }

    #[test]
    fn edges_dedupe_by_triple() {
        let mut ingestor = CypherIngestor::new(NullTransport::default(), 100);
        let from = NodeRef::new(NodeLabel::Function, "p.main.main");
        let to = NodeRef::new(NodeLabel::Method, "p.user.User.validate");
        ingestor.ensure_relationship_batch(from.clone(), RelType::Calls, to.clone());
        ingestor.ensure_relationship_batch(from, RelType::Calls, to);
        ingestor.flush_all().unwrap();
        assert_eq!(ingestor.transport().statements, 1);
    }
}
