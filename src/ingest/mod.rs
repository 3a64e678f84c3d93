//! Abstract batching sink for graph mutations.
//!
//! Every other component writes nodes and edges through this contract and
//! never talks to a graph store directly. Batch calls are buffered;
//! `flush_all` is the durability barrier. The orchestrator uses the
//! `execute_write` escape hatch only for path-scoped deletes.

mod cypher;
mod recording;

pub use cypher::{CypherIngestor, CypherTransport, NullTransport};
pub use recording::RecordingIngestor;

use crate::error::IndexResult;
use crate::graph::{NodeLabel, NodeRef, Props, RelType};

/// Batched node/edge sink backed by a graph store.
pub trait Ingestor {
    /// Idempotent node upsert keyed by the label's declared key attribute.
    /// Properties overwrite on re-ingest.
    fn ensure_node_batch(&mut self, label: NodeLabel, props: Props);

    /// Idempotent edge upsert between two nodes identified by their
    /// `(label, key_attr, key_value)` triples.
    fn ensure_relationship_batch(&mut self, from: NodeRef, rel: RelType, to: NodeRef);

    /// Escape hatch for raw write queries (path-scoped deletes).
    fn execute_write(&mut self, query: &str, params: Props) -> IndexResult<()>;

    /// Barrier: on return, every prior batch call is durable.
    fn flush_all(&mut self) -> IndexResult<()>;
}
