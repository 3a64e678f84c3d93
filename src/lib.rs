//! Polyglot static code indexer.
//!
//! Walks a repository, parses every supported source file with tree-sitter,
//! and produces a property graph of code entities (modules, classes, structs,
//! functions, methods) and their relationships (DEFINES, DEFINES_METHOD,
//! IMPORTS, INHERITS, CALLS). The graph is pushed through a batched
//! [`ingest::Ingestor`] sink; a filesystem watcher keeps it incrementally
//! current as files change.
//!
//! The indexer runs in two passes over every file: pass 1 emits structural
//! nodes and edges and fills the symbol table, pass 2 resolves call sites
//! against the completed table. The pass boundary is observable through
//! `Ingestor::flush_all`.

pub mod analysis;
pub mod config;
pub mod error;
pub mod graph;
pub mod indexing;
pub mod ingest;
pub mod logging;
pub mod parsing;
pub mod watcher;

pub use config::Settings;
pub use error::{IndexError, IndexResult};
pub use graph::{NodeLabel, NodeRef, RelType};
pub use indexing::GraphUpdater;
pub use ingest::Ingestor;
pub use parsing::Language;
