//! The analysis engine: qualified names, symbol tables, and the two
//! passes that turn parse trees into graph mutations.

pub mod calls;
pub mod definitions;
pub mod imports;
pub mod qualified;
pub mod scope;
pub mod symbols;

pub use calls::CallResolver;
pub use definitions::DefinitionProcessor;
pub use imports::ImportProcessor;
pub use qualified::QnBuilder;
pub use scope::{Frame, ScopeKind, ScopeStack};
pub use symbols::{DefinitionInfo, SymbolKind, SymbolTable, Target};

use crate::graph::{NodeRef, RelType};
use crate::parsing::registry::LanguageDef;

/// Everything the per-file processors need to know about the file being
/// analysed.
#[derive(Debug, Clone)]
pub struct FileContext {
    /// Project-relative path, `/`-separated. The Module node's key.
    pub rel_path: String,
    pub module_qn: String,
    pub language: &'static LanguageDef,
    /// Containment parent of the Module node and the edge type to it.
    pub parent: NodeRef,
    pub parent_rel: RelType,
}

impl FileContext {
    /// Project-relative directory of the file ("" at the root).
    pub fn rel_dir(&self) -> &str {
        self.rel_path
            .rfind('/')
            .map(|i| &self.rel_path[..i])
            .unwrap_or("")
    }

    /// File stem without extension.
    pub fn stem(&self) -> &str {
        let name = self
            .rel_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.rel_path);
        name.rfind('.').map(|i| &name[..i]).unwrap_or(name)
    }
}
