//! Query runner: a uniform adapter over tree-sitter queries.
//!
//! Executes the named queries of a language's bundle against a tree and
//! yields capture records with stable capture names. No semantic work
//! happens here; higher components interpret captures through the typed
//! field accessors on the captured nodes.

use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

use crate::error::{IndexError, IndexResult};
use crate::parsing::registry::LanguageDef;

/// The named queries every language may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Definitions,
    Calls,
    Imports,
    Inheritance,
}

impl QueryKind {
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::Definitions => "definitions",
            QueryKind::Calls => "calls",
            QueryKind::Imports => "imports",
            QueryKind::Inheritance => "inheritance",
        }
    }
}

/// One captured node with its capture name.
#[derive(Debug, Clone)]
pub struct CaptureRecord<'t> {
    pub capture_name: String,
    pub node: Node<'t>,
}

/// All captures of a single query match, kept together so related
/// captures (a class name and its bases) stay correlated.
#[derive(Debug, Clone)]
pub struct QueryHit<'t> {
    pub captures: Vec<CaptureRecord<'t>>,
}

impl<'t> QueryHit<'t> {
    /// First capture with the given name, if present.
    pub fn capture(&self, name: &str) -> Option<&CaptureRecord<'t>> {
        self.captures.iter().find(|c| c.capture_name == name)
    }

    /// All captures with the given name.
    pub fn all(&self, name: &str) -> impl Iterator<Item = &CaptureRecord<'t>> {
        self.captures.iter().filter(move |c| c.capture_name == name)
    }
}

/// Compiled query bundle for one language.
pub struct QueryBundle {
    definitions: Option<Query>,
    calls: Option<Query>,
    imports: Option<Query>,
    inheritance: Option<Query>,
}

impl QueryBundle {
    /// Compile a language's query sources. A compile failure is a
    /// configuration error and fails startup.
    pub fn compile(def: &LanguageDef) -> IndexResult<Self> {
        let grammar = def.language.grammar();
        let compile = |kind: QueryKind, source: Option<&str>| -> IndexResult<Option<Query>> {
            source
                .map(|src| {
                    Query::new(&grammar, src).map_err(|e| IndexError::QueryCompile {
                        language: def.language.id(),
                        query: kind.name(),
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        Ok(Self {
            definitions: compile(QueryKind::Definitions, def.query_sources.definitions)?,
            calls: compile(QueryKind::Calls, def.query_sources.calls)?,
            imports: compile(QueryKind::Imports, def.query_sources.imports)?,
            inheritance: compile(QueryKind::Inheritance, def.query_sources.inheritance)?,
        })
    }

    fn query(&self, kind: QueryKind) -> Option<&Query> {
        match kind {
            QueryKind::Definitions => self.definitions.as_ref(),
            QueryKind::Calls => self.calls.as_ref(),
            QueryKind::Imports => self.imports.as_ref(),
            QueryKind::Inheritance => self.inheritance.as_ref(),
        }
    }

    /// Run a named query, yielding one hit per match. A missing query
    /// yields no hits.
    pub fn run<'t>(&self, kind: QueryKind, root: Node<'t>, source: &str) -> Vec<QueryHit<'t>> {
        let Some(query) = self.query(kind) else {
            return Vec::new();
        };

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, root, source.as_bytes());
        let names = query.capture_names();

        let mut hits = Vec::new();
        while let Some(m) = matches.next() {
            let captures = m
                .captures
                .iter()
                .map(|c| CaptureRecord {
                    capture_name: names[c.index as usize].to_string(),
                    node: c.node,
                })
                .collect();
            hits.push(QueryHit { captures });
        }
        hits
    }

    /// Run a named query and flatten all captures across matches.
    pub fn captures<'t>(
        &self,
        kind: QueryKind,
        root: Node<'t>,
        source: &str,
    ) -> Vec<CaptureRecord<'t>> {
        self.run(kind, root, source)
            .into_iter()
            .flat_map(|hit| hit.captures)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Language;
    use tree_sitter::Parser;

    fn parse(language: Language, source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser.set_language(&language.grammar()).unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn all_bundles_compile() {
        for &lang in Language::all() {
            QueryBundle::compile(LanguageDef::get(lang)).unwrap();
        }
    }

    #[test]
    fn python_definitions_are_captured() {
        let bundle = QueryBundle::compile(LanguageDef::get(Language::Python)).unwrap();
        let source = "class A:\n    def m(self):\n        pass\n\ndef f():\n    pass\n";
        let tree = parse(Language::Python, source);
        let caps = bundle.captures(QueryKind::Definitions, tree.root_node(), source);

        let classes = caps
            .iter()
            .filter(|c| c.capture_name == "class.definition")
            .count();
        let functions = caps
            .iter()
            .filter(|c| c.capture_name == "function.definition")
            .count();
        assert_eq!(classes, 1);
        assert_eq!(functions, 2);
    }

    #[test]
    fn inheritance_hits_keep_class_and_bases_together() {
        let bundle = QueryBundle::compile(LanguageDef::get(Language::Python)).unwrap();
        let source = "class B(A, mixin.M):\n    pass\n";
        let tree = parse(Language::Python, source);
        let hits = bundle.run(QueryKind::Inheritance, tree.root_node(), source);

        assert!(!hits.is_empty());
        let hit = &hits[0];
        assert!(hit.capture("class.name").is_some());
        assert!(hit.all("inheritance.base").count() >= 1);
    }

    #[test]
    fn missing_query_yields_no_captures() {
        let bundle = QueryBundle::compile(LanguageDef::get(Language::Lua)).unwrap();
        let source = "local x = 1\n";
        let tree = parse(Language::Lua, source);
        assert!(
            bundle
                .captures(QueryKind::Imports, tree.root_node(), source)
                .is_empty()
        );
    }
}
