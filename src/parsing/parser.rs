//! Parser cache: one tree-sitter parser per language, plus per-file tree
//! caching across the two analysis passes.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tree_sitter::{Parser, Tree};

use crate::error::{IndexError, IndexResult};
use crate::parsing::Language;

/// A parsed file held for the duration of the two-pass walk.
pub struct CachedTree {
    pub tree: Tree,
    pub source: String,
    hash: Vec<u8>,
}

impl CachedTree {
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }
}

/// Holds one parser instance per language and caches trees per file.
///
/// Single-threaded cooperative: parsers are reused across files; a file's
/// tree survives from the definition pass to the call pass and is evicted
/// once the call pass completes for that file.
#[derive(Default)]
pub struct ParserCache {
    parsers: HashMap<Language, Parser>,
    trees: HashMap<PathBuf, CachedTree>,
}

impl ParserCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` for `path`, reusing the cached tree when the content
    /// hash is unchanged.
    pub fn ensure(
        &mut self,
        path: &Path,
        language: Language,
        source: String,
    ) -> IndexResult<&CachedTree> {
        let hash = Sha256::digest(source.as_bytes()).to_vec();
        let up_to_date = self
            .trees
            .get(path)
            .is_some_and(|cached| cached.hash == hash);

        if !up_to_date {
            let tree = self.parse(path, language, &source)?;
            self.trees.insert(
                path.to_path_buf(),
                CachedTree { tree, source, hash },
            );
        }
        Ok(&self.trees[path])
    }

    /// The cached tree for a path, if still resident.
    pub fn get(&self, path: &Path) -> Option<&CachedTree> {
        self.trees.get(path)
    }

    /// Drop a file's cached tree after its call pass completes.
    pub fn evict(&mut self, path: &Path) {
        self.trees.remove(path);
    }

    /// Number of resident trees.
    pub fn resident(&self) -> usize {
        self.trees.len()
    }

    fn parse(&mut self, path: &Path, language: Language, source: &str) -> IndexResult<Tree> {
        let parser = match self.parsers.entry(language) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(e) => {
                let mut parser = Parser::new();
                parser
                    .set_language(&language.grammar())
                    .map_err(|e| IndexError::Config {
                        reason: format!("cannot load {language} grammar: {e}"),
                    })?;
                e.insert(parser)
            }
        };

        // Partial trees with ERROR nodes are fine; only an outright refusal
        // (cancelled or no language) is a parse error.
        parser.parse(source, None).ok_or_else(|| IndexError::Parse {
            path: path.to_path_buf(),
            language: language.id(),
            reason: "grammar refused input".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_caches_by_content_hash() {
        let mut cache = ParserCache::new();
        let path = Path::new("/repo/a.py");

        cache
            .ensure(path, Language::Python, "def f():\n    pass\n".to_string())
            .unwrap();
        assert_eq!(cache.resident(), 1);
        let first_root = cache.get(path).unwrap().root().kind().to_string();
        assert_eq!(first_root, "module");

        // Same content: still one resident tree.
        cache
            .ensure(path, Language::Python, "def f():\n    pass\n".to_string())
            .unwrap();
        assert_eq!(cache.resident(), 1);

        cache.evict(path);
        assert!(cache.get(path).is_none());
    }

    #[test]
    fn error_nodes_do_not_fail_the_parse() {
        let mut cache = ParserCache::new();
        let path = Path::new("/repo/broken.py");
        let cached = cache
            .ensure(path, Language::Python, "def f(:\n".to_string())
            .unwrap();
        assert!(cached.root().has_error());
    }
}
