//! File system walker for discovering source files to index.
//!
//! Traversal honors .gitignore rules plus a built-in ignore set of VCS
//! metadata, dependency caches, and build output. The same ignore rules
//! govern the watcher's event filter.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::IndexingConfig;
use crate::parsing::registry::LanguageDef;

/// Directory names that short-circuit traversal.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    "target",
    ".venv",
    "venv",
    "build",
    "dist",
    ".idea",
    ".vscode",
];

/// True when any path component is in the built-in ignore set.
pub fn is_ignored(path: &Path) -> bool {
    path.components().any(|comp| {
        comp.as_os_str()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
    })
}

/// Walks a repository yielding `(absolute_path, language)` pairs.
pub struct RepoWalker {
    root: PathBuf,
    config: IndexingConfig,
}

impl RepoWalker {
    pub fn new(root: &Path, config: &IndexingConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config: config.clone(),
        }
    }

    /// Enumerate supported source files, sorted for deterministic scans.
    pub fn walk(&self) -> Vec<(PathBuf, &'static LanguageDef)> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(self.config.respect_gitignore)
            .git_global(false)
            .git_exclude(self.config.respect_gitignore)
            .follow_links(false)
            .require_git(false)
            .filter_entry(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !IGNORED_DIRS.contains(&name))
            });

        let mut override_builder = ignore::overrides::OverrideBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = override_builder.add(&format!("!{pattern}")) {
                tracing::warn!(target: "codegraph::walker", "invalid ignore pattern '{pattern}': {e}");
            }
        }
        if let Ok(overrides) = override_builder.build() {
            builder.overrides(overrides);
        }

        let mut files: Vec<(PathBuf, &'static LanguageDef)> = builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter_map(|entry| {
                let path = entry.path();
                let def = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(LanguageDef::by_extension)?;
                Some((path.to_path_buf(), def))
            })
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }

    pub fn count_files(&self) -> usize {
        self.walk().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn walk_finds_supported_files_only() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("main.py"), "def main(): pass\n").unwrap();
        fs::write(root.join("lib.rs"), "pub fn lib() {}\n").unwrap();
        fs::write(root.join("README.md"), "# Test\n").unwrap();

        let walker = RepoWalker::new(root, &IndexingConfig::default());
        let files = walker.walk();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn ignored_dirs_short_circuit() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x\n").unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/app.js"), "function f() {}\n").unwrap();

        let walker = RepoWalker::new(root, &IndexingConfig::default());
        let files = walker.walk();
        assert_eq!(files.len(), 1);
        assert!(files[0].0.ends_with("src/app.js"));
    }

    #[test]
    fn is_ignored_checks_components() {
        assert!(is_ignored(Path::new("/repo/.git/config")));
        assert!(is_ignored(Path::new("/repo/node_modules/x.js")));
        assert!(!is_ignored(Path::new("/repo/src/x.js")));
    }
}
