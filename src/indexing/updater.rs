//! The graph updater orchestrator.
//!
//! Drives the two-pass full scan and the targeted incremental update.
//! Single-threaded cooperative: tree walks, query execution, symbol-table
//! mutation, and batch submission all happen on the calling thread; the
//! ingestor is only observed through its synchronous contract.

use serde_json::json;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::analysis::{CallResolver, DefinitionProcessor, FileContext, QnBuilder, SymbolTable};
use crate::config::Settings;
use crate::error::{IndexError, IndexResult};
use crate::graph::{NodeLabel, NodeRef, RelType, props};
use crate::indexing::walker::RepoWalker;
use crate::ingest::Ingestor;
use crate::parsing::registry::LanguageDef;
use crate::parsing::{Language, ParserCache, QueryBundle};

/// Cypher issued through the ingestor's escape hatch to drop a module's
/// subtree ahead of re-ingestion.
const DELETE_MODULE_SUBTREE: &str =
    "MATCH (m:Module {path: $path})-[*0..]->(c) DETACH DELETE m, c";

pub struct GraphUpdater {
    root: PathBuf,
    project: String,
    qn: QnBuilder,
    table: SymbolTable,
    parsers: ParserCache,
    bundles: HashMap<Language, QueryBundle>,
    settings: Settings,
    cancel: Arc<AtomicBool>,
}

impl GraphUpdater {
    /// Create an updater for a repository root. Query bundles compile
    /// here; a failure is a configuration error and aborts startup.
    pub fn new(root: &Path, settings: &Settings) -> IndexResult<Self> {
        let root = root.canonicalize().map_err(|e| IndexError::Config {
            reason: format!("cannot resolve repository root '{}': {e}", root.display()),
        })?;
        let project = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("repository")
            .to_string();

        let mut bundles = HashMap::new();
        for &language in Language::all() {
            bundles.insert(language, QueryBundle::compile(LanguageDef::get(language))?);
        }

        Ok(Self {
            qn: QnBuilder::new(&project),
            table: SymbolTable::new(&project),
            parsers: ParserCache::new(),
            project,
            root,
            bundles,
            settings: settings.clone(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared flag that stops enumeration between files and passes; work
    /// on the current file finishes so the graph stays self-consistent.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn rel_str(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();
        Some(parts.join("/"))
    }

    /// Full scan: pass 1 over every file, flush, pass 2 over the same
    /// trees, flush. The second flush is the transactional boundary.
    pub fn full_scan(&mut self, ingestor: &mut dyn Ingestor) -> IndexResult<()> {
        self.table = SymbolTable::new(&self.project);
        self.parsers = ParserCache::new();

        let walker = RepoWalker::new(&self.root, &self.settings.indexing);
        let files = walker.walk();
        info!(target: "codegraph::updater", "scanning {} files in {}", files.len(), self.root.display());

        // Register every module up front so import resolution does not
        // depend on processing order.
        for (path, def) in &files {
            let Some(rel) = self.rel_str(path) else {
                continue;
            };
            let module_qn = self.qn.module_qn(Path::new(&rel), def);
            self.table.register_module(&rel, &module_qn, def.language);
        }

        let package_dirs = self.emit_structure(&files, ingestor);

        // Pass 1: definitions, imports, inheritance.
        for (path, def) in &files {
            if self.cancelled() {
                info!(target: "codegraph::updater", "cancelled during definition pass");
                break;
            }
            if let Err(e) = self.pass1_file(path, def, &package_dirs, ingestor) {
                warn!(target: "codegraph::updater", "skipping {}: {e}", path.display());
            }
        }
        ingestor.flush_all()?;

        // Pass 2: call resolution over the cached trees.
        if !self.cancelled() {
            for (path, def) in &files {
                if self.cancelled() {
                    info!(target: "codegraph::updater", "cancelled during call pass");
                    break;
                }
                if let Err(e) = self.pass2_file(path, def, &package_dirs, ingestor) {
                    warn!(target: "codegraph::updater", "call pass failed for {}: {e}", path.display());
                }
                self.parsers.evict(path);
            }
        }
        ingestor.flush_all()?;
        Ok(())
    }

    /// Incremental single-file update: path-scoped delete, symbol-table
    /// purge, pass 1, pass 2, flush - in that order.
    pub fn update_file(&mut self, path: &Path, ingestor: &mut dyn Ingestor) -> IndexResult<()> {
        let Some(rel) = self.rel_str(path) else {
            debug!(target: "codegraph::updater", "ignoring path outside root: {}", path.display());
            return Ok(());
        };

        info!(target: "codegraph::updater", "updating graph for {rel}");
        ingestor.execute_write(DELETE_MODULE_SUBTREE, props([("path", json!(rel))]))?;
        self.table.purge_path(&rel);
        self.parsers.evict(path);

        let def = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(LanguageDef::by_extension);

        if let Some(def) = def
            && path.exists()
        {
            let module_qn = self.qn.module_qn(Path::new(&rel), def);
            self.table.register_module(&rel, &module_qn, def.language);

            let package_dirs = self.emit_ancestors(&rel, ingestor);
            self.pass1_file(path, def, &package_dirs, ingestor)?;
            self.pass2_file(path, def, &package_dirs, ingestor)?;
            self.parsers.evict(path);
        }

        ingestor.flush_all()?;
        Ok(())
    }

    fn pass1_file(
        &mut self,
        path: &Path,
        def: &'static LanguageDef,
        package_dirs: &HashSet<String>,
        ingestor: &mut dyn Ingestor,
    ) -> IndexResult<()> {
        let rel = self
            .rel_str(path)
            .ok_or_else(|| IndexError::General(format!("path escapes root: {}", path.display())))?;
        let source = std::fs::read_to_string(path).map_err(|e| IndexError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let ctx = self.file_context(&rel, def, package_dirs);
        let cached = self.parsers.ensure(path, def.language, source)?;
        let bundle = &self.bundles[&def.language];
        DefinitionProcessor::new(&self.qn).process_file(&ctx, cached, bundle, &mut self.table, ingestor)
    }

    fn pass2_file(
        &mut self,
        path: &Path,
        def: &'static LanguageDef,
        package_dirs: &HashSet<String>,
        ingestor: &mut dyn Ingestor,
    ) -> IndexResult<()> {
        let rel = self
            .rel_str(path)
            .ok_or_else(|| IndexError::General(format!("path escapes root: {}", path.display())))?;
        let ctx = self.file_context(&rel, def, package_dirs);
        if self.parsers.get(path).is_none() {
            // The tree was evicted or pass 1 never parsed it; re-read.
            let source = std::fs::read_to_string(path).map_err(|e| IndexError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            self.parsers.ensure(path, def.language, source)?;
        }
        let cached = self
            .parsers
            .get(path)
            .ok_or_else(|| IndexError::General(format!("no tree for {}", path.display())))?;
        let bundle = &self.bundles[&def.language];
        CallResolver::new().process_file(&ctx, cached, bundle, &self.table, ingestor)
    }

    /// Containment context for a module: project root files hang off the
    /// Project, files in package directories off their Package, the rest
    /// off their Folder.
    fn file_context(
        &self,
        rel: &str,
        def: &'static LanguageDef,
        package_dirs: &HashSet<String>,
    ) -> FileContext {
        let module_qn = self.qn.module_qn(Path::new(rel), def);
        let dir = rel.rfind('/').map(|i| &rel[..i]).unwrap_or("");
        let (parent, parent_rel) = if dir.is_empty() {
            (
                NodeRef::new(NodeLabel::Project, &self.project),
                RelType::ContainsFile,
            )
        } else if package_dirs.contains(dir) {
            (
                NodeRef::new(NodeLabel::Package, self.qn.dir_qn(Path::new(dir))),
                RelType::ContainsModule,
            )
        } else {
            (
                NodeRef::new(NodeLabel::Folder, dir),
                RelType::ContainsFile,
            )
        };
        FileContext {
            rel_path: rel.to_string(),
            module_qn,
            language: def,
            parent,
            parent_rel,
        }
    }

    /// Emit the Project node, folder hierarchy, and Package nodes for the
    /// directories the scan touches. Returns the package directories.
    fn emit_structure(
        &self,
        files: &[(PathBuf, &'static LanguageDef)],
        ingestor: &mut dyn Ingestor,
    ) -> HashSet<String> {
        ingestor.ensure_node_batch(
            NodeLabel::Project,
            props([
                ("name", json!(self.project)),
                ("path", json!(self.root.display().to_string())),
            ]),
        );

        let mut dirs: BTreeSet<String> = BTreeSet::new();
        let mut package_dirs: HashSet<String> = HashSet::new();
        for (path, def) in files {
            let Some(rel) = self.rel_str(path) else {
                continue;
            };
            let mut dir = rel.rfind('/').map(|i| rel[..i].to_string());
            if let (Some(marker), Some(d)) = (def.package_marker, dir.as_deref()) {
                let stem = Path::new(&rel)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("");
                if stem == marker {
                    package_dirs.insert(d.to_string());
                }
            }
            while let Some(d) = dir {
                if d.is_empty() {
                    break;
                }
                dir = d.rfind('/').map(|i| d[..i].to_string());
                dirs.insert(d);
            }
        }

        // BTreeSet order guarantees parents before children.
        for dir in &dirs {
            self.emit_dir(dir, &package_dirs, ingestor);
        }
        package_dirs
    }

    /// Emit the directory chain for one file during incremental updates,
    /// detecting package markers on disk.
    fn emit_ancestors(&self, rel: &str, ingestor: &mut dyn Ingestor) -> HashSet<String> {
        ingestor.ensure_node_batch(
            NodeLabel::Project,
            props([
                ("name", json!(self.project)),
                ("path", json!(self.root.display().to_string())),
            ]),
        );

        let mut chain = Vec::new();
        let mut dir = rel.rfind('/').map(|i| rel[..i].to_string());
        while let Some(d) = dir {
            if d.is_empty() {
                break;
            }
            dir = d.rfind('/').map(|i| d[..i].to_string());
            chain.push(d);
        }
        chain.reverse();

        let mut package_dirs = HashSet::new();
        for d in &chain {
            if self.dir_has_package_marker(d) {
                package_dirs.insert(d.clone());
            }
        }
        for d in &chain {
            self.emit_dir(d, &package_dirs, ingestor);
        }
        package_dirs
    }

    fn dir_has_package_marker(&self, rel_dir: &str) -> bool {
        for &language in Language::all() {
            let def = LanguageDef::get(language);
            let Some(marker) = def.package_marker else {
                continue;
            };
            for ext in language.extensions() {
                if self.root.join(rel_dir).join(format!("{marker}.{ext}")).is_file() {
                    return true;
                }
            }
        }
        false
    }

    fn emit_dir(&self, dir: &str, package_dirs: &HashSet<String>, ingestor: &mut dyn Ingestor) {
        let parent_dir = dir.rfind('/').map(|i| &dir[..i]);
        let parent_ref = match parent_dir {
            None => NodeRef::new(NodeLabel::Project, &self.project),
            Some(p) if package_dirs.contains(p) => {
                NodeRef::new(NodeLabel::Package, self.qn.dir_qn(Path::new(p)))
            }
            Some(p) => NodeRef::new(NodeLabel::Folder, p),
        };
        let name = dir.rsplit('/').next().unwrap_or(dir);

        if package_dirs.contains(dir) {
            let qn = self.qn.dir_qn(Path::new(dir));
            ingestor.ensure_node_batch(
                NodeLabel::Package,
                props([
                    ("qualified_name", json!(qn)),
                    ("path", json!(dir)),
                    ("name", json!(name)),
                ]),
            );
            ingestor.ensure_relationship_batch(
                parent_ref,
                RelType::ContainsPackage,
                NodeRef::new(NodeLabel::Package, qn),
            );
        } else {
            ingestor.ensure_node_batch(
                NodeLabel::Folder,
                props([("path", json!(dir)), ("name", json!(name))]),
            );
            ingestor.ensure_relationship_batch(
                parent_ref,
                RelType::ContainsFolder,
                NodeRef::new(NodeLabel::Folder, dir),
            );
        }
    }
}
