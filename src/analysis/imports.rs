//! Import processing: builds per-module symbol tables from import
//! constructs and emits IMPORTS edges.

use serde_json::json;
use tracing::debug;

use crate::analysis::symbols::{SymbolTable, Target};
use crate::analysis::{FileContext, QnBuilder};
use crate::graph::{NodeLabel, NodeRef, RelType, props};
use crate::ingest::Ingestor;
use crate::parsing::Language;
use crate::parsing::syntax::{ImportStmt, ModuleSpec};

/// Where a module specifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecTarget {
    /// An in-project module.
    Module { qn: String, path: String },
    /// Anything else, keyed by the full specifier string.
    External(String),
}

pub struct ImportProcessor<'a> {
    qn: &'a QnBuilder,
}

/// Mutations one import statement produces, applied after resolution so
/// the table is not borrowed during lookups.
#[derive(Default)]
struct Effects {
    bind: Option<(String, Target)>,
    wildcard: Option<Target>,
    include: Option<String>,
    edge: Option<SpecTarget>,
}

impl<'a> ImportProcessor<'a> {
    pub fn new(qn: &'a QnBuilder) -> Self {
        Self { qn }
    }

    /// Resolve a module specifier in the context of the importing file.
    pub fn resolve_spec(
        &self,
        spec: &ModuleSpec,
        ctx: &FileContext,
        table: &SymbolTable,
    ) -> SpecTarget {
        match spec {
            ModuleSpec::External(raw) => SpecTarget::External(raw.clone()),
            ModuleSpec::Qualified {
                segments,
                relative_hops,
            } => self.resolve_qualified(segments, *relative_hops, ctx, table),
            ModuleSpec::Specifier(raw) => self.resolve_specifier(raw, ctx, table),
        }
    }

    fn resolve_qualified(
        &self,
        segments: &[String],
        hops: usize,
        ctx: &FileContext,
        table: &SymbolTable,
    ) -> SpecTarget {
        let raw = ModuleSpec::Qualified {
            segments: segments.to_vec(),
            relative_hops: hops,
        }
        .raw();
        let project = self.qn.project();

        // The package a relative import is anchored at: the module itself
        // for package-marker files, its parent otherwise.
        let is_marker = ctx
            .language
            .dropped_stems
            .contains(&ctx.stem());
        let package_qn = if is_marker {
            ctx.module_qn.clone()
        } else {
            parent_qn(&ctx.module_qn)
        };

        let mut candidates: Vec<String> = Vec::new();
        if hops > 0 {
            let mut base = package_qn.clone();
            for _ in 1..hops {
                base = parent_qn(&base);
            }
            candidates.push(join_segments(&base, segments));
        } else {
            match segments.first().map(String::as_str) {
                Some("crate") => {
                    candidates.push(join_segments(&format!("{project}.src"), &segments[1..]));
                    candidates.push(join_segments(project, &segments[1..]));
                }
                Some("self") => {
                    candidates.push(join_segments(&ctx.module_qn, &segments[1..]));
                }
                Some("super") => {
                    let mut base = package_qn.clone();
                    let mut rest = &segments[1..];
                    while rest.first().map(String::as_str) == Some("super") {
                        base = parent_qn(&base);
                        rest = &rest[1..];
                    }
                    candidates.push(join_segments(&base, rest));
                }
                _ => {
                    candidates.push(join_segments(project, segments));
                    candidates.push(join_segments(&package_qn, segments));
                }
            }
        }

        for candidate in candidates {
            if let Some(path) = table.module_path_of(&candidate) {
                return SpecTarget::Module {
                    qn: candidate,
                    path: path.to_string(),
                };
            }
        }
        SpecTarget::External(raw)
    }

    fn resolve_specifier(&self, raw: &str, ctx: &FileContext, table: &SymbolTable) -> SpecTarget {
        let is_relative = raw.starts_with("./") || raw.starts_with("../");
        // Quoted C++ includes resolve against the file's directory even
        // without a leading `./`.
        if !is_relative && ctx.language.language != Language::Cpp {
            return SpecTarget::External(raw.to_string());
        }

        let Some(normalized) = normalize_relative(ctx.rel_dir(), raw) else {
            return SpecTarget::External(raw.to_string());
        };

        let mut candidates = vec![normalized.clone()];
        for ext in ctx.language.language.extensions() {
            candidates.push(format!("{normalized}.{ext}"));
        }
        for ext in ctx.language.language.extensions() {
            candidates.push(format!("{normalized}/index.{ext}"));
        }

        for candidate in candidates {
            if let Some(module) = table.module(&candidate) {
                return SpecTarget::Module {
                    qn: module.qn.clone(),
                    path: candidate,
                };
            }
        }
        SpecTarget::External(raw.to_string())
    }

    /// Resolve the child module of a Rust `mod name;` declaration.
    fn resolve_child(&self, name: &str, ctx: &FileContext, table: &SymbolTable) -> Option<SpecTarget> {
        let stem = ctx.stem();
        let base = if stem == "main" || stem == "lib" {
            parent_qn(&ctx.module_qn)
        } else {
            ctx.module_qn.clone()
        };
        let candidate = format!("{base}.{name}");
        table.module_path_of(&candidate).map(|path| SpecTarget::Module {
            qn: candidate.clone(),
            path: path.to_string(),
        })
    }

    /// Apply a module's import statements to the symbol table and emit
    /// IMPORTS edges through the sink.
    pub fn process(
        &self,
        stmts: &[ImportStmt],
        ctx: &FileContext,
        table: &mut SymbolTable,
        sink: &mut dyn Ingestor,
    ) {
        for stmt in stmts {
            let mut effects = Effects::default();

            match stmt {
                ImportStmt::Module { spec, alias } => {
                    let target = self.resolve_spec(spec, ctx, table);
                    match (&target, alias) {
                        (SpecTarget::Module { qn, .. }, Some(alias)) => {
                            effects.bind = Some((alias.clone(), Target::InProject(qn.clone())));
                        }
                        (SpecTarget::Module { qn, .. }, None) => {
                            // `import a.b` binds the head segment when the
                            // head is itself an in-project module.
                            if let ModuleSpec::Qualified { segments, .. } = spec
                                && let Some(head) = segments.first()
                            {
                                let head_qn = format!("{}.{head}", self.qn.project());
                                if table.is_module_qn(&head_qn) {
                                    effects.bind =
                                        Some((head.clone(), Target::InProject(head_qn)));
                                } else if segments.len() == 1 {
                                    effects.bind =
                                        Some((head.clone(), Target::InProject(qn.clone())));
                                }
                            }
                        }
                        (SpecTarget::External(raw), alias) => {
                            let local = alias.clone().or_else(|| match spec {
                                ModuleSpec::Qualified { segments, .. } => {
                                    segments.first().cloned()
                                }
                                _ => None,
                            });
                            if let Some(local) = local {
                                effects.bind = Some((local, Target::External(raw.clone())));
                            }
                        }
                    }
                    effects.edge = Some(target);
                }
                ImportStmt::Named { spec, name, alias } => {
                    let target = self.resolve_spec(spec, ctx, table);
                    let local = alias.clone().unwrap_or_else(|| name.clone());
                    match &target {
                        SpecTarget::Module { qn, .. } => {
                            effects.bind =
                                Some((local, Target::InProject(format!("{qn}.{name}"))));
                        }
                        SpecTarget::External(raw) => {
                            effects.bind = Some((local, Target::External(raw.clone())));
                        }
                    }
                    effects.edge = Some(target);
                }
                ImportStmt::Wildcard { spec } => {
                    let target = self.resolve_spec(spec, ctx, table);
                    effects.wildcard = Some(match &target {
                        SpecTarget::Module { qn, .. } => Target::WildcardFrom(qn.clone()),
                        SpecTarget::External(raw) => Target::External(raw.clone()),
                    });
                    effects.edge = Some(target);
                }
                ImportStmt::SideEffect { spec } => {
                    let target = self.resolve_spec(spec, ctx, table);
                    if ctx.language.language == Language::Cpp
                        && let SpecTarget::Module { qn, .. } = &target
                    {
                        effects.include = Some(qn.clone());
                    }
                    effects.edge = Some(target);
                }
                ImportStmt::Child { name } => {
                    let Some(target) = self.resolve_child(name, ctx, table) else {
                        debug!(
                            target: "codegraph::imports",
                            "unresolved mod declaration '{name}' in {}", ctx.rel_path
                        );
                        continue;
                    };
                    if let SpecTarget::Module { qn, .. } = &target {
                        effects.bind = Some((name.clone(), Target::InProject(qn.clone())));
                    }
                    effects.edge = Some(target);
                }
            }

            self.apply(effects, ctx, table, sink);
        }
    }

    fn apply(
        &self,
        effects: Effects,
        ctx: &FileContext,
        table: &mut SymbolTable,
        sink: &mut dyn Ingestor,
    ) {
        let module_ref = NodeRef::new(NodeLabel::Module, &ctx.rel_path);

        if let Some(edge_target) = effects.edge {
            let edge_key = match &edge_target {
                SpecTarget::Module { path, .. } => path.clone(),
                SpecTarget::External(raw) => raw.clone(),
            };
            let fresh = table
                .module_mut(&ctx.rel_path)
                .is_some_and(|m| m.import_edges.insert(edge_key));
            // At most one IMPORTS edge per (importer, imported path).
            if fresh {
                match &edge_target {
                    SpecTarget::Module { path, .. } => {
                        sink.ensure_relationship_batch(
                            module_ref.clone(),
                            RelType::Imports,
                            NodeRef::new(NodeLabel::Module, path),
                        );
                    }
                    SpecTarget::External(raw) => {
                        sink.ensure_node_batch(
                            NodeLabel::ExternalPackage,
                            props([("qualified_name", json!(raw))]),
                        );
                        sink.ensure_relationship_batch(
                            module_ref.clone(),
                            RelType::Imports,
                            NodeRef::new(NodeLabel::ExternalPackage, raw),
                        );
                    }
                }
            }
        }

        if let Some(module) = table.module_mut(&ctx.rel_path) {
            if let Some((name, target)) = effects.bind {
                module.names.insert(name, target);
            }
            if let Some(wildcard) = effects.wildcard {
                module.wildcards.push(wildcard);
            }
            if let Some(include) = effects.include {
                module.includes.push(include);
            }
        }
    }
}

fn parent_qn(qn: &str) -> String {
    qn.rsplit_once('.')
        .map(|(parent, _)| parent.to_string())
        .unwrap_or_else(|| qn.to_string())
}

fn join_segments(base: &str, segments: &[String]) -> String {
    if segments.is_empty() {
        base.to_string()
    } else {
        format!("{base}.{}", segments.join("."))
    }
}

/// Normalize a relative specifier against a project-relative directory.
/// Returns `None` when the path escapes the project root.
fn normalize_relative(base_dir: &str, spec: &str) -> Option<String> {
    let mut parts: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };
    for part in spec.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_handles_parent_hops() {
        assert_eq!(
            normalize_relative("src", "../include/base.h"),
            Some("include/base.h".to_string())
        );
        assert_eq!(
            normalize_relative("", "./storage/Storage"),
            Some("storage/Storage".to_string())
        );
        assert_eq!(normalize_relative("", "../escape.h"), None);
    }
}
