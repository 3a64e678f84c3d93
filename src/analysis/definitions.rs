//! Pass 1: definition processing.
//!
//! Walks each file's tree emitting Module/Class/Struct/Function/Method
//! nodes plus DEFINES, DEFINES_METHOD, and INHERITS edges, and records
//! every definition in the symbol table. Out-of-class method definitions
//! whose owner has not been scanned yet are parked in a pending map and
//! drained when the owner appears, or at end of file.

use serde_json::json;
use std::collections::HashMap;
use tracing::debug;
use tree_sitter::Node;

use crate::analysis::imports::ImportProcessor;
use crate::analysis::qualified::QnBuilder;
use crate::analysis::scope::{Classified, ScopeKind, ScopeStack, Scoper};
use crate::analysis::symbols::{DefinitionInfo, SymbolKind, SymbolTable, Target};
use crate::analysis::FileContext;
use crate::error::IndexResult;
use crate::graph::{NodeLabel, NodeRef, Props, RelType, props};
use crate::ingest::Ingestor;
use crate::parsing::syntax::{DefCaptureKind, end_line, start_line};
use crate::parsing::{CachedTree, Language, QueryBundle, QueryKind};

/// Maximum tree depth walked before a subtree is skipped, protecting
/// against pathological nesting.
const MAX_WALK_DEPTH: usize = 500;

pub struct DefinitionProcessor<'a> {
    qn: &'a QnBuilder,
}

impl<'a> DefinitionProcessor<'a> {
    pub fn new(qn: &'a QnBuilder) -> Self {
        Self { qn }
    }

    pub fn process_file(
        &self,
        ctx: &FileContext,
        tree: &CachedTree,
        bundle: &QueryBundle,
        table: &mut SymbolTable,
        sink: &mut dyn Ingestor,
    ) -> IndexResult<()> {
        let src = &tree.source;
        let root = tree.root();
        let syntax = ctx.language.syntax();

        // Module node and its containment edge.
        let module_name = ctx
            .module_qn
            .rsplit('.')
            .next()
            .unwrap_or(&ctx.module_qn)
            .to_string();
        sink.ensure_node_batch(
            NodeLabel::Module,
            props([
                ("path", json!(ctx.rel_path)),
                ("qualified_name", json!(ctx.module_qn)),
                ("name", json!(module_name)),
                ("language", json!(ctx.language.language.id())),
            ]),
        );
        sink.ensure_relationship_batch(
            ctx.parent.clone(),
            ctx.parent_rel,
            NodeRef::new(NodeLabel::Module, &ctx.rel_path),
        );

        // Imports first, so base-class and owner resolution can use the
        // module's bindings.
        let import_nodes: Vec<Node> = bundle
            .captures(QueryKind::Imports, root, src)
            .into_iter()
            .map(|c| c.node)
            .collect();
        let stmts = syntax.imports(root, &import_nodes, src);
        ImportProcessor::new(self.qn).process(&stmts, ctx, table, sink);

        if let Some(export) = syntax.default_export(root, src)
            && let Some(module) = table.module_mut(&ctx.rel_path)
        {
            module.default_export = Some(export);
        }

        let def_nodes = collect_def_nodes(bundle, root, src);
        let bases = collect_bases(bundle, root, src);
        let scoper = Scoper::new(syntax, def_nodes, ctx.language.language, &ctx.rel_path);

        let mut walker = Pass1Walker {
            scoper,
            scopes: ScopeStack::for_module(&ctx.module_qn, &ctx.rel_path),
            ctx,
            table,
            sink,
            bases,
            pending: HashMap::new(),
            src,
        };
        walker.visit(root, 0);
        walker.drain_pending();

        Ok(())
    }
}

/// Map definition-query captures to their capture kinds, keyed by node id.
pub fn collect_def_nodes(
    bundle: &QueryBundle,
    root: Node,
    src: &str,
) -> HashMap<usize, DefCaptureKind> {
    let mut map = HashMap::new();
    for capture in bundle.captures(QueryKind::Definitions, root, src) {
        let kind = match capture.capture_name.as_str() {
            "function.definition" => DefCaptureKind::Function,
            "function.anonymous" => DefCaptureKind::AnonymousFunction,
            "method.definition" => DefCaptureKind::Method,
            "class.definition" => DefCaptureKind::Class,
            "struct.definition" => DefCaptureKind::Struct,
            "namespace.definition" => DefCaptureKind::Namespace,
            "impl.block" => DefCaptureKind::ImplBlock,
            _ => continue,
        };
        map.insert(capture.node.id(), kind);
    }
    map
}

/// Group inheritance-query hits by the class node's id.
fn collect_bases(bundle: &QueryBundle, root: Node, src: &str) -> HashMap<usize, Vec<String>> {
    let mut map: HashMap<usize, Vec<String>> = HashMap::new();
    for hit in bundle.run(QueryKind::Inheritance, root, src) {
        let Some(name_capture) = hit.capture("class.name") else {
            continue;
        };
        let Some(class_node) = name_capture.node.parent() else {
            continue;
        };
        let entry = map.entry(class_node.id()).or_default();
        for base in hit.all("inheritance.base") {
            let text = base
                .node
                .utf8_text(src.as_bytes())
                .unwrap_or("")
                .split('<')
                .next()
                .unwrap_or("")
                .trim()
                .replace("::", ".");
            // Plain dotted names only; keyword arguments and computed
            // bases are not inheritance.
            let plain = !text.is_empty()
                && text != "object"
                && text != "virtual"
                && text
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
            if plain {
                entry.push(text);
            }
        }
    }
    map
}

struct Pass1Walker<'a, 'b> {
    scoper: Scoper<'a>,
    scopes: ScopeStack,
    ctx: &'b FileContext,
    table: &'b mut SymbolTable,
    sink: &'b mut dyn Ingestor,
    bases: HashMap<usize, Vec<String>>,
    /// owner QN -> DEFINES_METHOD edges waiting for the owner's label.
    pending: HashMap<String, Vec<String>>,
    src: &'b str,
}

impl Pass1Walker<'_, '_> {
    fn visit(&mut self, node: Node, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            debug!(
                target: "codegraph::definitions",
                "max walk depth exceeded at {}:{}", self.ctx.rel_path,
                start_line(node)
            );
            return;
        }

        if let Some(classified) = self.scoper.classify(node, self.src, &self.scopes, self.table) {
            self.emit(&classified, node);
            self.scopes.push(classified.frame.clone());
            for i in 0..node.named_child_count() {
                if let Some(child) = node.named_child(i as u32) {
                    self.visit(child, depth + 1);
                }
            }
            self.scopes.pop();
        } else {
            for i in 0..node.named_child_count() {
                if let Some(child) = node.named_child(i as u32) {
                    self.visit(child, depth + 1);
                }
            }
        }
    }

    fn emit(&mut self, classified: &Classified, node: Node) {
        match classified.kind {
            SymbolKind::Class | SymbolKind::Struct => {
                // Impl blocks and namespaces reuse Struct/Module kinds but
                // carry no label; they only contribute scope.
                if classified.frame.label.is_none() {
                    return;
                }
                self.emit_type(classified, node);
            }
            SymbolKind::Function | SymbolKind::Method => self.emit_callable(classified, node),
            SymbolKind::Module => {}
        }
    }

    fn emit_type(&mut self, classified: &Classified, node: Node) {
        let label = classified.kind.label();
        let mut p = self.span_props(classified, node);
        if let Some(doc) = self.scoper.syntax.docstring(node, self.src) {
            p.insert("docstring".to_string(), json!(doc));
        }
        self.sink.ensure_node_batch(label, p);

        let parent = self.scopes.nearest_emittable();
        self.sink.ensure_relationship_batch(
            NodeRef::new(parent.label.unwrap_or(NodeLabel::Module), &parent.key),
            RelType::Defines,
            NodeRef::new(label, &classified.qn),
        );

        self.register(classified, node, Vec::new(), Vec::new());
        self.bind_module_level(classified);
        self.emit_inherits(classified, node);

        // Out-of-class methods seen before this class bind to it now.
        if let Some(methods) = self.pending.remove(&classified.qn) {
            for method_qn in methods {
                self.sink.ensure_relationship_batch(
                    NodeRef::new(label, &classified.qn),
                    RelType::DefinesMethod,
                    NodeRef::new(NodeLabel::Method, &method_qn),
                );
            }
        }
    }

    fn emit_callable(&mut self, classified: &Classified, node: Node) {
        let label = classified.kind.label();
        let mut p = self.span_props(classified, node);
        if let Some(doc) = self.scoper.syntax.docstring(node, self.src) {
            p.insert("docstring".to_string(), json!(doc));
        }
        self.sink.ensure_node_batch(label, p);

        let ret_names = self.scoper.syntax.return_type_names(node, self.src);
        let body = node.child_by_field_name("body").unwrap_or(node);
        let constructs = self.scoper.syntax.constructed_types(body, self.src);
        self.register(classified, node, ret_names, constructs);

        match (&classified.owner_qn, classified.kind) {
            (Some(owner_qn), SymbolKind::Method) => {
                match self.owner_label(owner_qn, classified.out_of_class) {
                    Some(owner_label) => {
                        self.sink.ensure_relationship_batch(
                            NodeRef::new(owner_label, owner_qn),
                            RelType::DefinesMethod,
                            NodeRef::new(NodeLabel::Method, &classified.qn),
                        );
                    }
                    None => {
                        self.pending
                            .entry(owner_qn.clone())
                            .or_default()
                            .push(classified.qn.clone());
                    }
                }
            }
            _ => {
                let parent = self.scopes.nearest_emittable();
                self.sink.ensure_relationship_batch(
                    NodeRef::new(parent.label.unwrap_or(NodeLabel::Module), &parent.key),
                    RelType::Defines,
                    NodeRef::new(label, &classified.qn),
                );
                self.bind_module_level(classified);
            }
        }
    }

    /// Label of a method's owning type: the registered definition wins,
    /// then the enclosing frame, then `None` for unseen out-of-class
    /// owners (parked in the pending map).
    fn owner_label(&self, owner_qn: &str, out_of_class: bool) -> Option<NodeLabel> {
        if let Some(def) = self.table.definition(owner_qn)
            && def.kind.is_type()
        {
            return Some(def.kind.label());
        }
        if !out_of_class {
            if let Some(label) = self.scopes.current().label {
                return Some(label);
            }
            // Inside an impl block for a type not yet registered.
            return Some(self.default_owner_label());
        }
        None
    }

    fn default_owner_label(&self) -> NodeLabel {
        if self.scoper.language == Language::Rust {
            NodeLabel::Struct
        } else {
            NodeLabel::Class
        }
    }

    fn span_props(&self, classified: &Classified, node: Node) -> Props {
        props([
            ("qualified_name", json!(classified.qn)),
            ("name", json!(classified.def.name)),
            ("start_line", json!(start_line(node))),
            ("end_line", json!(end_line(node))),
        ])
    }

    fn register(
        &mut self,
        classified: &Classified,
        node: Node,
        ret_names: Vec<String>,
        constructs: Vec<String>,
    ) {
        self.table.insert_definition(DefinitionInfo {
            qn: classified.qn.clone(),
            name: classified.def.name.clone(),
            kind: classified.kind,
            module_path: self.ctx.rel_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            ret_names,
            constructs,
        });
    }

    /// Module-visible names enter the module's symbol table so imports
    /// and in-module references resolve uniformly.
    fn bind_module_level(&mut self, classified: &Classified) {
        if !matches!(
            self.scopes.current().kind,
            ScopeKind::Module | ScopeKind::Namespace
        ) {
            return;
        }
        if let Some(module) = self.table.module_mut(&self.ctx.rel_path) {
            module.names.insert(
                classified.def.name.clone(),
                Target::InProject(classified.qn.clone()),
            );
        }
    }

    fn emit_inherits(&mut self, classified: &Classified, node: Node) {
        let Some(raws) = self.bases.get(&node.id()).cloned() else {
            return;
        };
        let class_ref = NodeRef::new(classified.kind.label(), &classified.qn);
        for raw in raws {
            self.table
                .add_base(&classified.qn, &raw, &self.ctx.rel_path);

            let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
            match self.table.resolve_path_in(&self.ctx.rel_path, &segments) {
                Some(Target::InProject(base_qn)) => {
                    let base_label = self
                        .table
                        .definition(&base_qn)
                        .map(|d| d.kind.label())
                        .unwrap_or(NodeLabel::Class);
                    self.sink.ensure_relationship_batch(
                        class_ref.clone(),
                        RelType::Inherits,
                        NodeRef::new(base_label, &base_qn),
                    );
                }
                Some(Target::External(spec)) => {
                    self.emit_external_base(&class_ref, &spec);
                }
                _ => {
                    // Unresolved bases become external placeholders.
                    self.emit_external_base(&class_ref, &raw);
                }
            }
        }
    }

    fn emit_external_base(&mut self, class_ref: &NodeRef, spec: &str) {
        self.sink.ensure_node_batch(
            NodeLabel::ExternalPackage,
            props([("qualified_name", json!(spec))]),
        );
        self.sink.ensure_relationship_batch(
            class_ref.clone(),
            RelType::Inherits,
            NodeRef::new(NodeLabel::ExternalPackage, spec),
        );
    }

    /// End of file: owners that never appeared get their method edges with
    /// the best label the table can provide. An owner with no definition
    /// at all (a Lua table acting as a class) is materialised so the
    /// methods stay reachable from the module.
    fn drain_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (owner_qn, methods) in pending {
            let known = self
                .table
                .definition(&owner_qn)
                .filter(|d| d.kind.is_type())
                .map(|d| d.kind.label());
            let label = match known {
                Some(label) => label,
                None => {
                    let label = self.default_owner_label();
                    let name = owner_qn.rsplit('.').next().unwrap_or(&owner_qn).to_string();
                    self.sink.ensure_node_batch(
                        label,
                        props([
                            ("qualified_name", json!(owner_qn)),
                            ("name", json!(name)),
                        ]),
                    );
                    self.sink.ensure_relationship_batch(
                        NodeRef::new(NodeLabel::Module, &self.ctx.rel_path),
                        RelType::Defines,
                        NodeRef::new(label, &owner_qn),
                    );
                    self.table.insert_definition(DefinitionInfo {
                        qn: owner_qn.clone(),
                        name,
                        kind: if label == NodeLabel::Struct {
                            SymbolKind::Struct
                        } else {
                            SymbolKind::Class
                        },
                        module_path: self.ctx.rel_path.clone(),
                        start_line: 0,
                        end_line: 0,
                        ret_names: Vec::new(),
                        constructs: Vec::new(),
                    });
                    label
                }
            };
            for method_qn in methods {
                self.sink.ensure_relationship_batch(
                    NodeRef::new(label, &owner_qn),
                    RelType::DefinesMethod,
                    NodeRef::new(NodeLabel::Method, &method_qn),
                );
            }
        }
    }
}
