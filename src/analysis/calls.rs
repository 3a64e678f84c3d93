//! Pass 2: call resolution.
//!
//! Runs after every module has completed pass 1, so the global symbol
//! table is complete. For each call site the resolver walks a fixed
//! ladder - fully-qualified path, receiver method, bare identifier in
//! scope, static class call - and stops at the first hit. Resolution is
//! conservative: no match means no edge, and duplicate edges from the
//! same caller collapse.

use std::collections::{HashMap, HashSet};
use tracing::trace;
use tree_sitter::Node;

use crate::analysis::FileContext;
use crate::analysis::definitions::collect_def_nodes;
use crate::analysis::scope::{ScopeKind, ScopeStack, Scoper};
use crate::analysis::symbols::{SymbolKind, SymbolTable, Target};
use crate::error::IndexResult;
use crate::graph::{NodeRef, RelType};
use crate::ingest::Ingestor;
use crate::parsing::syntax::{Callee, CallShape, RValue, Recv, start_line};
use crate::parsing::{CachedTree, Language, QueryBundle, QueryKind};

const MAX_WALK_DEPTH: usize = 500;

pub struct CallResolver;

impl CallResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn process_file(
        &self,
        ctx: &FileContext,
        tree: &CachedTree,
        bundle: &QueryBundle,
        table: &SymbolTable,
        sink: &mut dyn Ingestor,
    ) -> IndexResult<()> {
        let src = &tree.source;
        let root = tree.root();
        let syntax = ctx.language.syntax();

        let call_nodes: HashSet<usize> = bundle
            .captures(QueryKind::Calls, root, src)
            .into_iter()
            .filter(|c| c.capture_name == "call.site")
            .map(|c| c.node.id())
            .collect();
        let def_nodes = collect_def_nodes(bundle, root, src);
        let scoper = Scoper::new(syntax, def_nodes, ctx.language.language, &ctx.rel_path);

        let mut walker = Pass2Walker {
            scoper,
            scopes: ScopeStack::for_module(&ctx.module_qn, &ctx.rel_path),
            envs: vec![HashMap::new()],
            ctx,
            table,
            sink,
            call_nodes,
            emitted: HashSet::new(),
            src,
        };
        walker.visit(root, 0);
        Ok(())
    }
}

impl Default for CallResolver {
    fn default() -> Self {
        Self::new()
    }
}

struct Pass2Walker<'a, 'b> {
    scoper: Scoper<'a>,
    scopes: ScopeStack,
    /// One type environment per scope frame; function frames hold locals,
    /// type frames hold `self.attr` bindings shared across methods.
    envs: Vec<HashMap<String, String>>,
    ctx: &'b FileContext,
    table: &'b SymbolTable,
    sink: &'b mut dyn Ingestor,
    call_nodes: HashSet<usize>,
    emitted: HashSet<(String, String)>,
    src: &'b str,
}

impl Pass2Walker<'_, '_> {
    fn visit(&mut self, node: Node, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            return;
        }

        if let Some(classified) = self.scoper.classify(node, self.src, &self.scopes, self.table) {
            let callable = matches!(classified.kind, SymbolKind::Function | SymbolKind::Method);
            self.scopes.push(classified.frame.clone());
            self.envs.push(HashMap::new());
            if callable {
                self.seed_parameters(node);
            }
            for i in 0..node.named_child_count() {
                if let Some(child) = node.named_child(i as u32) {
                    self.visit(child, depth + 1);
                }
            }
            self.envs.pop();
            self.scopes.pop();
            return;
        }

        if let Some(binding) = self.scoper.syntax.binding(node, self.src) {
            self.record_binding(&binding);
        }
        if self.call_nodes.contains(&node.id()) {
            self.handle_call(node);
        }
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i as u32) {
                self.visit(child, depth + 1);
            }
        }
    }

    fn seed_parameters(&mut self, node: Node) {
        for param in self.scoper.syntax.parameters(node, self.src) {
            if let Some(type_qn) = self.resolve_type_names(&param.type_names) {
                if let Some(env) = self.envs.last_mut() {
                    env.insert(param.name, type_qn);
                }
            }
        }
    }

    /// First annotation identifier that resolves to an in-project type.
    fn resolve_type_names(&self, names: &[String]) -> Option<String> {
        for name in names {
            if name == "Self" {
                if let Some(qn) = self.self_type() {
                    return Some(qn);
                }
                continue;
            }
            let segments = vec![name.clone()];
            if let Some(target) = self.table.resolve_path_in(&self.ctx.rel_path, &segments)
                && let Some(qn) = self.table.type_qn_of(&target)
            {
                return Some(qn);
            }
        }
        None
    }

    fn record_binding(&mut self, binding: &crate::parsing::syntax::Binding) {
        let Some(type_qn) = self.eval_rvalue(&binding.value) else {
            return;
        };
        if binding.target.starts_with("self.") {
            if let Some(index) = self.scopes.innermost_type_index()
                && let Some(env) = self.envs.get_mut(index)
            {
                env.insert(binding.target.clone(), type_qn);
            }
        } else if let Some(env) = self.envs.last_mut() {
            env.insert(binding.target.clone(), type_qn);
        }
    }

    fn lookup_var(&self, name: &str) -> Option<String> {
        self.envs
            .iter()
            .rev()
            .find_map(|env| env.get(name).cloned())
    }

    fn eval_rvalue(&self, value: &RValue) -> Option<String> {
        match value {
            RValue::Construct(segments) => self.resolve_construct(segments),
            RValue::Call(shape) => self.call_expr_type(shape),
            RValue::Name(name) => self.lookup_var(name),
            RValue::Other => None,
        }
    }

    /// A constructed type: a `::`/`.` path, or a flat candidate list from
    /// a C-style declaration's type tokens.
    fn resolve_construct(&self, segments: &[String]) -> Option<String> {
        if segments.len() > 1 {
            let target = self.table.resolve_path_in(&self.ctx.rel_path, segments)?;
            return self.table.type_qn_of(&target);
        }
        self.resolve_type_names(segments)
    }

    /// Static type of a call expression's result: constructor calls give
    /// the constructed type, resolvable calls give their inferred return
    /// type, and Rust call chains fall back to the receiver's type so
    /// smart-pointer plumbing does not lose it.
    fn call_expr_type(&self, shape: &CallShape) -> Option<String> {
        if let Some(type_qn) = self.constructor_type(shape) {
            return Some(type_qn);
        }
        if let Some(callee_qn) = self.resolve_call(shape) {
            if let Some(ret) = self.infer_return(&callee_qn) {
                return Some(ret);
            }
        }
        if self.scoper.language == Language::Rust
            && let Callee::Member { recv, .. } = &shape.callee
        {
            return self.recv_type(recv);
        }
        None
    }

    /// The class a call constructs, when the callee path itself names a
    /// type (`User(...)`, `pkg.user.User(...)`, `Status()`).
    fn constructor_type(&self, shape: &CallShape) -> Option<String> {
        let segments: Vec<String> = match &shape.callee {
            Callee::Bare(name) => vec![name.clone()],
            Callee::Path(segments) => segments.clone(),
            Callee::Member { recv, name } => {
                let mut flat = flatten_recv(recv)?;
                flat.push(name.clone());
                flat
            }
        };
        let target = self.table.resolve_path_in(&self.ctx.rel_path, &segments)?;
        self.table.type_qn_of(&target)
    }

    fn infer_return(&self, callee_qn: &str) -> Option<String> {
        let def = self.table.definition(callee_qn)?;
        for name in def.ret_names.iter().chain(def.constructs.iter()) {
            if name == "Self" && def.kind == SymbolKind::Method {
                let owner = callee_qn.rsplit_once('.').map(|(o, _)| o)?;
                if self
                    .table
                    .definition(owner)
                    .is_some_and(|d| d.kind.is_type())
                {
                    return Some(owner.to_string());
                }
                continue;
            }
            let segments = vec![name.clone()];
            if let Some(target) = self.table.resolve_path_in(&def.module_path, &segments)
                && let Some(qn) = self.table.type_qn_of(&target)
            {
                return Some(qn);
            }
        }
        None
    }

    /// The type `self`/`this` refers to: the enclosing type frame, or for
    /// out-of-class method definitions the owner encoded in the method's
    /// own qualified name.
    fn self_type(&self) -> Option<String> {
        if let Some(frame) = self.scopes.enclosing_type() {
            return Some(frame.qn.clone());
        }
        self.scopes
            .nearest_callable()
            .filter(|f| f.kind == ScopeKind::Method)
            .and_then(|f| f.qn.rsplit_once('.').map(|(owner, _)| owner.to_string()))
    }

    fn recv_type(&self, recv: &Recv) -> Option<String> {
        match recv {
            Recv::Name(name) => self.lookup_var(name),
            Recv::SelfRef => self.self_type(),
            Recv::Path(segments) if segments.first().map(String::as_str) == Some("self") => {
                self.lookup_var(&segments.join("."))
            }
            Recv::Path(_) => None,
            Recv::Call(shape) => self.call_expr_type(shape),
            Recv::Other => None,
        }
    }

    /// A resolved target that may be called: functions and methods pass
    /// through; Python classes coerce to their `__init__`.
    fn callable_qn(&self, qn: String) -> Option<String> {
        let def = self.table.definition(&qn)?;
        match def.kind {
            SymbolKind::Function | SymbolKind::Method => Some(qn),
            SymbolKind::Class | SymbolKind::Struct
                if self.scoper.language == Language::Python =>
            {
                self.table.lookup_member(&qn, "__init__")
            }
            _ => None,
        }
    }

    fn resolve_call(&self, shape: &CallShape) -> Option<String> {
        match &shape.callee {
            Callee::Path(segments) => self.resolve_path_call(segments),
            Callee::Bare(name) => self.resolve_bare(name),
            Callee::Member { recv, name } => self.resolve_member(recv, name),
        }
    }

    fn resolve_path_call(&self, segments: &[String]) -> Option<String> {
        // `Self::helper()` inside an impl.
        if segments.first().map(String::as_str) == Some("Self") {
            let type_qn = self.self_type()?;
            let rest = segments[1..].join(".");
            return self.table.lookup_member(&type_qn, &rest);
        }

        // Rung 1: the path as written.
        if let Some(Target::InProject(qn)) =
            self.table.resolve_path_in(&self.ctx.rel_path, segments)
            && let Some(hit) = self.callable_qn(qn)
        {
            return Some(hit);
        }

        // Rung 4: leading segments as a type, last as a member.
        if segments.len() >= 2
            && let Some((name, head)) = segments.split_last()
            && let Some(type_qn) = self.resolve_type_path(head)
        {
            return self.table.lookup_member(&type_qn, name);
        }
        None
    }

    fn resolve_type_path(&self, segments: &[String]) -> Option<String> {
        let target = self.table.resolve_path_in(&self.ctx.rel_path, segments)?;
        self.table.type_qn_of(&target)
    }

    fn resolve_bare(&self, name: &str) -> Option<String> {
        // Rung 3: enclosing scopes innermost-out, then the module table
        // (imports, locals, wildcards, includes, global last resort).
        for frame in self.scopes.iter_inner_first() {
            let candidate = format!("{}.{name}", frame.qn);
            if self.table.definition(&candidate).is_some()
                && let Some(hit) = self.callable_qn(candidate)
            {
                return Some(hit);
            }
        }
        if let Some(Target::InProject(qn)) = self.table.resolve_name_in(&self.ctx.rel_path, name) {
            return self.callable_qn(qn);
        }
        None
    }

    fn resolve_member(&self, recv: &Recv, name: &str) -> Option<String> {
        if let Some(flat) = flatten_recv(recv) {
            // Rung 1: the whole chain as a qualified path.
            let mut full = flat.clone();
            full.push(name.to_string());
            if let Some(Target::InProject(qn)) =
                self.table.resolve_path_in(&self.ctx.rel_path, &full)
                && let Some(hit) = self.callable_qn(qn)
            {
                return Some(hit);
            }

            // Rung 2: receiver as a typed local.
            if flat.len() == 1
                && let Some(type_qn) = self.lookup_var(&flat[0])
            {
                return self.table.lookup_member(&type_qn, name);
            }

            // Rung 4: receiver as a known type (including module
            // default-export coercion).
            if let Some(type_qn) = self.resolve_type_path(&flat) {
                return self.table.lookup_member(&type_qn, name);
            }
            return None;
        }

        let type_qn = self.recv_type(recv)?;
        self.table.lookup_member(&type_qn, name)
    }

    fn handle_call(&mut self, node: Node) {
        let Some(shape) = self.scoper.syntax.call_shape(node, self.src) else {
            return;
        };
        let Some(caller) = self.scopes.nearest_callable() else {
            return;
        };
        let caller_qn = caller.qn.clone();
        let caller_label = caller.label.unwrap_or_else(|| {
            if caller.kind == ScopeKind::Method {
                crate::graph::NodeLabel::Method
            } else {
                crate::graph::NodeLabel::Function
            }
        });

        let Some(callee_qn) = self.resolve_call(&shape) else {
            trace!(
                target: "codegraph::calls",
                "unresolved call at {}:{}", self.ctx.rel_path, start_line(node)
            );
            return;
        };
        let Some(callee_label) = self
            .table
            .definition(&callee_qn)
            .filter(|d| d.kind.is_callable())
            .map(|d| d.kind.label())
        else {
            return;
        };

        if self.emitted.insert((caller_qn.clone(), callee_qn.clone())) {
            self.sink.ensure_relationship_batch(
                NodeRef::new(caller_label, &caller_qn),
                RelType::Calls,
                NodeRef::new(callee_label, &callee_qn),
            );
        }
    }
}

/// Pure-name receiver chains (not `self`-rooted): `Storage`, `a.b`.
fn flatten_recv(recv: &Recv) -> Option<Vec<String>> {
    match recv {
        Recv::Name(name) => Some(vec![name.clone()]),
        Recv::Path(segments) if segments.first().map(String::as_str) != Some("self") => {
            Some(segments.clone())
        }
        _ => None,
    }
}
