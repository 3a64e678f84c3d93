//! Language-parameterised syntax rules.
//!
//! The analysis passes are language-agnostic; everything a pass needs to
//! know about concrete syntax comes through the [`Syntax`] trait, one
//! implementation per language. Implementations only use tree-sitter field
//! accessors on nodes the query runner captured, never manual traversal of
//! unrelated grammar productions.

use tree_sitter::Node;

/// What a `definitions` query capture turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefCaptureKind {
    Function,
    /// Arrow/lambda/function expressions; named from assignment context.
    AnonymousFunction,
    Method,
    Class,
    Struct,
    /// QN segment only, no node emitted (C++ namespaces, inline Rust mods).
    Namespace,
    /// Rust `impl` block: scope for methods of the target type.
    ImplBlock,
}

/// Identity of a definition extracted from a captured node.
#[derive(Debug, Clone)]
pub struct DefName {
    pub kind: DefCaptureKind,
    /// Local name, canonicalised (operator tokens kept whole, destructor
    /// tilde included).
    pub name: String,
    /// Explicit receiver/qualifier for out-of-class definitions, e.g.
    /// `Widget::helper` yields `Some("Widget")`, Lua `function M:save`
    /// yields `Some("M")`. Nested qualifiers are dotted.
    pub owner: Option<String>,
}

/// A parameter with its optional annotated type names.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    /// Identifiers appearing in the type annotation, outermost first.
    pub type_names: Vec<String>,
}

/// Module specifier as written at an import site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSpec {
    /// Dotted or `::`-separated path resolved against project or package
    /// roots. `relative_hops` counts leading dots in Python-style relative
    /// imports (1 = current package) and is 0 for absolute paths.
    Qualified {
        segments: Vec<String>,
        relative_hops: usize,
    },
    /// File-path specifier resolved against the importing file's directory.
    Specifier(String),
    /// Never resolves in-project (`#include <vector>`); always an
    /// ExternalPackage keyed by this specifier.
    External(String),
}

impl ModuleSpec {
    pub fn qualified(segments: Vec<String>) -> Self {
        ModuleSpec::Qualified {
            segments,
            relative_hops: 0,
        }
    }

    /// The specifier as originally written, for ExternalPackage keys.
    pub fn raw(&self) -> String {
        match self {
            ModuleSpec::Qualified {
                segments,
                relative_hops,
            } => {
                let dots = ".".repeat(*relative_hops);
                format!("{dots}{}", segments.join("."))
            }
            ModuleSpec::Specifier(s) => s.clone(),
            ModuleSpec::External(s) => s.clone(),
        }
    }
}

/// One import construct, normalised across languages.
#[derive(Debug, Clone)]
pub enum ImportStmt {
    /// Whole module bound to a local name: `import foo [as bar]`,
    /// `const m = require('./m')`, `import * as ns from './m'`.
    Module {
        spec: ModuleSpec,
        alias: Option<String>,
    },
    /// Named symbol: `from foo import a [as b]`, `use crate::a::B [as C]`,
    /// `import {a as b} from './m'`.
    Named {
        spec: ModuleSpec,
        name: String,
        alias: Option<String>,
    },
    /// `from foo import *` / `use foo::*`. Recorded as a wildcard source
    /// and resolved lazily by the call ladder.
    Wildcard { spec: ModuleSpec },
    /// Side effect only: `#include "x"`, bare `require('x')`. IMPORTS edge,
    /// no symbol-table entry.
    SideEffect { spec: ModuleSpec },
    /// Rust `mod child;` - binds `child` to this file's child module.
    Child { name: String },
}

/// Shape of a call site's callee expression.
#[derive(Debug, Clone)]
pub enum Callee {
    /// `a::b::c(...)` or `a.b.c(...)` where every segment is a plain name.
    Path(Vec<String>),
    /// `<receiver>.method(...)` with a non-trivial receiver expression.
    Member { recv: Recv, name: String },
    /// Bare `f(...)`.
    Bare(String),
}

/// Receiver expression of a member call.
#[derive(Debug, Clone)]
pub enum Recv {
    Name(String),
    /// `self` / `this`.
    SelfRef,
    /// Dotted chain of plain names, e.g. `self.manager` or `a.b`.
    Path(Vec<String>),
    /// Chained call: the receiver is itself a call expression.
    Call(Box<CallShape>),
    Other,
}

/// A call site with its callee shape.
#[derive(Debug, Clone)]
pub struct CallShape {
    pub callee: Callee,
    pub line: u32,
}

/// Right-hand side of a local binding, as far as the type tracker cares.
#[derive(Debug, Clone)]
pub enum RValue {
    /// Explicit construction: `T(...)`, `new T(...)`, `T { .. }`.
    Construct(Vec<String>),
    /// A call whose return type may be inferable.
    Call(CallShape),
    /// Alias of another local.
    Name(String),
    Other,
}

/// A local binding statement (`x = expr`, `let x = expr`, `T x;`).
#[derive(Debug, Clone)]
pub struct Binding {
    /// Variable name; attribute assignments on the receiver use a dotted
    /// key with a normalised `self` head (`self.manager`).
    pub target: String,
    pub value: RValue,
}

/// Per-language syntax rules consumed by the analysis passes.
pub trait Syntax {
    /// Identity of a captured definition node; `None` skips the capture
    /// (e.g. a type reference that shares the grammar production, or an
    /// anonymous function with no derivable name).
    fn definition(&self, node: Node, kind: DefCaptureKind, src: &str) -> Option<DefName>;

    /// Parameters of a function-like definition node.
    fn parameters(&self, node: Node, src: &str) -> Vec<Param>;

    /// Identifiers mentioned in the return type annotation, if any.
    fn return_type_names(&self, node: Node, src: &str) -> Vec<String>;

    /// Docstring, where the language exposes one cheaply.
    fn docstring(&self, _node: Node, _src: &str) -> Option<String> {
        None
    }

    /// Import statements for this module. `captures` holds the nodes the
    /// `imports` query matched; languages with non-query import forms
    /// (CommonJS `require`, Lua `require`) may also inspect the root.
    fn imports(&self, root: Node, captures: &[Node], src: &str) -> Vec<ImportStmt>;

    /// The module's default export symbol (`module.exports = X`,
    /// `export default X`), when the language has one.
    fn default_export(&self, _root: Node, _src: &str) -> Option<String> {
        None
    }

    /// Shape of a captured call site.
    fn call_shape(&self, node: Node, src: &str) -> Option<CallShape>;

    /// Local binding introduced by this node, for the type tracker.
    fn binding(&self, node: Node, src: &str) -> Option<Binding>;

    /// Type names explicitly constructed in a definition's body, recorded
    /// during pass 1 for factory return-type inference: `new T(...)`,
    /// `T { .. }`, and the callee head of `return f(...)` statements.
    fn constructed_types(&self, body: Node, src: &str) -> Vec<String>;
}

/// UTF-8 text of a node, empty on boundary errors.
pub fn node_text<'a>(node: Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

/// 1-indexed start line.
pub fn start_line(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-indexed end line.
pub fn end_line(node: Node) -> u32 {
    node.end_position().row as u32 + 1
}

/// Depth-first walk over every node in a subtree.
pub fn walk_tree<F: FnMut(Node)>(root: Node, f: &mut F) {
    let mut cursor = root.walk();
    let mut recurse = true;
    loop {
        if recurse {
            f(cursor.node());
        }
        if recurse && cursor.goto_first_child() {
            recurse = true;
        } else if cursor.goto_next_sibling() {
            recurse = true;
        } else if cursor.goto_parent() {
            recurse = false;
        } else {
            break;
        }
    }
}

/// Collect plain identifier tokens inside a type expression, in source
/// order. Used for annotation-based type inference where only names
/// matter (`Arc<Mutex<Storage>>` yields all three).
pub fn type_identifiers(node: Node, src: &str) -> Vec<String> {
    let mut names = Vec::new();
    walk_tree(node, &mut |n| {
        if matches!(
            n.kind(),
            "identifier" | "type_identifier" | "primitive_type"
        ) && n.child_count() == 0
        {
            names.push(node_text(n, src).to_string());
        }
    });
    if names.is_empty() {
        // Bare annotations in some grammars are a single unnamed token.
        let text = node_text(node, src).trim().to_string();
        if !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_') {
            names.push(text);
        }
    }
    names
}

/// Strip one layer of matching string quotes from a literal's text.
pub fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if s.len() >= 2 * quote.len() && s.starts_with(quote) && s.ends_with(quote) {
            return &s[quote.len()..s.len() - quote.len()];
        }
    }
    s
}
