//! Scope stack shared by both passes.
//!
//! The definition pass and the call pass walk the same trees and must
//! derive identical qualified names for every scope, so the frame
//! classification lives here and is driven purely by the definitions
//! query captures, the per-language syntax rules, and the symbol table.

use std::collections::HashMap;
use tree_sitter::Node;

use crate::analysis::symbols::{SymbolKind, SymbolTable, Target};
use crate::graph::NodeLabel;
use crate::parsing::Language;
use crate::parsing::syntax::{DefCaptureKind, DefName, Syntax};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    /// QN segment only: C++ namespaces, inline Rust mods, impl blocks.
    Namespace,
    Class,
    Struct,
    Function,
    Method,
}

/// One frame of the lexical scope stack.
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: ScopeKind,
    pub name: String,
    pub qn: String,
    /// Graph label and node key when this scope is itself a graph node.
    pub label: Option<NodeLabel>,
    pub key: String,
}

/// Stack of tagged frames carried through a tree walk.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    /// A stack rooted at the module scope.
    pub fn for_module(module_qn: &str, module_path: &str) -> Self {
        Self {
            frames: vec![Frame {
                kind: ScopeKind::Module,
                name: module_qn
                    .rsplit('.')
                    .next()
                    .unwrap_or(module_qn)
                    .to_string(),
                qn: module_qn.to_string(),
                label: Some(NodeLabel::Module),
                key: module_path.to_string(),
            }],
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn current(&self) -> &Frame {
        self.frames.last().expect("module frame always present")
    }

    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{}", self.current().qn, name)
    }

    /// Innermost enclosing Function/Method frame (the caller of a call
    /// site), if any.
    pub fn nearest_callable(&self) -> Option<&Frame> {
        self.frames
            .iter()
            .rev()
            .find(|f| matches!(f.kind, ScopeKind::Function | ScopeKind::Method))
    }

    /// Innermost enclosing Class/Struct frame.
    pub fn enclosing_type(&self) -> Option<&Frame> {
        self.frames
            .iter()
            .rev()
            .find(|f| matches!(f.kind, ScopeKind::Class | ScopeKind::Struct))
    }

    /// Innermost enclosing frame that is a graph node, for DEFINES edges.
    pub fn nearest_emittable(&self) -> &Frame {
        self.frames
            .iter()
            .rev()
            .find(|f| f.label.is_some())
            .expect("module frame always present")
    }

    /// Frames from innermost to outermost.
    pub fn iter_inner_first(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Index of the innermost Class/Struct frame, for attribute
    /// environments shared across a type's methods.
    pub fn innermost_type_index(&self) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|f| matches!(f.kind, ScopeKind::Class | ScopeKind::Struct))
    }
}

/// A classified definition node: what to emit and the frame to push.
#[derive(Debug, Clone)]
pub struct Classified {
    pub def: DefName,
    pub kind: SymbolKind,
    pub qn: String,
    /// For methods: the owning type's QN, and whether the owner was an
    /// explicit out-of-class qualifier.
    pub owner_qn: Option<String>,
    pub out_of_class: bool,
    pub frame: Frame,
}

/// Classifies definition-captured nodes into frames, identically in both
/// passes.
pub struct Scoper<'a> {
    pub syntax: &'a dyn Syntax,
    pub def_nodes: HashMap<usize, DefCaptureKind>,
    pub language: Language,
    pub module_path: String,
}

impl<'a> Scoper<'a> {
    pub fn new(
        syntax: &'a dyn Syntax,
        def_nodes: HashMap<usize, DefCaptureKind>,
        language: Language,
        module_path: &str,
    ) -> Self {
        Self {
            syntax,
            def_nodes,
            language,
            module_path: module_path.to_string(),
        }
    }

    /// Resolve the owner of an out-of-class definition or impl target.
    /// Import bindings win; otherwise the name is qualified under the
    /// current scope. The rule never consults definition existence, so
    /// both passes agree.
    fn owner_qn(&self, scopes: &ScopeStack, owner: &str, table: &SymbolTable) -> String {
        let segments: Vec<String> = owner.split('.').map(str::to_string).collect();
        if segments.len() == 1 {
            if let Some(Target::InProject(qn)) =
                table.module(&self.module_path).and_then(|m| {
                    m.names.get(&segments[0]).cloned()
                })
            {
                return qn;
            }
        }
        scopes.qualify(&segments.join("."))
    }

    /// Classify a node. `None` means the node opens no scope and emits
    /// nothing.
    pub fn classify(
        &self,
        node: Node,
        src: &str,
        scopes: &ScopeStack,
        table: &SymbolTable,
    ) -> Option<Classified> {
        let capture_kind = *self.def_nodes.get(&node.id())?;
        let def = self.syntax.definition(node, capture_kind, src)?;

        match def.kind {
            DefCaptureKind::Class | DefCaptureKind::Struct => {
                let kind = if def.kind == DefCaptureKind::Class {
                    SymbolKind::Class
                } else {
                    SymbolKind::Struct
                };
                let qn = scopes.qualify(&def.name);
                Some(Classified {
                    frame: Frame {
                        kind: if kind == SymbolKind::Class {
                            ScopeKind::Class
                        } else {
                            ScopeKind::Struct
                        },
                        name: def.name.clone(),
                        qn: qn.clone(),
                        label: Some(kind.label()),
                        key: qn.clone(),
                    },
                    kind,
                    qn,
                    owner_qn: None,
                    out_of_class: false,
                    def,
                })
            }
            DefCaptureKind::Namespace => {
                let qn = scopes.qualify(&def.name);
                Some(Classified {
                    frame: Frame {
                        kind: ScopeKind::Namespace,
                        name: def.name.clone(),
                        qn: qn.clone(),
                        label: None,
                        key: qn.clone(),
                    },
                    kind: SymbolKind::Module,
                    qn,
                    owner_qn: None,
                    out_of_class: false,
                    def,
                })
            }
            DefCaptureKind::ImplBlock => {
                let qn = self.owner_qn(scopes, &def.name, table);
                Some(Classified {
                    frame: Frame {
                        kind: ScopeKind::Struct,
                        name: def.name.clone(),
                        qn: qn.clone(),
                        label: None,
                        key: qn.clone(),
                    },
                    kind: SymbolKind::Struct,
                    qn,
                    owner_qn: None,
                    out_of_class: false,
                    def,
                })
            }
            DefCaptureKind::Function
            | DefCaptureKind::AnonymousFunction
            | DefCaptureKind::Method => {
                if let Some(owner) = &def.owner {
                    // Out-of-class definition bound by qualified name.
                    let owner_qn = self.owner_qn(scopes, owner, table);
                    let qn = format!("{owner_qn}.{}", def.name);
                    Some(Classified {
                        frame: Frame {
                            kind: ScopeKind::Method,
                            name: def.name.clone(),
                            qn: qn.clone(),
                            label: Some(NodeLabel::Method),
                            key: qn.clone(),
                        },
                        kind: SymbolKind::Method,
                        qn,
                        owner_qn: Some(owner_qn),
                        out_of_class: true,
                        def,
                    })
                } else {
                    let in_type = matches!(
                        scopes.current().kind,
                        ScopeKind::Class | ScopeKind::Struct
                    );
                    let qn = scopes.qualify(&def.name);
                    let owner_qn = in_type.then(|| scopes.current().qn.clone());
                    let kind = if in_type {
                        SymbolKind::Method
                    } else {
                        SymbolKind::Function
                    };
                    Some(Classified {
                        frame: Frame {
                            kind: if in_type {
                                ScopeKind::Method
                            } else {
                                ScopeKind::Function
                            },
                            name: def.name.clone(),
                            qn: qn.clone(),
                            label: Some(kind.label()),
                            key: qn.clone(),
                        },
                        kind,
                        qn,
                        owner_qn,
                        out_of_class: false,
                        def,
                    })
                }
            }
        }
    }
}
