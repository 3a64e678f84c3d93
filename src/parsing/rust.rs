//! Rust syntax rules: `use` trees, `mod` declarations, impl-block method
//! ownership, and `::`-path call shapes.

use tree_sitter::Node;

use crate::parsing::syntax::{
    Binding, CallShape, Callee, DefCaptureKind, DefName, ImportStmt, ModuleSpec, Param, RValue,
    Recv, Syntax, node_text, start_line, type_identifiers, walk_tree,
};

pub struct RustSyntax;

/// Base type name of an impl target: `Storage`, `Storage<T>`,
/// `module::Storage`.
fn impl_type_name(node: Node, src: &str) -> Option<String> {
    match node.kind() {
        "type_identifier" => Some(node_text(node, src).to_string()),
        "generic_type" => impl_type_name(node.child_by_field_name("type")?, src),
        "scoped_type_identifier" => {
            let name = node.child_by_field_name("name")?;
            Some(node_text(name, src).to_string())
        }
        "reference_type" => impl_type_name(node.child_by_field_name("type")?, src),
        _ => None,
    }
}

/// Split a `::` path into plain segments; rejects generic arguments.
fn path_segments(text: &str) -> Option<Vec<String>> {
    if text.contains('<') || text.contains('>') {
        return None;
    }
    Some(text.split("::").map(|s| s.trim().to_string()).collect())
}

fn first_identifier(node: Node, src: &str) -> Option<String> {
    if node.kind() == "identifier" {
        return Some(node_text(node, src).to_string());
    }
    let mut found = None;
    walk_tree(node, &mut |n| {
        if found.is_none() && n.kind() == "identifier" {
            found = Some(node_text(n, src).to_string());
        }
    });
    found
}

fn flatten_fields(node: Node, src: &str) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" => {
            let name = node_text(node, src);
            Some(vec![
                if name == "self" { "self" } else { name }.to_string(),
            ])
        }
        "self" => Some(vec!["self".to_string()]),
        "field_expression" => {
            let value = node.child_by_field_name("value")?;
            let field = node.child_by_field_name("field")?;
            if field.kind() != "field_identifier" {
                return None;
            }
            let mut segments = flatten_fields(value, src)?;
            segments.push(node_text(field, src).to_string());
            Some(segments)
        }
        _ => None,
    }
}

/// Recursively expand a `use` clause into import statements.
fn expand_use_clause(node: Node, prefix: &[String], src: &str, out: &mut Vec<ImportStmt>) {
    match node.kind() {
        "identifier" => {
            let name = node_text(node, src).to_string();
            if prefix.is_empty() {
                out.push(ImportStmt::Module {
                    spec: ModuleSpec::qualified(vec![name]),
                    alias: None,
                });
            } else {
                out.push(ImportStmt::Named {
                    spec: ModuleSpec::qualified(prefix.to_vec()),
                    name,
                    alias: None,
                });
            }
        }
        "scoped_identifier" => {
            if let Some(segments) = path_segments(node_text(node, src)) {
                let full: Vec<String> = prefix.iter().cloned().chain(segments).collect();
                if let Some((name, path)) = full.split_last() {
                    out.push(ImportStmt::Named {
                        spec: ModuleSpec::qualified(path.to_vec()),
                        name: name.clone(),
                        alias: None,
                    });
                }
            }
        }
        "use_as_clause" => {
            let Some(path) = node.child_by_field_name("path") else {
                return;
            };
            let Some(alias) = node.child_by_field_name("alias") else {
                return;
            };
            if let Some(segments) = path_segments(node_text(path, src)) {
                let full: Vec<String> = prefix.iter().cloned().chain(segments).collect();
                if let Some((name, path)) = full.split_last() {
                    out.push(ImportStmt::Named {
                        spec: ModuleSpec::qualified(path.to_vec()),
                        name: name.clone(),
                        alias: Some(node_text(alias, src).to_string()),
                    });
                }
            }
        }
        "scoped_use_list" => {
            let path = node.child_by_field_name("path");
            let Some(list) = node.child_by_field_name("list") else {
                return;
            };
            let mut full = prefix.to_vec();
            if let Some(path) = path
                && let Some(segments) = path_segments(node_text(path, src))
            {
                full.extend(segments);
            }
            expand_use_clause(list, &full, src, out);
        }
        "use_list" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                expand_use_clause(child, prefix, src, out);
            }
        }
        "use_wildcard" => {
            let mut segments = prefix.to_vec();
            if let Some(path) = node.named_child(0)
                && let Some(path_segs) = path_segments(node_text(path, src))
            {
                segments.extend(path_segs);
            }
            out.push(ImportStmt::Wildcard {
                spec: ModuleSpec::qualified(segments),
            });
        }
        _ => {}
    }
}

impl Syntax for RustSyntax {
    fn definition(&self, node: Node, kind: DefCaptureKind, src: &str) -> Option<DefName> {
        match kind {
            DefCaptureKind::ImplBlock => {
                let target = node.child_by_field_name("type")?;
                Some(DefName {
                    kind,
                    name: impl_type_name(target, src)?,
                    owner: None,
                })
            }
            DefCaptureKind::Namespace => {
                // Inline `mod name { .. }` only; `mod name;` declarations
                // are import constructs.
                node.child_by_field_name("body")?;
                let name = node.child_by_field_name("name")?;
                Some(DefName {
                    kind,
                    name: node_text(name, src).to_string(),
                    owner: None,
                })
            }
            _ => {
                let name = node.child_by_field_name("name")?;
                Some(DefName {
                    kind,
                    name: node_text(name, src).to_string(),
                    owner: None,
                })
            }
        }
    }

    fn parameters(&self, node: Node, src: &str) -> Vec<Param> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            match child.kind() {
                "parameter" => {
                    let Some(pattern) = child.child_by_field_name("pattern") else {
                        continue;
                    };
                    let Some(name) = first_identifier(pattern, src) else {
                        continue;
                    };
                    let type_names = child
                        .child_by_field_name("type")
                        .map(|t| type_identifiers(t, src))
                        .unwrap_or_default();
                    out.push(Param { name, type_names });
                }
                "self_parameter" => out.push(Param {
                    name: "self".to_string(),
                    type_names: Vec::new(),
                }),
                _ => {}
            }
        }
        out
    }

    fn return_type_names(&self, node: Node, src: &str) -> Vec<String> {
        node.child_by_field_name("return_type")
            .map(|t| type_identifiers(t, src))
            .unwrap_or_default()
    }

    fn imports(&self, _root: Node, captures: &[Node], src: &str) -> Vec<ImportStmt> {
        let mut out = Vec::new();
        for &node in captures {
            match node.kind() {
                "use_declaration" => {
                    if let Some(argument) = node.child_by_field_name("argument") {
                        expand_use_clause(argument, &[], src, &mut out);
                    }
                }
                "mod_item" => {
                    // `mod child;` declares this file's child module.
                    if node.child_by_field_name("body").is_none()
                        && let Some(name) = node.child_by_field_name("name")
                    {
                        out.push(ImportStmt::Child {
                            name: node_text(name, src).to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn call_shape(&self, node: Node, src: &str) -> Option<CallShape> {
        let mut function = node.child_by_field_name("function")?;
        if function.kind() == "generic_function" {
            function = function.child_by_field_name("function")?;
        }
        let line = start_line(node);
        let callee = match function.kind() {
            "identifier" => Callee::Bare(node_text(function, src).to_string()),
            "scoped_identifier" => Callee::Path(path_segments(node_text(function, src))?),
            "field_expression" => {
                let value = function.child_by_field_name("value")?;
                let field = function.child_by_field_name("field")?;
                if field.kind() != "field_identifier" {
                    return None;
                }
                let recv = match value.kind() {
                    "identifier" if node_text(value, src) == "self" => Recv::SelfRef,
                    "self" => Recv::SelfRef,
                    "identifier" => Recv::Name(node_text(value, src).to_string()),
                    "field_expression" => match flatten_fields(value, src) {
                        Some(segments) => Recv::Path(segments),
                        None => Recv::Other,
                    },
                    "call_expression" => match self.call_shape(value, src) {
                        Some(shape) => Recv::Call(Box::new(shape)),
                        None => Recv::Other,
                    },
                    _ => Recv::Other,
                };
                Callee::Member {
                    recv,
                    name: node_text(field, src).to_string(),
                }
            }
            _ => return None,
        };
        Some(CallShape { callee, line })
    }

    fn binding(&self, node: Node, src: &str) -> Option<Binding> {
        if node.kind() != "let_declaration" {
            return None;
        }
        let pattern = node.child_by_field_name("pattern")?;
        let target = first_identifier(pattern, src)?;
        let value = match node.child_by_field_name("value") {
            Some(v) => match v.kind() {
                "call_expression" => match self.call_shape(v, src) {
                    Some(shape) => RValue::Call(shape),
                    None => RValue::Other,
                },
                "struct_expression" => {
                    let name = v.child_by_field_name("name")?;
                    RValue::Construct(path_segments(node_text(name, src))?)
                }
                "identifier" => RValue::Name(node_text(v, src).to_string()),
                _ => RValue::Other,
            },
            None => RValue::Other,
        };
        Some(Binding { target, value })
    }

    fn constructed_types(&self, body: Node, src: &str) -> Vec<String> {
        let mut names = Vec::new();
        walk_tree(body, &mut |n| {
            if n.kind() == "struct_expression"
                && let Some(name) = n.child_by_field_name("name")
                && let Some(segments) = path_segments(node_text(name, src))
                && let Some(last) = segments.last()
            {
                names.push(last.clone());
            }
        });
        names
    }
}
