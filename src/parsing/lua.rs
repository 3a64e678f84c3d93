//! Lua syntax rules: `function M.f` / `function M:m` declarations,
//! `require` imports, and colon method calls.

use tree_sitter::Node;

use crate::parsing::syntax::{
    Binding, CallShape, Callee, DefCaptureKind, DefName, ImportStmt, ModuleSpec, Param, RValue,
    Recv, Syntax, node_text, start_line, strip_quotes, walk_tree,
};

pub struct LuaSyntax;

/// `require("a.b")` specifier of a function_call node, if any.
fn require_spec(node: Node, src: &str) -> Option<ModuleSpec> {
    if node.kind() != "function_call" {
        return None;
    }
    let name = node.child_by_field_name("name")?;
    if name.kind() != "identifier" || node_text(name, src) != "require" {
        return None;
    }
    let args = node.child_by_field_name("arguments")?;
    let arg = args.named_child(0)?;
    if arg.kind() != "string" {
        return None;
    }
    let module = strip_quotes(node_text(arg, src));
    Some(ModuleSpec::qualified(
        module.split('.').map(str::to_string).collect(),
    ))
}

/// First child with the given kind, field names being unreliable across
/// grammar versions for statement lists.
fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn flatten_index(node: Node, src: &str) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" => Some(vec![node_text(node, src).to_string()]),
        "dot_index_expression" => {
            let table = node.child_by_field_name("table")?;
            let field = node.child_by_field_name("field")?;
            let mut segments = flatten_index(table, src)?;
            segments.push(node_text(field, src).to_string());
            Some(segments)
        }
        _ => None,
    }
}

impl Syntax for LuaSyntax {
    fn definition(&self, node: Node, kind: DefCaptureKind, src: &str) -> Option<DefName> {
        match kind {
            DefCaptureKind::Function => {
                let name = node.child_by_field_name("name")?;
                match name.kind() {
                    "identifier" => Some(DefName {
                        kind,
                        name: node_text(name, src).to_string(),
                        owner: None,
                    }),
                    "dot_index_expression" | "method_index_expression" => {
                        let table = name.child_by_field_name("table")?;
                        let field = name
                            .child_by_field_name("field")
                            .or_else(|| name.child_by_field_name("method"))?;
                        Some(DefName {
                            kind,
                            name: node_text(field, src).to_string(),
                            owner: Some(node_text(table, src).to_string()),
                        })
                    }
                    _ => None,
                }
            }
            DefCaptureKind::AnonymousFunction => {
                // `local f = function() ... end`
                let parent = node.parent()?;
                if parent.kind() != "expression_list" {
                    return None;
                }
                let assignment = parent.parent()?;
                if assignment.kind() != "assignment_statement" {
                    return None;
                }
                let variables = child_of_kind(assignment, "variable_list")?;
                let var = variables.named_child(0)?;
                (var.kind() == "identifier").then(|| DefName {
                    kind,
                    name: node_text(var, src).to_string(),
                    owner: None,
                })
            }
            _ => None,
        }
    }

    fn parameters(&self, node: Node, src: &str) -> Vec<Param> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            if child.kind() == "identifier" {
                out.push(Param {
                    name: node_text(child, src).to_string(),
                    type_names: Vec::new(),
                });
            }
        }
        out
    }

    fn return_type_names(&self, _node: Node, _src: &str) -> Vec<String> {
        Vec::new()
    }

    fn imports(&self, root: Node, _captures: &[Node], src: &str) -> Vec<ImportStmt> {
        let mut out = Vec::new();
        walk_tree(root, &mut |n| match n.kind() {
            "variable_declaration" => {
                let mut alias = None;
                let mut spec = None;
                walk_tree(n, &mut |inner| {
                    if alias.is_none() && inner.kind() == "variable_list" {
                        if let Some(var) = inner.named_child(0)
                            && var.kind() == "identifier"
                        {
                            alias = Some(node_text(var, src).to_string());
                        }
                    }
                    if spec.is_none() {
                        spec = require_spec(inner, src);
                    }
                });
                if let Some(spec) = spec {
                    out.push(ImportStmt::Module { spec, alias });
                }
            }
            "function_call" => {
                // Standalone `require("x")` at statement level.
                if n.parent().is_some_and(|p| p.kind() == "chunk" || p.kind() == "block")
                    && let Some(spec) = require_spec(n, src)
                {
                    out.push(ImportStmt::SideEffect { spec });
                }
            }
            _ => {}
        });
        out
    }

    fn default_export(&self, root: Node, src: &str) -> Option<String> {
        // The table a module returns plays the role of its public face:
        // `local M = {} ... return M`.
        let mut found = None;
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() == "return_statement"
                && let Some(value) = child.named_child(0)
            {
                let expr = if value.kind() == "identifier" {
                    Some(value)
                } else {
                    value.named_child(0).filter(|n| n.kind() == "identifier")
                };
                if let Some(expr) = expr {
                    found = Some(node_text(expr, src).to_string());
                }
            }
        }
        found
    }

    fn call_shape(&self, node: Node, src: &str) -> Option<CallShape> {
        let name = node.child_by_field_name("name")?;
        let line = start_line(node);
        let callee = match name.kind() {
            "identifier" => Callee::Bare(node_text(name, src).to_string()),
            "dot_index_expression" => Callee::Path(flatten_index(name, src)?),
            "method_index_expression" => {
                let table = name.child_by_field_name("table")?;
                let method = name.child_by_field_name("method")?;
                let recv = match table.kind() {
                    "identifier" => {
                        let text = node_text(table, src);
                        if text == "self" {
                            Recv::SelfRef
                        } else {
                            Recv::Name(text.to_string())
                        }
                    }
                    "dot_index_expression" => match flatten_index(table, src) {
                        Some(segments) => Recv::Path(segments),
                        None => Recv::Other,
                    },
                    "function_call" => match self.call_shape(table, src) {
                        Some(shape) => Recv::Call(Box::new(shape)),
                        None => Recv::Other,
                    },
                    _ => Recv::Other,
                };
                Callee::Member {
                    recv,
                    name: node_text(method, src).to_string(),
                }
            }
            _ => return None,
        };
        Some(CallShape { callee, line })
    }

    fn binding(&self, node: Node, src: &str) -> Option<Binding> {
        if node.kind() != "assignment_statement" {
            return None;
        }
        let variables = child_of_kind(node, "variable_list")?;
        let var = variables.named_child(0)?;
        if var.kind() != "identifier" {
            return None;
        }
        let values = child_of_kind(node, "expression_list")?;
        let value = values.named_child(0)?;
        let rvalue = match value.kind() {
            "function_call" => match self.call_shape(value, src) {
                Some(shape) => RValue::Call(shape),
                None => RValue::Other,
            },
            "identifier" => RValue::Name(node_text(value, src).to_string()),
            _ => RValue::Other,
        };
        Some(Binding {
            target: node_text(var, src).to_string(),
            value: rvalue,
        })
    }

    fn constructed_types(&self, body: Node, src: &str) -> Vec<String> {
        let mut names = Vec::new();
        walk_tree(body, &mut |n| {
            if n.kind() == "return_statement"
                && let Some(list) = n.named_child(0)
                && list.kind() == "expression_list"
                && let Some(expr) = list.named_child(0)
                && expr.kind() == "function_call"
                && let Some(name) = expr.child_by_field_name("name")
            {
                match name.kind() {
                    "identifier" => names.push(node_text(name, src).to_string()),
                    "dot_index_expression" => {
                        if let Some(segments) = flatten_index(name, src)
                            && let Some(first) = segments.first()
                        {
                            names.push(first.clone());
                        }
                    }
                    _ => {}
                }
            }
        });
        names
    }
}
