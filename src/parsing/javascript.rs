//! JavaScript syntax rules: ESM imports, CommonJS require, and
//! assignment-context naming for anonymous functions.

use tree_sitter::Node;

use crate::parsing::syntax::{
    Binding, CallShape, Callee, DefCaptureKind, DefName, ImportStmt, ModuleSpec, Param, RValue,
    Recv, Syntax, node_text, start_line, strip_quotes, type_identifiers, walk_tree,
};

pub struct JsSyntax;

/// Flatten a member-expression chain into plain name segments with a
/// normalised `self` head for `this`.
pub(crate) fn flatten_member(node: Node, src: &str) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" => Some(vec![node_text(node, src).to_string()]),
        "this" => Some(vec!["self".to_string()]),
        "member_expression" => {
            let object = node.child_by_field_name("object")?;
            let property = node.child_by_field_name("property")?;
            if property.kind() != "property_identifier" {
                return None;
            }
            let mut segments = flatten_member(object, src)?;
            segments.push(node_text(property, src).to_string());
            Some(segments)
        }
        _ => None,
    }
}

pub(crate) fn recv_shape(syntax: &dyn Syntax, node: Node, src: &str) -> Recv {
    match node.kind() {
        "identifier" => Recv::Name(node_text(node, src).to_string()),
        "this" => Recv::SelfRef,
        "member_expression" => match flatten_member(node, src) {
            Some(segments) => Recv::Path(segments),
            None => Recv::Other,
        },
        "call_expression" => match syntax.call_shape(node, src) {
            Some(shape) => Recv::Call(Box::new(shape)),
            None => Recv::Other,
        },
        _ => Recv::Other,
    }
}

/// Derive a name for an anonymous function from its assignment context.
/// Arrow and function expressions assigned to a variable, property, or
/// object key take that name; anything else stays anonymous and is
/// skipped.
pub(crate) fn context_name(node: Node, src: &str) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return Some(node_text(name, src).to_string());
    }
    let parent = node.parent()?;
    match parent.kind() {
        "variable_declarator" => {
            let name = parent.child_by_field_name("name")?;
            (name.kind() == "identifier").then(|| node_text(name, src).to_string())
        }
        "pair" => {
            let key = parent.child_by_field_name("key")?;
            matches!(key.kind(), "property_identifier" | "string")
                .then(|| strip_quotes(node_text(key, src)).to_string())
        }
        "assignment_expression" => {
            let left = parent.child_by_field_name("left")?;
            match left.kind() {
                "identifier" => Some(node_text(left, src).to_string()),
                "member_expression" => {
                    let property = left.child_by_field_name("property")?;
                    Some(node_text(property, src).to_string())
                }
                _ => None,
            }
        }
        _ => None,
    }
}

pub(crate) fn definition_name(node: Node, kind: DefCaptureKind, src: &str) -> Option<DefName> {
    match kind {
        DefCaptureKind::AnonymousFunction => {
            let name = context_name(node, src)?;
            Some(DefName {
                kind: DefCaptureKind::AnonymousFunction,
                name,
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

pub(crate) fn call_shape(syntax: &dyn Syntax, node: Node, src: &str) -> Option<CallShape> {
    let function = node.child_by_field_name("function")?;
    let line = start_line(node);
    let callee = match function.kind() {
        "identifier" => Callee::Bare(node_text(function, src).to_string()),
        "member_expression" => {
            let object = function.child_by_field_name("object")?;
            let property = function.child_by_field_name("property")?;
            if property.kind() != "property_identifier" {
                return None;
            }
            Callee::Member {
                recv: recv_shape(syntax, object, src),
                name: node_text(property, src).to_string(),
            }
        }
        _ => return None,
    };
    Some(CallShape { callee, line })
}

pub(crate) fn binding(syntax: &dyn Syntax, node: Node, src: &str) -> Option<Binding> {
    let (left, right) = match node.kind() {
        "variable_declarator" => (
            node.child_by_field_name("name")?,
            node.child_by_field_name("value")?,
        ),
        "assignment_expression" => (
            node.child_by_field_name("left")?,
            node.child_by_field_name("right")?,
        ),
        _ => return None,
    };

    let target = match left.kind() {
        "identifier" => node_text(left, src).to_string(),
        "member_expression" => {
            let segments = flatten_member(left, src)?;
            if segments.first().map(String::as_str) != Some("self") {
                return None;
            }
            segments.join(".")
        }
        _ => return None,
    };

    let value = match right.kind() {
        "new_expression" => {
            let constructor = right.child_by_field_name("constructor")?;
            RValue::Construct(flatten_member(constructor, src)?)
        }
        "call_expression" => match syntax.call_shape(right, src) {
            Some(shape) => RValue::Call(shape),
            None => RValue::Other,
        },
        "identifier" => RValue::Name(node_text(right, src).to_string()),
        _ => RValue::Other,
    };
    Some(Binding { target, value })
}

pub(crate) fn constructed_types(body: Node, src: &str) -> Vec<String> {
    let mut names = Vec::new();
    walk_tree(body, &mut |n| match n.kind() {
        "new_expression" => {
            if let Some(constructor) = n.child_by_field_name("constructor")
                && let Some(segments) = flatten_member(constructor, src)
                && let Some(last) = segments.last()
            {
                names.push(last.clone());
            }
        }
        "return_statement" => {
            if let Some(expr) = n.named_child(0)
                && expr.kind() == "call_expression"
                && let Some(function) = expr.child_by_field_name("function")
                && function.kind() == "identifier"
            {
                names.push(node_text(function, src).to_string());
            }
        }
        _ => {}
    });
    names
}

/// Extract ESM import statements plus CommonJS require forms.
pub(crate) fn imports(root: Node, captures: &[Node], src: &str) -> Vec<ImportStmt> {
    let mut out = Vec::new();

    for &node in captures {
        if node.kind() != "import_statement" {
            continue;
        }
        let Some(source) = node.child_by_field_name("source") else {
            continue;
        };
        let spec = ModuleSpec::Specifier(strip_quotes(node_text(source, src)).to_string());

        let mut cursor = node.walk();
        let clause = node
            .children(&mut cursor)
            .find(|c| c.kind() == "import_clause");
        let Some(clause) = clause else {
            // `import './side-effect'`
            out.push(ImportStmt::SideEffect { spec });
            continue;
        };

        let mut cursor = clause.walk();
        for child in clause.children(&mut cursor) {
            match child.kind() {
                // Default import binds the module; member access goes
                // through the module's default export.
                "identifier" => out.push(ImportStmt::Module {
                    spec: spec.clone(),
                    alias: Some(node_text(child, src).to_string()),
                }),
                "namespace_import" => {
                    if let Some(name) = child.named_child(0) {
                        out.push(ImportStmt::Module {
                            spec: spec.clone(),
                            alias: Some(node_text(name, src).to_string()),
                        });
                    }
                }
                "named_imports" => {
                    let mut inner = child.walk();
                    for spec_node in child.children(&mut inner) {
                        if spec_node.kind() != "import_specifier" {
                            continue;
                        }
                        let Some(name) = spec_node.child_by_field_name("name") else {
                            continue;
                        };
                        let alias = spec_node
                            .child_by_field_name("alias")
                            .map(|a| node_text(a, src).to_string());
                        out.push(ImportStmt::Named {
                            spec: spec.clone(),
                            name: node_text(name, src).to_string(),
                            alias,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    collect_requires(root, src, &mut out);
    out
}

/// Specifier of a `require('...')` call expression, if that is what the
/// node is.
fn require_spec(node: Node, src: &str) -> Option<ModuleSpec> {
    if node.kind() != "call_expression" {
        return None;
    }
    let function = node.child_by_field_name("function")?;
    if function.kind() != "identifier" || node_text(function, src) != "require" {
        return None;
    }
    let args = node.child_by_field_name("arguments")?;
    let arg = args.named_child(0)?;
    (arg.kind() == "string")
        .then(|| ModuleSpec::Specifier(strip_quotes(node_text(arg, src)).to_string()))
}

fn collect_requires(root: Node, src: &str, out: &mut Vec<ImportStmt>) {
    walk_tree(root, &mut |n| match n.kind() {
        "variable_declarator" => {
            let Some(value) = n.child_by_field_name("value") else {
                return;
            };
            let Some(spec) = require_spec(value, src) else {
                return;
            };
            let Some(name) = n.child_by_field_name("name") else {
                return;
            };
            match name.kind() {
                "identifier" => out.push(ImportStmt::Module {
                    spec,
                    alias: Some(node_text(name, src).to_string()),
                }),
                "object_pattern" => {
                    let mut cursor = name.walk();
                    for prop in name.children(&mut cursor) {
                        match prop.kind() {
                            "shorthand_property_identifier_pattern" => {
                                out.push(ImportStmt::Named {
                                    spec: spec.clone(),
                                    name: node_text(prop, src).to_string(),
                                    alias: None,
                                });
                            }
                            "pair_pattern" => {
                                if let (Some(key), Some(value)) = (
                                    prop.child_by_field_name("key"),
                                    prop.child_by_field_name("value"),
                                ) {
                                    out.push(ImportStmt::Named {
                                        spec: spec.clone(),
                                        name: node_text(key, src).to_string(),
                                        alias: Some(node_text(value, src).to_string()),
                                    });
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        "expression_statement" => {
            if let Some(expr) = n.named_child(0)
                && let Some(spec) = require_spec(expr, src)
            {
                out.push(ImportStmt::SideEffect { spec });
            }
        }
        _ => {}
    });
}

/// The module's default export: `export default X`, `module.exports = X`.
pub(crate) fn default_export(root: Node, src: &str) -> Option<String> {
    let mut found = None;
    let mut cursor = root.walk();
    for node in root.children(&mut cursor) {
        match node.kind() {
            "export_statement" => {
                let has_default = (0..node.child_count())
                    .filter_map(|i| node.child(i as u32))
                    .any(|c| c.kind() == "default");
                if !has_default {
                    continue;
                }
                if let Some(value) = node.child_by_field_name("value") {
                    if value.kind() == "identifier" {
                        found = Some(node_text(value, src).to_string());
                    }
                } else if let Some(decl) = node.child_by_field_name("declaration")
                    && let Some(name) = decl.child_by_field_name("name")
                {
                    found = Some(node_text(name, src).to_string());
                }
            }
            "expression_statement" => {
                let Some(assign) = node
                    .named_child(0)
                    .filter(|c| c.kind() == "assignment_expression")
                else {
                    continue;
                };
                let Some(left) = assign.child_by_field_name("left") else {
                    continue;
                };
                if node_text(left, src) != "module.exports" {
                    continue;
                }
                if let Some(right) = assign.child_by_field_name("right") {
                    match right.kind() {
                        "identifier" => found = Some(node_text(right, src).to_string()),
                        "class_expression" => {
                            if let Some(name) = right.child_by_field_name("name") {
                                found = Some(node_text(name, src).to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    found
}

impl Syntax for JsSyntax {
    fn definition(&self, node: Node, kind: DefCaptureKind, src: &str) -> Option<DefName> {
        definition_name(node, kind, src)
    }

    fn parameters(&self, node: Node, src: &str) -> Vec<Param> {
        let Some(params) = node
            .child_by_field_name("parameters")
            .or_else(|| node.child_by_field_name("parameter"))
        else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if params.kind() == "identifier" {
            // Single-parameter arrow without parentheses.
            out.push(Param {
                name: node_text(params, src).to_string(),
                type_names: Vec::new(),
            });
            return out;
        }
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            if child.kind() == "identifier" {
                out.push(Param {
                    name: node_text(child, src).to_string(),
                    type_names: Vec::new(),
                });
            }
        }
        out
    }

    fn return_type_names(&self, node: Node, src: &str) -> Vec<String> {
        node.child_by_field_name("return_type")
            .map(|t| type_identifiers(t, src))
            .unwrap_or_default()
    }

    fn imports(&self, root: Node, captures: &[Node], src: &str) -> Vec<ImportStmt> {
        imports(root, captures, src)
    }

    fn default_export(&self, root: Node, src: &str) -> Option<String> {
        default_export(root, src)
    }

    fn call_shape(&self, node: Node, src: &str) -> Option<CallShape> {
        call_shape(self, node, src)
    }

    fn binding(&self, node: Node, src: &str) -> Option<Binding> {
        binding(self, node, src)
    }

    fn constructed_types(&self, body: Node, src: &str) -> Vec<String> {
        constructed_types(body, src)
    }
}
