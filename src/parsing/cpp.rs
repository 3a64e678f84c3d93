//! C++ syntax rules: declarator chains, out-of-class `Owner::method`
//! definitions, operator and destructor names, and include directives.

use tree_sitter::Node;

use crate::parsing::syntax::{
    Binding, CallShape, Callee, DefCaptureKind, DefName, ImportStmt, ModuleSpec, Param, RValue,
    Recv, Syntax, node_text, start_line, strip_quotes, type_identifiers, walk_tree,
};

pub struct CppSyntax;

/// Descend a declarator chain (pointer/reference wrappers) to the
/// `function_declarator`.
fn function_declarator(node: Node) -> Option<Node> {
    let mut current = node;
    loop {
        if current.kind() == "function_declarator" {
            return Some(current);
        }
        if let Some(inner) = current.child_by_field_name("declarator") {
            current = inner;
            continue;
        }
        // reference_declarator has no field name for its inner declarator.
        let mut found = None;
        let mut cursor = current.walk();
        for child in current.named_children(&mut cursor) {
            if child.kind().ends_with("declarator") {
                found = Some(child);
                break;
            }
        }
        current = found?;
    }
}

/// Collect the segments of a qualified identifier: `A::B::name` yields
/// `(["A", "B"], "name")`.
fn qualified_segments(node: Node, src: &str) -> Option<(Vec<String>, String)> {
    let mut scopes = Vec::new();
    let mut current = node;
    loop {
        match current.kind() {
            "qualified_identifier" => {
                if let Some(scope) = current.child_by_field_name("scope") {
                    scopes.push(node_text(scope, src).to_string());
                }
                current = current.child_by_field_name("name")?;
            }
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" => {
                return Some((scopes, canonical_name(current, src)));
            }
            _ => return None,
        }
    }
}

/// Canonical method-name token: operator names keep the whole
/// `operator<symbol>` token with interior whitespace removed.
fn canonical_name(node: Node, src: &str) -> String {
    let text = node_text(node, src);
    if node.kind() == "operator_name" {
        text.split_whitespace().collect()
    } else {
        text.to_string()
    }
}

fn recv_shape(syntax: &dyn Syntax, node: Node, src: &str) -> Recv {
    match node.kind() {
        "this" => Recv::SelfRef,
        "identifier" => Recv::Name(node_text(node, src).to_string()),
        "field_expression" => match flatten_fields(node, src) {
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

fn flatten_fields(node: Node, src: &str) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" => Some(vec![node_text(node, src).to_string()]),
        "this" => Some(vec!["self".to_string()]),
        "field_expression" => {
            let argument = node.child_by_field_name("argument")?;
            let field = node.child_by_field_name("field")?;
            if field.kind() != "field_identifier" {
                return None;
            }
            let mut segments = flatten_fields(argument, src)?;
            segments.push(node_text(field, src).to_string());
            Some(segments)
        }
        _ => None,
    }
}

impl Syntax for CppSyntax {
    fn definition(&self, node: Node, kind: DefCaptureKind, src: &str) -> Option<DefName> {
        match kind {
            DefCaptureKind::Function => {
                let declarator = function_declarator(node.child_by_field_name("declarator")?)?;
                let name_node = declarator.child_by_field_name("declarator")?;
                let (scopes, name) = qualified_segments(name_node, src)?;
                Some(DefName {
                    kind,
                    name,
                    owner: (!scopes.is_empty()).then(|| scopes.join(".")),
                })
            }
            DefCaptureKind::Class | DefCaptureKind::Struct => {
                // Bodyless specifiers are type references, not definitions.
                node.child_by_field_name("body")?;
                let name = node.child_by_field_name("name")?;
                Some(DefName {
                    kind,
                    name: node_text(name, src).to_string(),
                    owner: None,
                })
            }
            DefCaptureKind::Namespace => {
                let name = node.child_by_field_name("name")?;
                Some(DefName {
                    kind,
                    name: node_text(name, src).to_string(),
                    owner: None,
                })
            }
            _ => None,
        }
    }

    fn parameters(&self, node: Node, src: &str) -> Vec<Param> {
        let Some(declarator) = node
            .child_by_field_name("declarator")
            .and_then(function_declarator)
        else {
            return Vec::new();
        };
        let Some(params) = declarator.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            if child.kind() != "parameter_declaration" {
                continue;
            }
            let type_names = child
                .child_by_field_name("type")
                .map(|t| type_identifiers(t, src))
                .unwrap_or_default();
            let mut name = None;
            if let Some(decl) = child.child_by_field_name("declarator") {
                walk_tree(decl, &mut |n| {
                    if name.is_none() && n.kind() == "identifier" {
                        name = Some(node_text(n, src).to_string());
                    }
                });
            }
            if let Some(name) = name {
                out.push(Param { name, type_names });
            }
        }
        out
    }

    fn return_type_names(&self, node: Node, src: &str) -> Vec<String> {
        node.child_by_field_name("type")
            .map(|t| type_identifiers(t, src))
            .unwrap_or_default()
    }

    fn imports(&self, _root: Node, captures: &[Node], src: &str) -> Vec<ImportStmt> {
        let mut out = Vec::new();
        for &node in captures {
            if node.kind() != "preproc_include" {
                continue;
            }
            let Some(path) = node.child_by_field_name("path") else {
                continue;
            };
            match path.kind() {
                // Quoted includes resolve against the including file's
                // directory; angle includes are always external.
                "string_literal" => out.push(ImportStmt::SideEffect {
                    spec: ModuleSpec::Specifier(strip_quotes(node_text(path, src)).to_string()),
                }),
                "system_lib_string" => {
                    let text = node_text(path, src);
                    let name = text.trim_start_matches('<').trim_end_matches('>');
                    out.push(ImportStmt::SideEffect {
                        spec: ModuleSpec::External(name.to_string()),
                    });
                }
                _ => {}
            }
        }
        out
    }

    fn call_shape(&self, node: Node, src: &str) -> Option<CallShape> {
        let function = node.child_by_field_name("function")?;
        let line = start_line(node);
        let callee = match function.kind() {
            "identifier" => Callee::Bare(node_text(function, src).to_string()),
            "qualified_identifier" => {
                let (mut scopes, name) = qualified_segments(function, src)?;
                scopes.push(name);
                Callee::Path(scopes)
            }
            "field_expression" => {
                let argument = function.child_by_field_name("argument")?;
                let field = function.child_by_field_name("field")?;
                if field.kind() != "field_identifier" {
                    return None;
                }
                Callee::Member {
                    recv: recv_shape(self, argument, src),
                    name: node_text(field, src).to_string(),
                }
            }
            _ => return None,
        };
        Some(CallShape { callee, line })
    }

    fn binding(&self, node: Node, src: &str) -> Option<Binding> {
        if node.kind() != "declaration" {
            return None;
        }
        let type_node = node.child_by_field_name("type")?;
        let declarator = node.child_by_field_name("declarator")?;

        match declarator.kind() {
            // `Widget w;` - the declared type is the binding's type.
            "identifier" => Some(Binding {
                target: node_text(declarator, src).to_string(),
                value: RValue::Construct(type_identifiers(type_node, src)),
            }),
            "init_declarator" => {
                let name = declarator.child_by_field_name("declarator")?;
                if name.kind() != "identifier" {
                    return None;
                }
                let target = node_text(name, src).to_string();
                let type_names = type_identifiers(type_node, src);
                let is_auto = type_names.iter().any(|t| t == "auto");

                let value = declarator.child_by_field_name("value");
                let rvalue = match value.map(|v| v.kind()) {
                    Some("new_expression") => {
                        let v = value.unwrap();
                        match v.child_by_field_name("type") {
                            Some(t) => RValue::Construct(type_identifiers(t, src)),
                            None => RValue::Other,
                        }
                    }
                    Some("call_expression") if is_auto => match self
                        .call_shape(value.unwrap(), src)
                    {
                        Some(shape) => RValue::Call(shape),
                        None => RValue::Other,
                    },
                    _ if !is_auto => RValue::Construct(type_names),
                    _ => RValue::Other,
                };
                Some(Binding {
                    target,
                    value: rvalue,
                })
            }
            _ => None,
        }
    }

    fn constructed_types(&self, body: Node, src: &str) -> Vec<String> {
        let mut names = Vec::new();
        walk_tree(body, &mut |n| match n.kind() {
            "new_expression" => {
                if let Some(t) = n.child_by_field_name("type")
                    && let Some(last) = type_identifiers(t, src).into_iter().next_back()
                {
                    names.push(last);
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
}
