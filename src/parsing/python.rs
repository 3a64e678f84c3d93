//! Python syntax rules.

use tree_sitter::Node;

use crate::parsing::syntax::{
    Binding, CallShape, Callee, DefCaptureKind, DefName, ImportStmt, ModuleSpec, Param, RValue,
    Recv, Syntax, node_text, start_line, strip_quotes, type_identifiers, walk_tree,
};

pub struct PythonSyntax;

impl PythonSyntax {
    /// Flatten an attribute chain into plain name segments, innermost
    /// object first. `None` when any link is not a plain name.
    fn flatten_attribute(node: Node, src: &str) -> Option<Vec<String>> {
        match node.kind() {
            "identifier" => Some(vec![node_text(node, src).to_string()]),
            "attribute" => {
                let object = node.child_by_field_name("object")?;
                let attr = node.child_by_field_name("attribute")?;
                let mut segments = Self::flatten_attribute(object, src)?;
                segments.push(node_text(attr, src).to_string());
                Some(segments)
            }
            _ => None,
        }
    }

    fn recv_shape(&self, node: Node, src: &str) -> Recv {
        match node.kind() {
            "identifier" => {
                let name = node_text(node, src);
                if name == "self" {
                    Recv::SelfRef
                } else {
                    Recv::Name(name.to_string())
                }
            }
            "attribute" => match Self::flatten_attribute(node, src) {
                Some(segments) => Recv::Path(segments),
                None => Recv::Other,
            },
            "call" => match self.call_shape(node, src) {
                Some(shape) => Recv::Call(Box::new(shape)),
                None => Recv::Other,
            },
            _ => Recv::Other,
        }
    }

    fn spec_of(module_name: Node, src: &str) -> ModuleSpec {
        match module_name.kind() {
            "relative_import" => {
                let mut hops = 0;
                let mut segments = Vec::new();
                let mut cursor = module_name.walk();
                for child in module_name.children(&mut cursor) {
                    match child.kind() {
                        "import_prefix" => hops = node_text(child, src).len(),
                        "dotted_name" => {
                            segments = node_text(child, src)
                                .split('.')
                                .map(str::to_string)
                                .collect();
                        }
                        _ => {}
                    }
                }
                ModuleSpec::Qualified {
                    segments,
                    relative_hops: hops,
                }
            }
            _ => ModuleSpec::qualified(
                node_text(module_name, src)
                    .split('.')
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }
}

impl Syntax for PythonSyntax {
    fn definition(&self, node: Node, kind: DefCaptureKind, src: &str) -> Option<DefName> {
        let name = node.child_by_field_name("name")?;
        Some(DefName {
            kind,
            name: node_text(name, src).to_string(),
            owner: None,
        })
    }

    fn parameters(&self, node: Node, src: &str) -> Vec<Param> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            match child.kind() {
                "identifier" => out.push(Param {
                    name: node_text(child, src).to_string(),
                    type_names: Vec::new(),
                }),
                "typed_parameter" | "typed_default_parameter" => {
                    let name = child
                        .child_by_field_name("name")
                        .or_else(|| child.named_child(0).filter(|n| n.kind() == "identifier"));
                    let type_names = child
                        .child_by_field_name("type")
                        .map(|t| type_identifiers(t, src))
                        .unwrap_or_default();
                    if let Some(name) = name {
                        out.push(Param {
                            name: node_text(name, src).to_string(),
                            type_names,
                        });
                    }
                }
                "default_parameter" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        out.push(Param {
                            name: node_text(name, src).to_string(),
                            type_names: Vec::new(),
                        });
                    }
                }
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

    fn docstring(&self, node: Node, src: &str) -> Option<String> {
        let body = node.child_by_field_name("body")?;
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0).filter(|n| n.kind() == "string")?;
        Some(strip_quotes(node_text(string, src)).trim().to_string())
    }

    fn imports(&self, _root: Node, captures: &[Node], src: &str) -> Vec<ImportStmt> {
        let mut out = Vec::new();
        for &node in captures {
            match node.kind() {
                "import_statement" => {
                    let mut cursor = node.walk();
                    for child in node.children_by_field_name("name", &mut cursor) {
                        match child.kind() {
                            "dotted_name" => out.push(ImportStmt::Module {
                                spec: Self::spec_of(child, src),
                                alias: None,
                            }),
                            "aliased_import" => {
                                let name = child.child_by_field_name("name");
                                let alias = child.child_by_field_name("alias");
                                if let (Some(name), Some(alias)) = (name, alias) {
                                    out.push(ImportStmt::Module {
                                        spec: Self::spec_of(name, src),
                                        alias: Some(node_text(alias, src).to_string()),
                                    });
                                }
                            }
                            _ => {}
                        }
                    }
                }
                "import_from_statement" => {
                    let Some(module_name) = node.child_by_field_name("module_name") else {
                        continue;
                    };
                    let spec = Self::spec_of(module_name, src);

                    let has_wildcard = {
                        let mut cursor = node.walk();
                        node.children(&mut cursor)
                            .any(|c| c.kind() == "wildcard_import")
                    };
                    if has_wildcard {
                        out.push(ImportStmt::Wildcard { spec });
                        continue;
                    }

                    let mut cursor = node.walk();
                    for child in node.children_by_field_name("name", &mut cursor) {
                        match child.kind() {
                            "dotted_name" => out.push(ImportStmt::Named {
                                spec: spec.clone(),
                                name: node_text(child, src).to_string(),
                                alias: None,
                            }),
                            "aliased_import" => {
                                let name = child.child_by_field_name("name");
                                let alias = child.child_by_field_name("alias");
                                if let (Some(name), Some(alias)) = (name, alias) {
                                    out.push(ImportStmt::Named {
                                        spec: spec.clone(),
                                        name: node_text(name, src).to_string(),
                                        alias: Some(node_text(alias, src).to_string()),
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
        out
    }

    fn call_shape(&self, node: Node, src: &str) -> Option<CallShape> {
        let function = node.child_by_field_name("function")?;
        let line = start_line(node);
        let callee = match function.kind() {
            "identifier" => Callee::Bare(node_text(function, src).to_string()),
            "attribute" => {
                let object = function.child_by_field_name("object")?;
                let attr = function.child_by_field_name("attribute")?;
                Callee::Member {
                    recv: self.recv_shape(object, src),
                    name: node_text(attr, src).to_string(),
                }
            }
            _ => return None,
        };
        Some(CallShape { callee, line })
    }

    fn binding(&self, node: Node, src: &str) -> Option<Binding> {
        if node.kind() != "assignment" {
            return None;
        }
        let left = node.child_by_field_name("left")?;
        let right = node.child_by_field_name("right")?;

        let target = match left.kind() {
            "identifier" => node_text(left, src).to_string(),
            "attribute" => {
                let segments = Self::flatten_attribute(left, src)?;
                if segments.first().map(String::as_str) != Some("self") {
                    return None;
                }
                segments.join(".")
            }
            _ => return None,
        };

        let value = match right.kind() {
            "call" => match self.call_shape(right, src) {
                Some(shape) => RValue::Call(shape),
                None => RValue::Other,
            },
            "identifier" => RValue::Name(node_text(right, src).to_string()),
            _ => RValue::Other,
        };
        Some(Binding { target, value })
    }

    fn constructed_types(&self, body: Node, src: &str) -> Vec<String> {
        let mut names = Vec::new();
        walk_tree(body, &mut |n| {
            if n.kind() == "return_statement"
                && let Some(expr) = n.named_child(0)
                && expr.kind() == "call"
                && let Some(function) = expr.child_by_field_name("function")
                && function.kind() == "identifier"
            {
                names.push(node_text(function, src).to_string());
            }
        });
        names
    }
}
