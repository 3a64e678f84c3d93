//! TypeScript syntax rules.
//!
//! Shares the JavaScript extraction logic; adds typed parameters, return
//! annotations, and the TypeScript-only declaration forms (enums,
//! interfaces, abstract classes).

use tree_sitter::Node;

use crate::parsing::javascript;
use crate::parsing::syntax::{
    Binding, CallShape, DefCaptureKind, DefName, ImportStmt, Param, Syntax, node_text,
    type_identifiers,
};

pub struct TsSyntax;

impl Syntax for TsSyntax {
    fn definition(&self, node: Node, kind: DefCaptureKind, src: &str) -> Option<DefName> {
        javascript::definition_name(node, kind, src)
    }

    fn parameters(&self, node: Node, src: &str) -> Vec<Param> {
        let Some(params) = node.child_by_field_name("parameters") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            match child.kind() {
                "required_parameter" | "optional_parameter" => {
                    let Some(pattern) = child.child_by_field_name("pattern") else {
                        continue;
                    };
                    if pattern.kind() != "identifier" && pattern.kind() != "this" {
                        continue;
                    }
                    let type_names = child
                        .child_by_field_name("type")
                        .and_then(|t| t.named_child(0))
                        .map(|t| type_identifiers(t, src))
                        .unwrap_or_default();
                    out.push(Param {
                        name: node_text(pattern, src).to_string(),
                        type_names,
                    });
                }
                "identifier" => out.push(Param {
                    name: node_text(child, src).to_string(),
                    type_names: Vec::new(),
                }),
                _ => {}
            }
        }
        out
    }

    fn return_type_names(&self, node: Node, src: &str) -> Vec<String> {
        // return_type is a type_annotation wrapping the actual type.
        node.child_by_field_name("return_type")
            .map(|t| t.named_child(0).unwrap_or(t))
            .map(|t| type_identifiers(t, src))
            .unwrap_or_default()
    }

    fn imports(&self, root: Node, captures: &[Node], src: &str) -> Vec<ImportStmt> {
        javascript::imports(root, captures, src)
    }

    fn default_export(&self, root: Node, src: &str) -> Option<String> {
        javascript::default_export(root, src)
    }

    fn call_shape(&self, node: Node, src: &str) -> Option<CallShape> {
        javascript::call_shape(self, node, src)
    }

    fn binding(&self, node: Node, src: &str) -> Option<Binding> {
        javascript::binding(self, node, src)
    }

    fn constructed_types(&self, body: Node, src: &str) -> Vec<String> {
        javascript::constructed_types(body, src)
    }
}
