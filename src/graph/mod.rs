//! Graph data model: node labels, relationship types, and node references.
//!
//! Nodes are triple-identified as `(label, key_attr, key_value)`; the
//! in-process side never holds object references between nodes, only the
//! key strings, so there are no cycles to manage.

use serde_json::Value;

/// Node labels in the code graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLabel {
    Project,
    Folder,
    Package,
    Module,
    Class,
    Struct,
    Function,
    Method,
    ExternalPackage,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Project => "Project",
            NodeLabel::Folder => "Folder",
            NodeLabel::Package => "Package",
            NodeLabel::Module => "Module",
            NodeLabel::Class => "Class",
            NodeLabel::Struct => "Struct",
            NodeLabel::Function => "Function",
            NodeLabel::Method => "Method",
            NodeLabel::ExternalPackage => "ExternalPackage",
        }
    }

    /// The attribute that uniquely identifies a node with this label.
    ///
    /// Modules and folders are keyed by project-relative path; everything
    /// else by qualified name (ExternalPackage stores the full specifier
    /// string in `qualified_name`).
    pub fn key_attr(&self) -> &'static str {
        match self {
            NodeLabel::Project => "name",
            NodeLabel::Folder => "path",
            NodeLabel::Module => "path",
            _ => "qualified_name",
        }
    }

    /// True for labels that can be the target of a CALLS edge.
    pub fn is_callable(&self) -> bool {
        matches!(self, NodeLabel::Function | NodeLabel::Method)
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relationship types in the code graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelType {
    ContainsFolder,
    ContainsFile,
    ContainsPackage,
    ContainsModule,
    Defines,
    DefinesMethod,
    Inherits,
    Imports,
    Calls,
}

impl RelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::ContainsFolder => "CONTAINS_FOLDER",
            RelType::ContainsFile => "CONTAINS_FILE",
            RelType::ContainsPackage => "CONTAINS_PACKAGE",
            RelType::ContainsModule => "CONTAINS_MODULE",
            RelType::Defines => "DEFINES",
            RelType::DefinesMethod => "DEFINES_METHOD",
            RelType::Inherits => "INHERITS",
            RelType::Imports => "IMPORTS",
            RelType::Calls => "CALLS",
        }
    }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a node by its identifying triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub key_attr: &'static str,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: NodeLabel, key: impl Into<String>) -> Self {
        Self {
            label,
            key_attr: label.key_attr(),
            key: key.into(),
        }
    }
}

/// Property map attached to a node at ingestion time.
pub type Props = serde_json::Map<String, Value>;

/// Build a property map from `(name, value)` pairs.
pub fn props<const N: usize>(pairs: [(&str, Value); N]) -> Props {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_attrs_match_labels() {
        assert_eq!(NodeLabel::Project.key_attr(), "name");
        assert_eq!(NodeLabel::Module.key_attr(), "path");
        assert_eq!(NodeLabel::Folder.key_attr(), "path");
        assert_eq!(NodeLabel::Method.key_attr(), "qualified_name");
        assert_eq!(NodeLabel::ExternalPackage.key_attr(), "qualified_name");
    }

    #[test]
    fn props_builder_preserves_values() {
        let p = props([("name", json!("main")), ("start_line", json!(3))]);
        assert_eq!(p.get("name"), Some(&json!("main")));
        assert_eq!(p.get("start_line"), Some(&json!(3)));
    }

    #[test]
    fn only_functions_and_methods_are_callable() {
        assert!(NodeLabel::Function.is_callable());
        assert!(NodeLabel::Method.is_callable());
        assert!(!NodeLabel::Class.is_callable());
        assert!(!NodeLabel::Module.is_callable());
    }
}
