//! Python full-scan behavior: cross-file method calls through imports,
//! package containment, wildcard imports, and docstrings.

mod common;

use codegraph::graph::{NodeLabel, RelType};
use common::project;
use std::collections::HashSet;

fn python_fixture() -> common::Fixture {
    let fx = project("app");
    fx.write("pkg/__init__.py", "");
    fx.write(
        "pkg/user.py",
        r#"class User:
    """A user account."""

    def __init__(self, name):
        self.name = name

    def get_name(self):
        return self.name

    def validate(self):
        return len(self.name) > 0


def make_user():
    return User("default")
"#,
    );
    fx.write(
        "main.py",
        r#"from pkg.user import User


def main():
    u = User("John")
    u.validate()
"#,
    );
    fx.write(
        "tools.py",
        r#"from pkg.user import *


def run():
    u = make_user()
    return u.get_name()
"#,
    );
    fx
}

#[test]
fn imported_class_method_calls_resolve_across_files() {
    let (_updater, ingestor) = python_fixture().scan();

    assert!(
        ingestor.has_edge(RelType::Calls, "app.main.main", "app.pkg.user.User.validate"),
        "expected main -> User.validate, got: {:?}",
        ingestor.edges(RelType::Calls)
    );
    assert!(ingestor.has_edge(
        RelType::Calls,
        "app.main.main",
        "app.pkg.user.User.__init__"
    ));
}

#[test]
fn wildcard_imports_resolve_lazily() {
    let (_updater, ingestor) = python_fixture().scan();

    // Bare name through the wildcard source.
    assert!(ingestor.has_edge(
        RelType::Calls,
        "app.tools.run",
        "app.pkg.user.make_user"
    ));
    // Factory return type inferred from the returned constructor.
    assert!(ingestor.has_edge(
        RelType::Calls,
        "app.tools.run",
        "app.pkg.user.User.get_name"
    ));
}

#[test]
fn package_and_module_containment() {
    let (_updater, ingestor) = python_fixture().scan();

    assert!(ingestor.node_keys(NodeLabel::Package).contains(&"app.pkg".to_string()));
    assert!(ingestor.has_edge(RelType::ContainsPackage, "app", "app.pkg"));
    assert!(ingestor.has_edge(RelType::ContainsModule, "app.pkg", "pkg/user.py"));
    assert!(ingestor.has_edge(RelType::ContainsFile, "app", "main.py"));

    let modules = ingestor.node_keys(NodeLabel::Module);
    assert!(modules.contains(&"pkg/__init__.py".to_string()));
    assert!(modules.contains(&"pkg/user.py".to_string()));
    assert!(modules.contains(&"main.py".to_string()));
}

#[test]
fn class_methods_hang_off_their_class() {
    let (_updater, ingestor) = python_fixture().scan();

    for method in ["__init__", "get_name", "validate"] {
        assert!(
            ingestor.has_edge(
                RelType::DefinesMethod,
                "app.pkg.user.User",
                &format!("app.pkg.user.User.{method}")
            ),
            "missing DEFINES_METHOD for {method}"
        );
    }
    assert!(ingestor.has_edge(
        RelType::Defines,
        "pkg/user.py",
        "app.pkg.user.make_user"
    ));
}

#[test]
fn docstrings_are_captured() {
    let (_updater, ingestor) = python_fixture().scan();

    let props = ingestor
        .node_props(NodeLabel::Class, "app.pkg.user.User")
        .expect("User class node");
    assert_eq!(
        props.get("docstring").and_then(|v| v.as_str()),
        Some("A user account.")
    );
}

#[test]
fn qualified_names_are_pairwise_distinct() {
    let (_updater, ingestor) = python_fixture().scan();

    let mut qns: Vec<String> = ingestor.node_keys(NodeLabel::Function);
    qns.extend(ingestor.node_keys(NodeLabel::Method));
    let unique: HashSet<&String> = qns.iter().collect();
    assert_eq!(unique.len(), qns.len(), "duplicate qualified names: {qns:?}");
}

#[test]
fn every_definition_has_exactly_one_parent_edge() {
    let (_updater, ingestor) = python_fixture().scan();

    let mut qns: Vec<String> = ingestor.node_keys(NodeLabel::Function);
    qns.extend(ingestor.node_keys(NodeLabel::Method));
    qns.extend(ingestor.node_keys(NodeLabel::Class));

    for qn in qns {
        let parents = ingestor
            .relationships
            .iter()
            .filter(|(_, rel, to)| {
                matches!(rel, RelType::Defines | RelType::DefinesMethod) && to.key == qn
            })
            .count();
        assert_eq!(parents, 1, "{qn} has {parents} parent edges");
    }
}

#[test]
fn imports_edge_per_imported_module() {
    let (_updater, ingestor) = python_fixture().scan();

    assert!(ingestor.has_edge(RelType::Imports, "main.py", "pkg/user.py"));
    assert!(ingestor.has_edge(RelType::Imports, "tools.py", "pkg/user.py"));
}
