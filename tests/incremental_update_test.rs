//! Scan-level properties: idempotence, the observable pass boundary, and
//! incremental equivalence for modify, create, and delete.

mod common;

use codegraph::graph::{NodeLabel, RelType};
use common::project;
use serde_json::json;

fn simple_fixture() -> common::Fixture {
    let fx = project("app");
    fx.write(
        "lib.py",
        r#"class Greeter:
    def hello(self):
        return "hi"

    def bye(self):
        return "bye"
"#,
    );
    fx.write(
        "main.py",
        r#"from lib import Greeter


def main():
    g = Greeter()
    g.hello()
"#,
    );
    fx
}

#[test]
fn full_scan_is_idempotent() {
    let fx = simple_fixture();
    let (_u1, first) = fx.scan();
    let (_u2, second) = fx.scan();
    assert_eq!(first.trace(), second.trace());
}

#[test]
fn each_pass_ends_with_a_flush() {
    let fx = simple_fixture();
    let (_updater, ingestor) = fx.scan();
    assert_eq!(ingestor.flush_count, 2);
}

#[test]
fn incremental_modify_matches_a_fresh_scan() {
    let fx = simple_fixture();
    let (mut updater, mut ingestor) = fx.scan();

    // Edit main.py to call a second method.
    fx.write(
        "main.py",
        r#"from lib import Greeter


def main():
    g = Greeter()
    g.hello()
    g.bye()
"#,
    );
    let nodes_before = ingestor.nodes.len();
    let rels_before = ingestor.relationships.len();
    let path = updater.root().join("main.py");
    updater.update_file(&path, &mut ingestor).unwrap();

    // The update issued the path-scoped subtree delete first.
    let (query, params) = ingestor.writes.last().expect("delete write");
    assert!(query.contains("DETACH DELETE"));
    assert_eq!(params.get("path"), Some(&json!("main.py")));

    // Deletion, pass 1, pass 2, flush: one more barrier.
    assert_eq!(ingestor.flush_count, 3);

    // Re-ingested nodes and edges for the file.
    let new_nodes = &ingestor.nodes[nodes_before..];
    assert!(
        new_nodes
            .iter()
            .any(|(label, props)| *label == NodeLabel::Module
                && props.get("path") == Some(&json!("main.py")))
    );
    let new_calls: Vec<_> = ingestor.relationships[rels_before..]
        .iter()
        .filter(|(_, rel, _)| *rel == RelType::Calls)
        .map(|(from, _, to)| (from.key.clone(), to.key.clone()))
        .collect();
    assert!(new_calls.contains(&("app.main.main".to_string(), "app.lib.Greeter.hello".to_string())));
    assert!(new_calls.contains(&("app.main.main".to_string(), "app.lib.Greeter.bye".to_string())));

    // A fresh scan of the edited repo agrees on main.py's call edges.
    let (_u, fresh) = fx.scan();
    let fresh_calls: Vec<_> = fresh
        .edges(RelType::Calls)
        .into_iter()
        .filter(|(from, _)| from.starts_with("app.main."))
        .collect();
    for call in &fresh_calls {
        assert!(
            new_calls.contains(call),
            "incremental update missed {call:?}"
        );
    }
}

#[test]
fn incremental_create_ingests_the_new_file() {
    let fx = simple_fixture();
    let (mut updater, mut ingestor) = fx.scan();

    fx.write(
        "extra.py",
        r#"from lib import Greeter


def extra():
    Greeter().bye()
"#,
    );
    let path = updater.root().join("extra.py");
    updater.update_file(&path, &mut ingestor).unwrap();

    assert!(ingestor.node_keys(NodeLabel::Module).contains(&"extra.py".to_string()));
    assert!(ingestor.has_edge(RelType::Calls, "app.extra.extra", "app.lib.Greeter.bye"));
}

#[test]
fn incremental_delete_only_removes() {
    let fx = simple_fixture();
    let (mut updater, mut ingestor) = fx.scan();

    fx.remove("main.py");
    let nodes_before = ingestor.nodes.len();
    let path = updater.root().join("main.py");
    updater.update_file(&path, &mut ingestor).unwrap();

    let (query, params) = ingestor.writes.last().expect("delete write");
    assert!(query.contains("DETACH DELETE"));
    assert_eq!(params.get("path"), Some(&json!("main.py")));
    // Nothing re-ingested for a deleted file.
    assert_eq!(ingestor.nodes.len(), nodes_before);
}

#[test]
fn unresolved_calls_are_dropped_not_invented() {
    let fx = project("app");
    fx.write(
        "solo.py",
        r#"import os


def main():
    os.getcwd()
    unknown_helper()
"#,
    );
    let (_updater, ingestor) = fx.scan();

    // Neither the external os.getcwd nor the unknown bare call produce
    // edges; the import itself becomes an external package.
    assert!(ingestor.edges(RelType::Calls).is_empty());
    assert!(
        ingestor
            .node_keys(NodeLabel::ExternalPackage)
            .contains(&"os".to_string())
    );
    assert!(ingestor.has_edge(RelType::Imports, "solo.py", "os"));
}
