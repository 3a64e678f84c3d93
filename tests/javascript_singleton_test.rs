//! CommonJS singleton pattern: a class exported via `module.exports`,
//! required under the same name, with static-factory and instance calls
//! resolving into the exporting module.

mod common;

use codegraph::graph::{NodeLabel, RelType};
use common::project;

fn singleton_fixture() -> common::Fixture {
    let fx = project("app");
    fx.write(
        "storage/Storage.js",
        r#"class Storage {
  constructor() {
    this.items = {};
  }

  static getInstance() {
    if (!Storage.instance) {
      Storage.instance = new Storage();
    }
    return Storage.instance;
  }

  load(key) {
    return this.items[key];
  }

  save(key, value) {
    this.items[key] = value;
  }
}

module.exports = Storage;
"#,
    );
    fx.write(
        "main.js",
        r#"const Storage = require('./storage/Storage');

class Application {
  start() {
    const s = Storage.getInstance();
    return s.load('x');
  }
}

module.exports = Application;
"#,
    );
    fx
}

#[test]
fn static_factory_and_instance_calls_resolve() {
    let (_updater, ingestor) = singleton_fixture().scan();

    assert!(
        ingestor.has_edge(
            RelType::Calls,
            "app.main.Application.start",
            "app.storage.Storage.Storage.getInstance"
        ),
        "expected start -> getInstance, got: {:?}",
        ingestor.edges(RelType::Calls)
    );
    assert!(ingestor.has_edge(
        RelType::Calls,
        "app.main.Application.start",
        "app.storage.Storage.Storage.load"
    ));
}

#[test]
fn require_produces_an_imports_edge() {
    let (_updater, ingestor) = singleton_fixture().scan();
    assert!(ingestor.has_edge(RelType::Imports, "main.js", "storage/Storage.js"));
}

#[test]
fn methods_belong_to_the_exported_class() {
    let (_updater, ingestor) = singleton_fixture().scan();

    for method in ["getInstance", "load", "save", "constructor"] {
        assert!(
            ingestor.has_edge(
                RelType::DefinesMethod,
                "app.storage.Storage.Storage",
                &format!("app.storage.Storage.Storage.{method}")
            ),
            "missing DEFINES_METHOD for {method}"
        );
    }
}

#[test]
fn arrow_functions_stay_nested_in_their_function() {
    let fx = project("app");
    fx.write(
        "worker.js",
        r#"function setup() {
  const handlers = {};
  handlers.onMessage = (msg) => {
    return msg.id;
  };
  return handlers;
}
"#,
    );
    let (_updater, ingestor) = fx.scan();

    let functions = ingestor.node_keys(NodeLabel::Function);
    assert!(functions.contains(&"app.worker.setup".to_string()));
    // The arrow is nested under setup, never promoted to module level.
    assert!(functions.contains(&"app.worker.setup.onMessage".to_string()));
    assert!(!functions.contains(&"app.worker.onMessage".to_string()));
    assert!(ingestor.has_edge(
        RelType::Defines,
        "app.worker.setup",
        "app.worker.setup.onMessage"
    ));
}
