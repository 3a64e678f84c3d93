//! C++ specifics: out-of-class definition spans, include resolution, and
//! inheritance through in-repo headers.

mod common;

use codegraph::graph::{NodeLabel, RelType};
use common::project;

fn cpp_fixture() -> common::Fixture {
    let fx = project("app");
    fx.write(
        "include/base.h",
        r#"#pragma once

class Base {
 public:
  virtual void describe() {}
};
"#,
    );
    // Declaration on line 6, definition on lines 10-12.
    fx.write(
        "src/local.cpp",
        r#"#include "../include/base.h"
#include <vector>

class Widget : public Base {
 public:
  int helper(int value);
};

// doubles the input
int Widget::helper(int value) {
  return value * 2;
}
"#,
    );
    fx
}

#[test]
fn out_of_class_method_gets_the_definition_span() {
    let (_updater, ingestor) = cpp_fixture().scan();

    let props = ingestor
        .node_props(NodeLabel::Method, "app.src.local.Widget.helper")
        .expect("Widget::helper method node");
    assert_eq!(props.get("start_line").and_then(|v| v.as_u64()), Some(10));
    assert_eq!(props.get("end_line").and_then(|v| v.as_u64()), Some(12));

    assert!(ingestor.has_edge(
        RelType::DefinesMethod,
        "app.src.local.Widget",
        "app.src.local.Widget.helper"
    ));
}

#[test]
fn includes_resolve_to_modules_or_external_packages() {
    let (_updater, ingestor) = cpp_fixture().scan();

    // Quoted include of an in-repo header.
    assert!(ingestor.has_edge(RelType::Imports, "src/local.cpp", "include/base.h"));
    // Angle include keyed by the bare specifier.
    assert!(
        ingestor
            .node_keys(NodeLabel::ExternalPackage)
            .contains(&"vector".to_string())
    );
    assert!(ingestor.has_edge(RelType::Imports, "src/local.cpp", "vector"));
}

#[test]
fn inheritance_resolves_through_included_headers() {
    let (_updater, ingestor) = cpp_fixture().scan();

    assert!(
        ingestor.has_edge(
            RelType::Inherits,
            "app.src.local.Widget",
            "app.include.base.Base"
        ),
        "expected Widget INHERITS Base, got: {:?}",
        ingestor.edges(RelType::Inherits)
    );
}

#[test]
fn operator_names_stay_single_tokens() {
    let fx = project("app");
    fx.write(
        "src/vec2.cpp",
        r#"struct Vec2 {
  float x;
  float y;

  Vec2 operator+(const Vec2& other) const {
    return Vec2{x + other.x, y + other.y};
  }
};
"#,
    );
    let (_updater, ingestor) = fx.scan();

    assert!(
        ingestor
            .node_keys(NodeLabel::Method)
            .contains(&"app.src.vec2.Vec2.operator+".to_string()),
        "methods: {:?}",
        ingestor.node_keys(NodeLabel::Method)
    );
}

#[test]
fn namespaces_contribute_qualified_name_segments() {
    let fx = project("app");
    fx.write(
        "src/geom.cpp",
        r#"namespace geom {

class Circle {
 public:
  double area() {
    return 3.14;
  }
};

}
"#,
    );
    let (_updater, ingestor) = fx.scan();

    assert!(
        ingestor
            .node_keys(NodeLabel::Class)
            .contains(&"app.src.geom.geom.Circle".to_string())
    );
    assert!(ingestor.has_edge(
        RelType::DefinesMethod,
        "app.src.geom.geom.Circle",
        "app.src.geom.geom.Circle.area"
    ));
}
