//! TypeScript declarations: enums and classes coexist without spurious
//! module-level functions, and enum member access produces no calls.

mod common;

use codegraph::graph::{NodeLabel, RelType};
use common::project;

#[test]
fn enum_using_class_produces_no_spurious_definitions() {
    let fx = project("app");
    fx.write(
        "task.ts",
        r#"enum Status {
  Pending,
  Approved,
}

class Task {
  status: Status = Status.Pending;

  process(): string {
    switch (this.status) {
      case Status.Approved:
        return "done";
      default:
        return "waiting";
    }
  }
}

export default Task;
"#,
    );
    let (_updater, ingestor) = fx.scan();

    let classes = ingestor.node_keys(NodeLabel::Class);
    assert!(classes.contains(&"app.task.Status".to_string()));
    assert!(classes.contains(&"app.task.Task".to_string()));

    assert!(ingestor.has_edge(
        RelType::DefinesMethod,
        "app.task.Task",
        "app.task.Task.process"
    ));

    // No module-level Function for the method, and no calls invented
    // from enum member access.
    assert!(ingestor.node_keys(NodeLabel::Function).is_empty());
    assert!(ingestor.edges(RelType::Calls).is_empty());
}

#[test]
fn typed_parameters_drive_method_resolution() {
    let fx = project("app");
    fx.write(
        "models.ts",
        r#"export class User {
  constructor(public name: string) {}

  validate(): boolean {
    return this.name.length > 0;
  }
}
"#,
    );
    fx.write(
        "service.ts",
        r#"import { User } from './models';

export function check(user: User): boolean {
  return user.validate();
}
"#,
    );
    let (_updater, ingestor) = fx.scan();

    assert!(
        ingestor.has_edge(
            RelType::Calls,
            "app.service.check",
            "app.models.User.validate"
        ),
        "expected check -> User.validate, got: {:?}",
        ingestor.edges(RelType::Calls)
    );
}
