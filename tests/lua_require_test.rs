//! Lua modules: require imports and calls into the returned table.

mod common;

use codegraph::graph::RelType;
use common::project;

#[test]
fn required_table_functions_resolve() {
    let fx = project("app");
    fx.write(
        "util.lua",
        r#"local M = {}

function M.greet(name)
  return "hello " .. name
end

return M
"#,
    );
    fx.write(
        "main.lua",
        r#"local util = require("util")

local function run()
  return util.greet("world")
end
"#,
    );
    let (_updater, ingestor) = fx.scan();

    assert!(ingestor.has_edge(RelType::Imports, "main.lua", "util.lua"));
    assert!(
        ingestor.has_edge(RelType::Calls, "app.main.run", "app.util.M.greet"),
        "calls: {:?}",
        ingestor.edges(RelType::Calls)
    );
    assert!(ingestor.has_edge(
        RelType::DefinesMethod,
        "app.util.M",
        "app.util.M.greet"
    ));
}

#[test]
fn colon_methods_resolve_on_self() {
    let fx = project("app");
    fx.write(
        "account.lua",
        r#"local Account = {}

function Account.validate(self)
  return self.balance >= 0
end

function Account:deposit(amount)
  self.balance = self.balance + amount
  return self:report()
end

function Account:report()
  return self.balance
end

return Account
"#,
    );
    let (_updater, ingestor) = fx.scan();

    // `self:report()` inside a colon method resolves to a sibling.
    assert!(
        ingestor.has_edge(
            RelType::Calls,
            "app.account.Account.deposit",
            "app.account.Account.report"
        ),
        "calls: {:?}",
        ingestor.edges(RelType::Calls)
    );
}
