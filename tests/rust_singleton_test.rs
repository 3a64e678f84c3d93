//! Rust cross-file singleton: a static factory behind `Arc<Mutex<_>>`,
//! with guard variables keeping the inner type through lock/unwrap
//! plumbing.

mod common;

use codegraph::graph::RelType;
use common::project;

fn singleton_fixture() -> common::Fixture {
    let fx = project("app");
    fx.write(
        "src/storage/mod.rs",
        r#"use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct Storage {
    data: HashMap<String, String>,
}

impl Storage {
    fn new() -> Self {
        Storage {
            data: HashMap::new(),
        }
    }

    pub fn get_instance() -> Arc<Mutex<Storage>> {
        static mut INSTANCE: Option<Arc<Mutex<Storage>>> = None;
        unsafe {
            INSTANCE
                .get_or_insert_with(|| Arc::new(Mutex::new(Storage::new())))
                .clone()
        }
    }

    pub fn clear_all(&mut self) {
        self.data.clear();
    }

    pub fn save(&mut self, key: String, value: String) {
        self.data.insert(key, value);
    }

    pub fn load(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }
}
"#,
    );
    fx.write(
        "src/controllers/mod.rs",
        r#"use crate::storage::Storage;

pub struct SceneController {}

impl SceneController {
    pub fn new() -> Self {
        SceneController {}
    }

    pub fn load_menu_scene(&self) -> Option<String> {
        let storage = Storage::get_instance();
        let mut storage_guard = storage.lock().unwrap();

        storage_guard.clear_all();
        storage_guard.save("scene".to_string(), "menu".to_string());
        storage_guard.load("scene")
    }

    pub fn load_game_scene(&self, game_data: String) -> bool {
        let storage = Storage::get_instance();
        let mut storage_guard = storage.lock().unwrap();
        storage_guard.save("game_data".to_string(), game_data);
        true
    }
}
"#,
    );
    fx.write(
        "src/main.rs",
        r#"mod controllers;
mod storage;

use controllers::SceneController;
use storage::Storage;

struct Application {}

impl Application {
    fn new() -> Self {
        Application {}
    }

    fn start(&self) -> Option<String> {
        let controller = SceneController::new();
        controller.load_menu_scene();

        let storage = Storage::get_instance();
        let storage_guard = storage.lock().unwrap();
        let scene = storage_guard.load("scene");

        controller.load_game_scene(scene.clone().unwrap_or_default());
        scene
    }
}

fn main() {
    let app = Application::new();
    app.start();
}
"#,
    );
    fx
}

#[test]
fn singleton_calls_resolve_across_modules() {
    let (_updater, ingestor) = singleton_fixture().scan();

    let expected = [
        (
            "app.src.controllers.SceneController.load_menu_scene",
            "app.src.storage.Storage.get_instance",
        ),
        (
            "app.src.controllers.SceneController.load_menu_scene",
            "app.src.storage.Storage.clear_all",
        ),
        (
            "app.src.controllers.SceneController.load_menu_scene",
            "app.src.storage.Storage.save",
        ),
        (
            "app.src.controllers.SceneController.load_menu_scene",
            "app.src.storage.Storage.load",
        ),
        (
            "app.src.controllers.SceneController.load_game_scene",
            "app.src.storage.Storage.get_instance",
        ),
        (
            "app.src.controllers.SceneController.load_game_scene",
            "app.src.storage.Storage.save",
        ),
        (
            "app.src.main.Application.start",
            "app.src.controllers.SceneController.new",
        ),
        (
            "app.src.main.Application.start",
            "app.src.controllers.SceneController.load_menu_scene",
        ),
        (
            "app.src.main.Application.start",
            "app.src.controllers.SceneController.load_game_scene",
        ),
        (
            "app.src.main.Application.start",
            "app.src.storage.Storage.get_instance",
        ),
        ("app.src.main.Application.start", "app.src.storage.Storage.load"),
        ("app.src.main.main", "app.src.main.Application.new"),
        ("app.src.main.main", "app.src.main.Application.start"),
    ];

    let found = ingestor.edges(RelType::Calls);
    let mut missing = Vec::new();
    for (caller, callee) in expected {
        if !ingestor.has_edge(RelType::Calls, caller, callee) {
            missing.push((caller, callee));
        }
    }
    assert!(
        missing.is_empty(),
        "missing {} calls: {missing:#?}\nfound: {found:#?}",
        missing.len()
    );
}

#[test]
fn mod_declarations_bind_child_modules() {
    let (_updater, ingestor) = singleton_fixture().scan();

    assert!(ingestor.has_edge(RelType::Imports, "src/main.rs", "src/storage/mod.rs"));
    assert!(ingestor.has_edge(RelType::Imports, "src/main.rs", "src/controllers/mod.rs"));
    assert!(ingestor.has_edge(
        RelType::Imports,
        "src/controllers/mod.rs",
        "src/storage/mod.rs"
    ));
}

#[test]
fn factory_method_owner_is_the_struct() {
    let (_updater, ingestor) = singleton_fixture().scan();

    assert!(ingestor.has_edge(
        RelType::DefinesMethod,
        "app.src.storage.Storage",
        "app.src.storage.Storage.get_instance"
    ));
}
