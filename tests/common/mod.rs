//! Shared fixtures: build a real repository in a temp directory, run the
//! updater against a recording ingestor, and inspect the trace.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use codegraph::Settings;
use codegraph::indexing::GraphUpdater;
use codegraph::ingest::RecordingIngestor;

pub struct Fixture {
    _temp: TempDir,
    pub root: PathBuf,
}

/// A fixture whose directory name (= project name) is `name`.
pub fn project(name: &str) -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join(name);
    fs::create_dir_all(&root).unwrap();
    Fixture { _temp: temp, root }
}

impl Fixture {
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.root.join(rel)).unwrap();
    }

    pub fn updater(&self) -> GraphUpdater {
        GraphUpdater::new(&self.root, &Settings::default()).unwrap()
    }

    /// Full scan with a fresh updater and recording ingestor.
    pub fn scan(&self) -> (GraphUpdater, RecordingIngestor) {
        let mut updater = self.updater();
        let mut ingestor = RecordingIngestor::new();
        updater.full_scan(&mut ingestor).unwrap();
        (updater, ingestor)
    }
}
