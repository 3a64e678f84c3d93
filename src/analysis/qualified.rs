//! Qualified-name construction.
//!
//! A qualified name is built deterministically from the project name, the
//! file path relative to the project root, the enclosing scope stack, and
//! the local name. The same rules are replayed to build candidate names
//! during call resolution.

use std::path::Path;

use crate::parsing::registry::LanguageDef;

/// Builds dotted qualified names rooted at the project name.
#[derive(Debug, Clone)]
pub struct QnBuilder {
    project: String,
}

impl QnBuilder {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Module qualified name for a project-relative file path.
    ///
    /// Directory components contribute their literal names; the file stem
    /// is appended unless it is a package-marker stem for the language
    /// (`__init__`, `mod`, `index`, `init`).
    pub fn module_qn(&self, rel_path: &Path, def: &LanguageDef) -> String {
        let mut segments = vec![self.project.clone()];
        if let Some(parent) = rel_path.parent() {
            for comp in parent.components() {
                if let std::path::Component::Normal(name) = comp {
                    segments.push(name.to_string_lossy().into_owned());
                }
            }
        }
        if let Some(stem) = rel_path.file_stem().and_then(|s| s.to_str())
            && !def.dropped_stems.contains(&stem)
        {
            segments.push(stem.to_string());
        }
        segments.join(".")
    }

    /// Qualified name of a directory, for Package nodes.
    pub fn dir_qn(&self, rel_dir: &Path) -> String {
        let mut segments = vec![self.project.clone()];
        for comp in rel_dir.components() {
            if let std::path::Component::Normal(name) = comp {
                segments.push(name.to_string_lossy().into_owned());
            }
        }
        segments.join(".")
    }

    /// Append a local name to an enclosing scope's qualified name.
    pub fn join(scope_qn: &str, name: &str) -> String {
        format!("{scope_qn}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Language;

    fn builder() -> QnBuilder {
        QnBuilder::new("proj")
    }

    #[test]
    fn python_package_marker_is_dropped() {
        let def = LanguageDef::get(Language::Python);
        assert_eq!(
            builder().module_qn(Path::new("pkg/__init__.py"), def),
            "proj.pkg"
        );
        assert_eq!(
            builder().module_qn(Path::new("pkg/user.py"), def),
            "proj.pkg.user"
        );
        assert_eq!(builder().module_qn(Path::new("main.py"), def), "proj.main");
    }

    #[test]
    fn rust_mod_marker_is_dropped() {
        let def = LanguageDef::get(Language::Rust);
        assert_eq!(
            builder().module_qn(Path::new("src/storage/mod.rs"), def),
            "proj.src.storage"
        );
        assert_eq!(
            builder().module_qn(Path::new("src/main.rs"), def),
            "proj.src.main"
        );
    }

    #[test]
    fn js_index_marker_is_dropped() {
        let def = LanguageDef::get(Language::JavaScript);
        assert_eq!(
            builder().module_qn(Path::new("lib/index.js"), def),
            "proj.lib"
        );
        assert_eq!(
            builder().module_qn(Path::new("storage/Storage.js"), def),
            "proj.storage.Storage"
        );
    }

    #[test]
    fn cpp_keeps_every_stem() {
        let def = LanguageDef::get(Language::Cpp);
        assert_eq!(
            builder().module_qn(Path::new("include/base.h"), def),
            "proj.include.base"
        );
    }
}
