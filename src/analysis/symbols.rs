//! The per-process symbol table.
//!
//! Maps qualified names to definition metadata and per-module local names
//! to resolution targets. Rebuilt from scratch at the start of a full
//! scan; during incremental updates, entries whose defining module equals
//! the changed path are purged and re-populated before the call pass runs.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use crate::graph::NodeLabel;
use crate::parsing::Language;

/// Where a locally-visible name points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A definition or module inside this project, by qualified name.
    InProject(String),
    /// Outside the repo, keyed by the full specifier string.
    External(String),
    /// A deferred wildcard source; bare names are tried against it lazily
    /// by the final rungs of the call ladder.
    WildcardFrom(String),
}

/// Graph-level kind of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Module,
    Class,
    Struct,
    Function,
    Method,
}

impl SymbolKind {
    pub fn label(&self) -> NodeLabel {
        match self {
            SymbolKind::Module => NodeLabel::Module,
            SymbolKind::Class => NodeLabel::Class,
            SymbolKind::Struct => NodeLabel::Struct,
            SymbolKind::Function => NodeLabel::Function,
            SymbolKind::Method => NodeLabel::Method,
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, SymbolKind::Class | SymbolKind::Struct)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }
}

/// Metadata recorded for every definition during pass 1.
#[derive(Debug, Clone)]
pub struct DefinitionInfo {
    pub qn: String,
    pub name: String,
    pub kind: SymbolKind,
    /// Project-relative path of the defining module.
    pub module_path: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Identifiers in the return-type annotation, for factory inference.
    pub ret_names: Vec<String>,
    /// Type names explicitly constructed in the body.
    pub constructs: Vec<String>,
}

/// An unresolved base-class reference, resolved lazily during member
/// lookup when the whole table is complete.
#[derive(Debug, Clone)]
pub struct BaseRef {
    pub raw: String,
    pub module_path: String,
}

/// Per-module symbol table: local name bindings plus wildcard and include
/// visibility.
#[derive(Debug)]
pub struct ModuleTable {
    pub qn: String,
    pub language: Language,
    /// Import order is preserved for resolution tie-breaks.
    pub names: IndexMap<String, Target>,
    pub wildcards: Vec<Target>,
    /// Module QNs visible through resolved `#include` directives.
    pub includes: Vec<String>,
    /// `module.exports = X` / `export default X`.
    pub default_export: Option<String>,
    /// IMPORTS edge targets already emitted for this module.
    pub import_edges: HashSet<String>,
}

impl ModuleTable {
    fn new(qn: String, language: Language) -> Self {
        Self {
            qn,
            language,
            names: IndexMap::new(),
            wildcards: Vec::new(),
            includes: Vec::new(),
            default_export: None,
            import_edges: HashSet::new(),
        }
    }
}

/// The global symbol table for one repository scan.
#[derive(Debug)]
pub struct SymbolTable {
    project: String,
    definitions: HashMap<String, DefinitionInfo>,
    /// Simple name -> QNs, for the ladder's project-global last resort.
    name_index: HashMap<String, Vec<String>>,
    modules: HashMap<String, ModuleTable>,
    module_qns: HashMap<String, String>,
    bases: HashMap<String, Vec<BaseRef>>,
}

impl SymbolTable {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            definitions: HashMap::new(),
            name_index: HashMap::new(),
            modules: HashMap::new(),
            module_qns: HashMap::new(),
            bases: HashMap::new(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Register a module before any file is processed, so import
    /// resolution is independent of processing order.
    pub fn register_module(&mut self, path: &str, qn: &str, language: Language) {
        self.modules
            .insert(path.to_string(), ModuleTable::new(qn.to_string(), language));
        self.module_qns.insert(qn.to_string(), path.to_string());
    }

    pub fn module(&self, path: &str) -> Option<&ModuleTable> {
        self.modules.get(path)
    }

    pub fn module_mut(&mut self, path: &str) -> Option<&mut ModuleTable> {
        self.modules.get_mut(path)
    }

    /// The path of a module with the given qualified name.
    pub fn module_path_of(&self, qn: &str) -> Option<&str> {
        self.module_qns.get(qn).map(String::as_str)
    }

    pub fn is_module_qn(&self, qn: &str) -> bool {
        self.module_qns.contains_key(qn)
    }

    pub fn insert_definition(&mut self, info: DefinitionInfo) {
        self.name_index
            .entry(info.name.clone())
            .or_default()
            .push(info.qn.clone());
        self.definitions.insert(info.qn.clone(), info);
    }

    pub fn definition(&self, qn: &str) -> Option<&DefinitionInfo> {
        self.definitions.get(qn)
    }

    pub fn add_base(&mut self, class_qn: &str, raw: &str, module_path: &str) {
        self.bases.entry(class_qn.to_string()).or_default().push(BaseRef {
            raw: raw.to_string(),
            module_path: module_path.to_string(),
        });
    }

    /// Purge every entry whose defining module is `path`, ahead of an
    /// incremental re-ingest of that file.
    pub fn purge_path(&mut self, path: &str) {
        let removed: Vec<String> = self
            .definitions
            .values()
            .filter(|d| d.module_path == path)
            .map(|d| d.qn.clone())
            .collect();
        for qn in &removed {
            if let Some(info) = self.definitions.remove(qn)
                && let Some(entries) = self.name_index.get_mut(&info.name)
            {
                entries.retain(|e| e != qn);
                if entries.is_empty() {
                    self.name_index.remove(&info.name);
                }
            }
            self.bases.remove(qn);
        }
        if let Some(table) = self.modules.remove(path) {
            self.module_qns.remove(&table.qn);
        }
    }

    /// Resolve a bare name in a module's context: local bindings and
    /// imports first, then wildcard sources, then included modules, then
    /// the project-global table as a last resort.
    pub fn resolve_name_in(&self, module_path: &str, name: &str) -> Option<Target> {
        let table = self.modules.get(module_path)?;

        if let Some(target) = table.names.get(name) {
            return Some(target.clone());
        }

        for wildcard in &table.wildcards {
            if let Target::WildcardFrom(source_qn) = wildcard {
                let candidate = format!("{source_qn}.{name}");
                if self.definitions.contains_key(&candidate) || self.is_module_qn(&candidate) {
                    return Some(Target::InProject(candidate));
                }
            }
        }

        for include_qn in &table.includes {
            let candidate = format!("{include_qn}.{name}");
            if self.definitions.contains_key(&candidate) {
                return Some(Target::InProject(candidate));
            }
        }

        // Project-global last resort: unambiguous matches only, with a
        // same-module preference.
        if let Some(candidates) = self.name_index.get(name) {
            if candidates.len() == 1 {
                return Some(Target::InProject(candidates[0].clone()));
            }
            let own: Vec<&String> = candidates
                .iter()
                .filter(|qn| {
                    self.definitions
                        .get(*qn)
                        .is_some_and(|d| d.module_path == module_path)
                })
                .collect();
            if own.len() == 1 {
                return Some(Target::InProject(own[0].clone()));
            }
        }
        None
    }

    /// Resolve a dotted path in a module's context. The head segment goes
    /// through [`Self::resolve_name_in`]; remaining segments are appended
    /// and verified against known definitions and modules. Falls back to
    /// a project-absolute interpretation of the whole path.
    pub fn resolve_path_in(&self, module_path: &str, segments: &[String]) -> Option<Target> {
        if segments.is_empty() {
            return None;
        }
        if segments.len() == 1 {
            return self.resolve_name_in(module_path, &segments[0]);
        }

        if let Some(head) = self
            .resolve_name_in(module_path, &segments[0])
            .or_else(|| {
                // An unimported head may still be a top-level module.
                let candidate = format!("{}.{}", self.project, segments[0]);
                self.is_module_qn(&candidate)
                    .then(|| Target::InProject(candidate))
            })
        {
            match head {
                Target::InProject(base) => {
                    let qn = std::iter::once(base.as_str())
                        .chain(segments[1..].iter().map(String::as_str))
                        .collect::<Vec<_>>()
                        .join(".");
                    if self.definitions.contains_key(&qn) || self.is_module_qn(&qn) {
                        return Some(Target::InProject(qn));
                    }
                }
                Target::External(spec) => return Some(Target::External(spec)),
                Target::WildcardFrom(_) => {}
            }
        }

        // Absolute: `pkg.user.User` referenced without an import.
        let absolute = format!("{}.{}", self.project, segments.join("."));
        if self.definitions.contains_key(&absolute) || self.is_module_qn(&absolute) {
            return Some(Target::InProject(absolute));
        }
        None
    }

    /// Look up a member on a type, following INHERITS bases transitively.
    pub fn lookup_member(&self, type_qn: &str, name: &str) -> Option<String> {
        let mut visited = HashSet::new();
        self.lookup_member_inner(type_qn, name, &mut visited)
    }

    fn lookup_member_inner(
        &self,
        type_qn: &str,
        name: &str,
        visited: &mut HashSet<String>,
    ) -> Option<String> {
        if !visited.insert(type_qn.to_string()) {
            return None;
        }
        let candidate = format!("{type_qn}.{name}");
        if self
            .definitions
            .get(&candidate)
            .is_some_and(|d| d.kind.is_callable())
        {
            return Some(candidate);
        }
        let bases = self.bases.get(type_qn)?.clone();
        for base in bases {
            let Some(Target::InProject(base_qn)) = self
                .resolve_path_in(
                    &base.module_path,
                    &base
                        .raw
                        .split('.')
                        .map(str::to_string)
                        .collect::<Vec<_>>(),
                )
            else {
                continue;
            };
            if let Some(found) = self.lookup_member_inner(&base_qn, name, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Coerce a resolution target to a type QN: either the target is a
    /// Class/Struct definition, or it is a module whose default export is
    /// one.
    pub fn type_qn_of(&self, target: &Target) -> Option<String> {
        let Target::InProject(qn) = target else {
            return None;
        };
        if self.definitions.get(qn).is_some_and(|d| d.kind.is_type()) {
            return Some(qn.clone());
        }
        if let Some(path) = self.module_qns.get(qn)
            && let Some(table) = self.modules.get(path)
            && let Some(export) = &table.default_export
        {
            let candidate = format!("{qn}.{export}");
            if self
                .definitions
                .get(&candidate)
                .is_some_and(|d| d.kind.is_type())
            {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_class() -> SymbolTable {
        let mut table = SymbolTable::new("proj");
        table.register_module("pkg/user.py", "proj.pkg.user", Language::Python);
        table.register_module("main.py", "proj.main", Language::Python);
        table.insert_definition(DefinitionInfo {
            qn: "proj.pkg.user.User".to_string(),
            name: "User".to_string(),
            kind: SymbolKind::Class,
            module_path: "pkg/user.py".to_string(),
            start_line: 1,
            end_line: 10,
            ret_names: Vec::new(),
            constructs: Vec::new(),
        });
        table.insert_definition(DefinitionInfo {
            qn: "proj.pkg.user.User.validate".to_string(),
            name: "validate".to_string(),
            kind: SymbolKind::Method,
            module_path: "pkg/user.py".to_string(),
            start_line: 5,
            end_line: 7,
            ret_names: Vec::new(),
            constructs: Vec::new(),
        });
        table
    }

    #[test]
    fn import_binding_resolves() {
        let mut table = table_with_class();
        table
            .module_mut("main.py")
            .unwrap()
            .names
            .insert(
                "User".to_string(),
                Target::InProject("proj.pkg.user.User".to_string()),
            );
        assert_eq!(
            table.resolve_name_in("main.py", "User"),
            Some(Target::InProject("proj.pkg.user.User".to_string()))
        );
    }

    #[test]
    fn wildcard_sources_resolve_lazily() {
        let mut table = table_with_class();
        table
            .module_mut("main.py")
            .unwrap()
            .wildcards
            .push(Target::WildcardFrom("proj.pkg.user".to_string()));
        assert_eq!(
            table.resolve_name_in("main.py", "User"),
            Some(Target::InProject("proj.pkg.user.User".to_string()))
        );
    }

    #[test]
    fn member_lookup_follows_bases() {
        let mut table = table_with_class();
        table.insert_definition(DefinitionInfo {
            qn: "proj.main.Admin".to_string(),
            name: "Admin".to_string(),
            kind: SymbolKind::Class,
            module_path: "main.py".to_string(),
            start_line: 1,
            end_line: 4,
            ret_names: Vec::new(),
            constructs: Vec::new(),
        });
        table
            .module_mut("main.py")
            .unwrap()
            .names
            .insert(
                "User".to_string(),
                Target::InProject("proj.pkg.user.User".to_string()),
            );
        table.add_base("proj.main.Admin", "User", "main.py");

        assert_eq!(
            table.lookup_member("proj.main.Admin", "validate"),
            Some("proj.pkg.user.User.validate".to_string())
        );
    }

    #[test]
    fn purge_removes_only_that_module() {
        let mut table = table_with_class();
        table.purge_path("pkg/user.py");
        assert!(table.definition("proj.pkg.user.User").is_none());
        assert!(table.module("pkg/user.py").is_none());
        assert!(table.module("main.py").is_some());
        assert!(!table.is_module_qn("proj.pkg.user"));
    }

    #[test]
    fn path_resolution_tries_project_absolute() {
        let table = table_with_class();
        let segments: Vec<String> = ["pkg", "user", "User"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            table.resolve_path_in("main.py", &segments),
            Some(Target::InProject("proj.pkg.user.User".to_string()))
        );
    }
}
