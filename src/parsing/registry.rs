//! Language descriptors: grammar, query bundle, naming conventions, and
//! import semantics per language.

use crate::parsing::Language;
use crate::parsing::cpp::CppSyntax;
use crate::parsing::javascript::JsSyntax;
use crate::parsing::lua::LuaSyntax;
use crate::parsing::python::PythonSyntax;
use crate::parsing::rust::RustSyntax;
use crate::parsing::syntax::Syntax;
use crate::parsing::typescript::TsSyntax;

/// How a language's import constructs are resolved (§import processor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSemantics {
    /// Dotted/`::` paths resolved against project or package roots
    /// (Python, Rust).
    PathQualified,
    /// Relative/absolute file specifiers resolved against the importing
    /// file's directory (JavaScript, TypeScript, C++ includes).
    Specifier,
    /// `require("x")` module strings (Lua, CommonJS).
    Require,
}

/// Static descriptor for one supported language.
#[derive(Debug)]
pub struct LanguageDef {
    pub language: Language,
    pub import_semantics: ImportSemantics,
    /// File name (without extension) that promotes a directory to a
    /// Package node.
    pub package_marker: Option<&'static str>,
    /// File stems dropped during module-path derivation (`__init__`,
    /// `mod`, `index`, `init`).
    pub dropped_stems: &'static [&'static str],
    /// Query program sources, compiled once at startup.
    pub query_sources: QuerySources,
}

/// Raw `.scm` sources for the named queries of one language. Missing
/// queries are permitted and simply yield no captures.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuerySources {
    pub definitions: Option<&'static str>,
    pub calls: Option<&'static str>,
    pub imports: Option<&'static str>,
    pub inheritance: Option<&'static str>,
}

impl LanguageDef {
    /// Descriptor for a language.
    pub fn get(language: Language) -> &'static LanguageDef {
        match language {
            Language::Python => &PYTHON,
            Language::JavaScript => &JAVASCRIPT,
            Language::TypeScript => &TYPESCRIPT,
            Language::Rust => &RUST,
            Language::Cpp => &CPP,
            Language::Lua => &LUA,
        }
    }

    /// Descriptor for the language owning a file extension.
    pub fn by_extension(ext: &str) -> Option<&'static LanguageDef> {
        Language::from_extension(ext).map(Self::get)
    }

    /// The syntax rules for this language.
    pub fn syntax(&self) -> &'static dyn Syntax {
        match self.language {
            Language::Python => &PythonSyntax,
            Language::JavaScript => &JsSyntax,
            Language::TypeScript => &TsSyntax,
            Language::Rust => &RustSyntax,
            Language::Cpp => &CppSyntax,
            Language::Lua => &LuaSyntax,
        }
    }
}

static PYTHON: LanguageDef = LanguageDef {
    language: Language::Python,
    import_semantics: ImportSemantics::PathQualified,
    package_marker: Some("__init__"),
    dropped_stems: &["__init__"],
    query_sources: QuerySources {
        definitions: Some(include_str!("queries/python_definitions.scm")),
        calls: Some(include_str!("queries/python_calls.scm")),
        imports: Some(include_str!("queries/python_imports.scm")),
        inheritance: Some(include_str!("queries/python_inheritance.scm")),
    },
};

static JAVASCRIPT: LanguageDef = LanguageDef {
    language: Language::JavaScript,
    import_semantics: ImportSemantics::Specifier,
    package_marker: None,
    dropped_stems: &["index"],
    query_sources: QuerySources {
        definitions: Some(include_str!("queries/javascript_definitions.scm")),
        calls: Some(include_str!("queries/javascript_calls.scm")),
        imports: Some(include_str!("queries/javascript_imports.scm")),
        inheritance: Some(include_str!("queries/javascript_inheritance.scm")),
    },
};

static TYPESCRIPT: LanguageDef = LanguageDef {
    language: Language::TypeScript,
    import_semantics: ImportSemantics::Specifier,
    package_marker: None,
    dropped_stems: &["index"],
    query_sources: QuerySources {
        definitions: Some(include_str!("queries/typescript_definitions.scm")),
        calls: Some(include_str!("queries/typescript_calls.scm")),
        imports: Some(include_str!("queries/typescript_imports.scm")),
        inheritance: Some(include_str!("queries/typescript_inheritance.scm")),
    },
};

static RUST: LanguageDef = LanguageDef {
    language: Language::Rust,
    import_semantics: ImportSemantics::PathQualified,
    package_marker: Some("mod"),
    dropped_stems: &["mod"],
    query_sources: QuerySources {
        definitions: Some(include_str!("queries/rust_definitions.scm")),
        calls: Some(include_str!("queries/rust_calls.scm")),
        imports: Some(include_str!("queries/rust_imports.scm")),
        inheritance: None,
    },
};

static CPP: LanguageDef = LanguageDef {
    language: Language::Cpp,
    import_semantics: ImportSemantics::Specifier,
    package_marker: None,
    dropped_stems: &[],
    query_sources: QuerySources {
        definitions: Some(include_str!("queries/cpp_definitions.scm")),
        calls: Some(include_str!("queries/cpp_calls.scm")),
        imports: Some(include_str!("queries/cpp_imports.scm")),
        inheritance: Some(include_str!("queries/cpp_inheritance.scm")),
    },
};

static LUA: LanguageDef = LanguageDef {
    language: Language::Lua,
    import_semantics: ImportSemantics::Require,
    package_marker: Some("init"),
    dropped_stems: &["init"],
    query_sources: QuerySources {
        definitions: Some(include_str!("queries/lua_definitions.scm")),
        calls: Some(include_str!("queries/lua_calls.scm")),
        imports: None,
        inheritance: None,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_language_has_a_descriptor() {
        for &lang in Language::all() {
            let def = LanguageDef::get(lang);
            assert_eq!(def.language, lang);
            assert!(def.query_sources.definitions.is_some());
            assert!(def.query_sources.calls.is_some());
        }
    }

    #[test]
    fn package_markers() {
        assert_eq!(
            LanguageDef::get(Language::Python).package_marker,
            Some("__init__")
        );
        assert_eq!(LanguageDef::get(Language::Rust).package_marker, Some("mod"));
        assert_eq!(LanguageDef::get(Language::Cpp).package_marker, None);
    }
}
