//! Jai grammar for tree-sitter.
//!
//! The crate embeds the compiled Jai grammar and hands it to the parsing
//! runtime through one accessor:
//!
//! ```
//! let language = tree_sitter_jai::Language::new(tree_sitter_jai::language())
//!     .expect("Error loading Jai grammar");
//! assert_eq!(language.name(), "jai");
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

/// The process-wide grammar handle and its accessor.
///
/// The embedded artifact is decoded and validated once, on first access, and
/// the resulting handle lives for the rest of the process.
mod binding;

/// Decoding of the compiled grammar artifact.
///
/// Mirrors the artifact layout as plain data: rules, extras, conflicts and the
/// rest. Nothing here interprets the grammar.
pub mod grammar;

/// The runtime-facing language object built from a grammar handle.
pub mod language;

/// Structural checks that reject unusable grammars at load time.
pub mod validate;

pub use binding::{language, GrammarHandle, LanguageFn, GRAMMAR_JSON, GRAMMAR_NAME, LANGUAGE};
pub use grammar::{parse_grammar, Grammar, GrammarError, Rule, RuleType};
pub use language::{
    FieldId, Language, LanguageError, Symbol, SymbolType, LANGUAGE_VERSION,
    MIN_COMPATIBLE_LANGUAGE_VERSION,
};
pub use validate::{validate, ValidationError};
