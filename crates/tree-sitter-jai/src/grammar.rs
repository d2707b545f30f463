//! The compiled grammar artifact and its decoder.
//!
//! A compiled grammar arrives as a JSON document produced by the external
//! grammar-compilation step. This module decodes it with [`facet_json`] into a
//! [`Grammar`] and offers read-only accessors over the rule graph. Decoding
//! does not judge whether the grammar makes sense; that is the job of
//! [`validate`](crate::validate).

use crate::validate::ValidationError;
use facet::Facet;
use thiserror::Error;

mod rules;

pub use rules::{Rule, RuleType};

/// A fully compiled grammar, as embedded in the binding.
///
/// Rules keep their declaration order: the first rule is the start rule, and
/// symbol ids are assigned in this order by [`Language`](crate::Language).
#[derive(Debug, Clone, PartialEq, Facet)]
pub struct Grammar {
    /// The short name of the grammar (`"jai"`).
    pub name: String,

    /// The runtime ABI version the artifact was compiled for.
    pub abi_version: u32,

    /// Rule definitions in declaration order.
    pub rules: Vec<RuleDefinition>,

    /// Tokens that may appear between any two other tokens, such as whitespace
    /// and comments.
    #[facet(default)]
    pub extras: Vec<Rule>,

    /// Groups of rules whose LR conflicts the generator was told to expect.
    #[facet(default)]
    pub conflicts: Vec<Vec<String>>,

    /// Tokens produced by an external scanner.
    #[facet(default)]
    pub externals: Vec<Rule>,

    /// Rules inlined into their callers.
    #[facet(default)]
    pub inline: Vec<String>,

    /// Hidden rules exposed as supertypes.
    #[facet(default)]
    pub supertypes: Vec<String>,

    /// The token rule used for keyword extraction.
    #[facet(default)]
    pub word: Option<String>,
}

/// One named rule of a [`Grammar`].
#[derive(Debug, Clone, PartialEq, Facet)]
pub struct RuleDefinition {
    /// The rule's name, as referenced by `SYMBOL` nodes.
    pub name: String,

    /// The rule's body.
    pub body: Rule,
}

/// Errors raised while turning a compiled artifact into a usable grammar.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// The artifact contained no data at all.
    #[error("compiled grammar artifact is empty")]
    Empty,

    /// The artifact was not valid JSON or did not match the artifact layout.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// The artifact decoded, but describes a grammar the runtime cannot use.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The artifact describes a different grammar than the binding exposes.
    #[error("expected grammar '{expected}', found '{found}'")]
    NameMismatch {
        /// The grammar name the binding was built for.
        expected: &'static str,
        /// The grammar name recorded in the artifact.
        found: String,
    },
}

/// Decode a compiled grammar artifact into a strongly typed [`Grammar`].
///
/// # Errors
///
/// Returns [`GrammarError::Empty`] for blank input and
/// [`GrammarError::JsonParse`] if the input is not valid JSON or does not
/// match the artifact layout.
pub fn parse_grammar(json: &str) -> Result<Grammar, GrammarError> {
    if json.trim().is_empty() {
        return Err(GrammarError::Empty);
    }
    facet_json::from_str(json).map_err(|e| GrammarError::JsonParse(e.to_string()))
}

impl Grammar {
    /// Looks up a rule body by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|definition| definition.name == name)
            .map(|definition| &definition.body)
    }

    /// Returns the start rule, which is the first declared rule.
    #[must_use]
    pub fn start_rule(&self) -> Option<&RuleDefinition> {
        self.rules.first()
    }

    /// Iterates over all rule names in declaration order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|definition| definition.name.as_str())
    }

    /// Returns `true` if the named rule is hidden from the syntax tree.
    ///
    /// Hidden rules are spelled with a leading underscore.
    #[must_use]
    pub fn is_hidden(name: &str) -> bool {
        name.starts_with('_')
    }
}
