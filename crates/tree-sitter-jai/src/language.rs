//! The runtime-facing `Language` object.
//!
//! [`Language::new`] is the single conversion call a host runtime performs on a
//! [`GrammarHandle`]: it checks that the handle was compiled for a supported
//! ABI version, then lays out the symbol and field tables the runtime uses to
//! name nodes. It never parses source text.

use crate::binding::{GrammarHandle, LanguageFn};
use crate::grammar::{Grammar, Rule, RuleType};
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::fmt;
use std::hash::Hasher;
use std::num::NonZeroU16;
use thiserror::Error;

/// The newest grammar ABI version this runtime understands.
pub const LANGUAGE_VERSION: u32 = 15;

/// The oldest grammar ABI version this runtime still accepts.
pub const MIN_COMPATIBLE_LANGUAGE_VERSION: u32 = 13;

/// Numeric id of a node kind.
pub type Symbol = u16;

/// Numeric id of a field name. Ids start at 1.
pub type FieldId = NonZeroU16;

/// Name of the built-in symbol that marks the end of input.
const END_SYMBOL: &str = "end";

/// Errors raised when the runtime refuses a grammar handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    /// The handle was compiled for an ABI version outside the supported range.
    #[error(
        "incompatible language version {version} for grammar '{name}': \
         expected {MIN_COMPATIBLE_LANGUAGE_VERSION} through {LANGUAGE_VERSION}"
    )]
    IncompatibleVersion {
        /// The grammar's name.
        name: String,
        /// The ABI version recorded in the grammar.
        version: u32,
    },

    /// The grammar has more node kinds than a [`Symbol`] can number.
    #[error("grammar '{name}' has {count} node kinds, more than a symbol id can hold")]
    TooManySymbols {
        /// The grammar's name.
        name: String,
        /// How many node kinds the grammar would need.
        count: usize,
    },

    /// The grammar has more field names than a [`FieldId`] can number.
    #[error("grammar '{name}' has {count} field names, more than a field id can hold")]
    TooManyFields {
        /// The grammar's name.
        name: String,
        /// How many field names the grammar would need.
        count: usize,
    },
}

/// How a node kind shows up in a syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    /// A named, visible node such as `function_declaration`.
    Regular,
    /// An unnamed token such as `"::"`.
    Anonymous,
    /// A hidden rule listed as a supertype.
    Supertype,
    /// A hidden rule or internal symbol that never appears in a tree.
    Auxiliary,
}

#[derive(Debug, Clone, Copy)]
struct SymbolMetadata {
    name: &'static str,
    named: bool,
    visible: bool,
    supertype: bool,
}

/// A loaded grammar as seen by the parsing runtime.
///
/// Symbol ids are laid out as: `0` for the end-of-input symbol, then every
/// rule in declaration order, then external tokens, then anonymous string
/// tokens in order of first appearance, then alias names not seen before.
pub struct Language {
    handle: &'static GrammarHandle,
    symbols: Vec<SymbolMetadata>,
    named_ids: FxHashMap<&'static str, Symbol>,
    anonymous_ids: FxHashMap<&'static str, Symbol>,
    fields: Vec<&'static str>,
    fingerprint: u64,
}

impl Language {
    /// Wraps a grammar handle into a runtime language object.
    ///
    /// # Errors
    ///
    /// Returns [`LanguageError::IncompatibleVersion`] if the handle's ABI
    /// version is outside [`MIN_COMPATIBLE_LANGUAGE_VERSION`] through
    /// [`LANGUAGE_VERSION`], and [`LanguageError::TooManySymbols`] or
    /// [`LanguageError::TooManyFields`] if its tables do not fit their ids.
    pub fn new(handle: &'static GrammarHandle) -> Result<Self, LanguageError> {
        let version = handle.abi_version();
        if !(MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&version) {
            return Err(LanguageError::IncompatibleVersion {
                name: handle.name().to_string(),
                version,
            });
        }

        let grammar = handle.grammar();
        let symbols = SymbolTableBuilder::new(grammar).build();
        if symbols.len() > usize::from(Symbol::MAX) + 1 {
            return Err(LanguageError::TooManySymbols {
                name: handle.name().to_string(),
                count: symbols.len(),
            });
        }

        let fields = collect_field_names(grammar);
        if fields.len() > usize::from(u16::MAX) {
            return Err(LanguageError::TooManyFields {
                name: handle.name().to_string(),
                count: fields.len(),
            });
        }

        let mut named_ids = FxHashMap::default();
        let mut anonymous_ids = FxHashMap::default();
        for (id, symbol) in (0..=Symbol::MAX).zip(&symbols) {
            if !symbol.visible && !symbol.supertype {
                continue;
            }
            let ids = if symbol.named {
                &mut named_ids
            } else {
                &mut anonymous_ids
            };
            ids.entry(symbol.name).or_insert(id);
        }

        let fingerprint = compute_fingerprint(grammar, &symbols, &fields);

        tracing::debug!(
            grammar = %grammar.name,
            abi_version = version,
            node_kinds = symbols.len(),
            fields = fields.len(),
            fingerprint,
            "constructed language"
        );

        Ok(Self {
            handle,
            symbols,
            named_ids,
            anonymous_ids,
            fields,
            fingerprint,
        })
    }

    /// The grammar's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.handle.name()
    }

    /// The ABI version the grammar was compiled for.
    #[must_use]
    pub fn abi_version(&self) -> u32 {
        self.handle.abi_version()
    }

    /// The handle this language was built from.
    #[must_use]
    pub fn handle(&self) -> &'static GrammarHandle {
        self.handle
    }

    /// Number of distinct node kinds, including the end-of-input symbol.
    #[must_use]
    pub fn node_kind_count(&self) -> usize {
        self.symbols.len()
    }

    /// The node kind name for a symbol id.
    #[must_use]
    pub fn node_kind_for_id(&self, id: Symbol) -> Option<&'static str> {
        self.symbol(id).map(|s| s.name)
    }

    /// The symbol id for a node kind, distinguishing named from anonymous
    /// kinds that share a spelling.
    ///
    /// Only kinds that can appear in a tree (visible kinds and supertypes)
    /// are found.
    #[must_use]
    pub fn id_for_node_kind(&self, kind: &str, named: bool) -> Option<Symbol> {
        let ids = if named {
            &self.named_ids
        } else {
            &self.anonymous_ids
        };
        ids.get(kind).copied()
    }

    /// Whether the node kind is named.
    #[must_use]
    pub fn node_kind_is_named(&self, id: Symbol) -> bool {
        self.symbol(id).is_some_and(|s| s.named)
    }

    /// Whether the node kind appears in syntax trees.
    #[must_use]
    pub fn node_kind_is_visible(&self, id: Symbol) -> bool {
        self.symbol(id).is_some_and(|s| s.visible)
    }

    /// Whether the node kind is a supertype.
    #[must_use]
    pub fn node_kind_is_supertype(&self, id: Symbol) -> bool {
        self.symbol(id).is_some_and(|s| s.supertype)
    }

    /// Classifies a node kind.
    #[must_use]
    pub fn symbol_type(&self, id: Symbol) -> Option<SymbolType> {
        self.symbol(id).map(|s| match (s.supertype, s.visible, s.named) {
            (true, _, _) => SymbolType::Supertype,
            (false, true, true) => SymbolType::Regular,
            (false, true, false) => SymbolType::Anonymous,
            (false, false, _) => SymbolType::Auxiliary,
        })
    }

    /// Number of distinct field names.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// The field name for a field id.
    #[must_use]
    pub fn field_name_for_id(&self, id: u16) -> Option<&'static str> {
        let index = usize::from(id.checked_sub(1)?);
        self.fields.get(index).copied()
    }

    /// The field id for a field name.
    #[must_use]
    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        let index = self
            .fields
            .binary_search_by(|field| (*field).cmp(name))
            .ok()?;
        u16::try_from(index + 1).ok().and_then(NonZeroU16::new)
    }

    /// Iterates over the supertype symbols.
    pub fn supertypes(&self) -> impl Iterator<Item = Symbol> + '_ {
        (0..=Symbol::MAX)
            .zip(&self.symbols)
            .filter(|(_, s)| s.supertype)
            .map(|(id, _)| id)
    }

    /// A stable 64-bit digest of the grammar's identity.
    ///
    /// Covers the name, ABI version, symbol table and field table, so two
    /// languages built from the same artifact agree on it in any process.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    fn symbol(&self, id: Symbol) -> Option<&SymbolMetadata> {
        self.symbols.get(usize::from(id))
    }
}

impl TryFrom<LanguageFn> for Language {
    type Error = LanguageError;

    fn try_from(language: LanguageFn) -> Result<Self, Self::Error> {
        Self::new(language.handle())
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
            && self.abi_version() == other.abi_version()
            && self.fingerprint == other.fingerprint
    }
}

impl Eq for Language {}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name())
            .field("abi_version", &self.abi_version())
            .field("node_kinds", &self.symbols.len())
            .field("fields", &self.fields.len())
            .finish_non_exhaustive()
    }
}

struct SymbolTableBuilder {
    grammar: &'static Grammar,
    symbols: Vec<SymbolMetadata>,
    anonymous: Vec<&'static str>,
    anonymous_seen: FxHashSet<&'static str>,
    aliases: Vec<(&'static str, bool)>,
}

impl SymbolTableBuilder {
    fn new(grammar: &'static Grammar) -> Self {
        Self {
            grammar,
            symbols: Vec::new(),
            anonymous: Vec::new(),
            anonymous_seen: FxHashSet::default(),
            aliases: Vec::new(),
        }
    }

    fn build(mut self) -> Vec<SymbolMetadata> {
        let grammar = self.grammar;

        self.symbols.push(SymbolMetadata {
            name: END_SYMBOL,
            named: false,
            visible: false,
            supertype: false,
        });

        for definition in &grammar.rules {
            // Supertypes are hidden whatever their spelling.
            let supertype = grammar.supertypes.contains(&definition.name);
            self.symbols.push(SymbolMetadata {
                name: &definition.name,
                named: true,
                visible: !supertype && !Grammar::is_hidden(&definition.name),
                supertype,
            });
        }

        for external in &grammar.externals {
            if let Some(name) = external.symbol_name() {
                if grammar.rule(name).is_none() {
                    self.symbols.push(SymbolMetadata {
                        name,
                        named: true,
                        visible: !Grammar::is_hidden(name),
                        supertype: false,
                    });
                }
            } else {
                self.collect_tokens(external);
            }
        }

        for definition in &grammar.rules {
            self.collect_tokens(&definition.body);
        }
        for extra in &grammar.extras {
            self.collect_tokens(extra);
        }

        for &name in &self.anonymous {
            self.symbols.push(SymbolMetadata {
                name,
                named: false,
                visible: true,
                supertype: false,
            });
        }

        for &(name, named) in &self.aliases {
            let known = self
                .symbols
                .iter()
                .any(|s| s.name == name && s.named == named);
            if !known {
                self.symbols.push(SymbolMetadata {
                    name,
                    named,
                    visible: true,
                    supertype: false,
                });
            }
        }

        self.symbols
    }

    /// Records anonymous string tokens and alias names reachable from `rule`.
    ///
    /// Strings inside a `TOKEN` or `IMMEDIATE_TOKEN` are part of a larger
    /// token and do not become node kinds of their own, unless the whole
    /// token is a single string.
    fn collect_tokens(&mut self, rule: &'static Rule) {
        match rule.rule_type {
            RuleType::String => {
                if let Some(value) = rule.string_value() {
                    if self.anonymous_seen.insert(value) {
                        self.anonymous.push(value);
                    }
                }
            }
            RuleType::Token | RuleType::ImmediateToken => {
                if let Some(content) = rule.content.as_deref() {
                    if content.rule_type == RuleType::String {
                        self.collect_tokens(content);
                    }
                }
            }
            RuleType::Alias => {
                if let Some(value) = rule.alias_value() {
                    let entry = (value, rule.named.unwrap_or(false));
                    if !self.aliases.contains(&entry) {
                        self.aliases.push(entry);
                    }
                }
                if let Some(content) = rule.content.as_deref() {
                    self.collect_tokens(content);
                }
            }
            _ => {
                for child in rule.children() {
                    self.collect_tokens(child);
                }
            }
        }
    }
}

fn collect_field_names(grammar: &'static Grammar) -> Vec<&'static str> {
    fn walk(rule: &'static Rule, fields: &mut Vec<&'static str>) {
        if rule.rule_type == RuleType::Field {
            if let Some(name) = rule.name.as_deref() {
                fields.push(name);
            }
        }
        for child in rule.children() {
            walk(child, fields);
        }
    }

    let mut fields = Vec::new();
    for definition in &grammar.rules {
        walk(&definition.body, &mut fields);
    }
    fields.sort_unstable();
    fields.dedup();
    fields
}

fn compute_fingerprint(grammar: &Grammar, symbols: &[SymbolMetadata], fields: &[&str]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(grammar.name.as_bytes());
    hasher.write_u8(0xff);
    hasher.write_u32(grammar.abi_version);
    for symbol in symbols {
        hasher.write(symbol.name.as_bytes());
        hasher.write_u8(0xff);
        hasher.write_u8(
            u8::from(symbol.named)
                | (u8::from(symbol.visible) << 1)
                | (u8::from(symbol.supertype) << 2),
        );
    }
    for field in fields {
        hasher.write(field.as_bytes());
        hasher.write_u8(0xff);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::language;

    fn jai() -> Language {
        Language::new(language()).expect("Error loading Jai grammar")
    }

    fn leak(json: &str) -> &'static GrammarHandle {
        Box::leak(Box::new(GrammarHandle::load(json).unwrap()))
    }

    #[test]
    fn test_symbol_zero_is_end() {
        let language = jai();
        assert_eq!(language.node_kind_for_id(0), Some("end"));
        assert!(!language.node_kind_is_visible(0));
        assert_eq!(language.symbol_type(0), Some(SymbolType::Auxiliary));
    }

    #[test]
    fn test_rules_come_first_in_declaration_order() {
        let language = jai();
        assert_eq!(language.node_kind_for_id(1), Some("source_file"));
        assert_eq!(language.node_kind_for_id(2), Some("_statement"));
        assert_eq!(language.id_for_node_kind("source_file", true), Some(1));
        assert_eq!(language.symbol_type(1), Some(SymbolType::Regular));
        assert_eq!(language.symbol_type(2), Some(SymbolType::Auxiliary));
    }

    #[test]
    fn test_named_and_anonymous_kinds() {
        let language = jai();

        let declaration = language.id_for_node_kind("function_declaration", true).unwrap();
        assert!(language.node_kind_is_named(declaration));
        assert!(language.node_kind_is_visible(declaration));

        let colons = language.id_for_node_kind("::", false).unwrap();
        assert!(!language.node_kind_is_named(colons));
        assert_eq!(language.symbol_type(colons), Some(SymbolType::Anonymous));

        assert_eq!(language.id_for_node_kind("::", true), None);
        assert_eq!(language.id_for_node_kind("no_such_kind", true), None);
        let past_end = u16::try_from(language.node_kind_count()).unwrap();
        assert_eq!(language.node_kind_for_id(past_end), None);
    }

    #[test]
    fn test_strings_inside_tokens_are_not_kinds() {
        let language = jai();
        // `comment_line` is token(seq('//', /.*/)), so `//` is never a node.
        assert_eq!(language.id_for_node_kind("//", false), None);
        assert!(language.id_for_node_kind("comment_line", true).is_some());
    }

    #[test]
    fn test_field_table_is_sorted_and_one_based() {
        let language = jai();
        assert!(language.field_count() > 0);
        assert_eq!(language.field_name_for_id(0), None);

        let names: Vec<_> = (1..=u16::try_from(language.field_count()).unwrap())
            .filter_map(|id| language.field_name_for_id(id))
            .collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);

        let path = language.field_id_for_name("path").unwrap();
        assert_eq!(language.field_name_for_id(path.get()), Some("path"));
        assert_eq!(language.field_id_for_name("no_such_field"), None);
    }

    #[test]
    fn test_incompatible_version_is_rejected() {
        for version in [12, 16] {
            let handle = leak(&format!(
                r#"{{"name": "jai", "abi_version": {version}, "rules": [{{"name": "source_file", "body": {{"type": "BLANK"}}}}]}}"#
            ));
            let err = Language::new(handle).unwrap_err();
            assert_eq!(
                err,
                LanguageError::IncompatibleVersion {
                    name: "jai".to_string(),
                    version,
                }
            );
            assert!(err.to_string().contains("grammar 'jai'"));
        }
    }

    #[test]
    fn test_aliases_supertypes_and_externals() {
        let handle = leak(
            r#"{
                "name": "jai",
                "abi_version": 14,
                "rules": [
                    {"name": "source_file", "body": {"type": "REPEAT", "content": {"type": "SYMBOL", "name": "_expression"}}},
                    {"name": "_expression", "body": {"type": "CHOICE", "members": [
                        {"type": "ALIAS", "value": "name", "named": true, "content": {"type": "SYMBOL", "name": "identifier"}},
                        {"type": "SYMBOL", "name": "heredoc"}
                    ]}},
                    {"name": "identifier", "body": {"type": "PATTERN", "value": "[a-z]+"}}
                ],
                "externals": [{"type": "SYMBOL", "name": "heredoc"}],
                "supertypes": ["_expression"]
            }"#,
        );
        let language = Language::new(handle).unwrap();

        let names: Vec<_> = (0..u16::try_from(language.node_kind_count()).unwrap())
            .filter_map(|id| language.node_kind_for_id(id))
            .collect();
        assert_eq!(
            names,
            ["end", "source_file", "_expression", "identifier", "heredoc", "name"]
        );

        let expression = language.id_for_node_kind("_expression", true).unwrap();
        assert_eq!(language.symbol_type(expression), Some(SymbolType::Supertype));
        assert_eq!(language.supertypes().collect::<Vec<_>>(), [expression]);
        assert_eq!(language.field_count(), 0);
    }

    #[test]
    fn test_equal_languages_share_fingerprint() {
        let a = jai();
        let b = Language::try_from(crate::LANGUAGE).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let other = Language::new(leak(
            r#"{"name": "jai", "abi_version": 14, "rules": [{"name": "source_file", "body": {"type": "BLANK"}}]}"#,
        ))
        .unwrap();
        assert_ne!(a, other);
        assert_ne!(a.fingerprint(), other.fingerprint());
    }

    const EXPRESSION_RULES: &str = r#"[
        {"name": "source_file", "body": {"type": "REPEAT", "content": {"type": "SYMBOL", "name": "_expression"}}},
        {"name": "_expression", "body": {"type": "CHOICE", "members": [
            {"type": "SYMBOL", "name": "identifier"},
            {"type": "STRING", "value": "null"}
        ]}},
        {"name": "identifier", "body": {"type": "PATTERN", "value": "[a-z]+"}}
    ]"#;

    fn expression_grammar(supertypes: &str) -> Language {
        Language::new(leak(&format!(
            r#"{{"name": "jai", "abi_version": 14, "rules": {EXPRESSION_RULES}, "supertypes": {supertypes}}}"#
        )))
        .unwrap()
    }

    #[test]
    fn test_supertypes_change_identity() {
        let plain = expression_grammar("[]");
        let with_supertype = expression_grammar(r#"["_expression"]"#);

        assert_eq!(plain.supertypes().count(), 0);
        assert_eq!(with_supertype.supertypes().collect::<Vec<_>>(), [2]);
        assert_ne!(plain.fingerprint(), with_supertype.fingerprint());
        assert_ne!(plain, with_supertype);
    }

    #[test]
    fn test_hidden_kinds_are_not_looked_up() {
        let language = jai();
        assert_eq!(language.node_kind_for_id(2), Some("_statement"));
        assert_eq!(language.id_for_node_kind("_statement", true), None);
        assert_eq!(language.id_for_node_kind("end", false), None);
    }

    #[test]
    fn test_supertype_without_underscore_is_hidden() {
        let language = expression_grammar(r#"["identifier"]"#);
        let identifier = language.id_for_node_kind("identifier", true).unwrap();
        assert_eq!(identifier, 3);
        assert!(!language.node_kind_is_visible(identifier));
        assert_eq!(language.symbol_type(identifier), Some(SymbolType::Supertype));
    }

    fn choice_grammar(members: impl Iterator<Item = String>) -> &'static GrammarHandle {
        let members: Vec<_> = members.collect();
        leak(&format!(
            r#"{{"name": "jai", "abi_version": 14, "rules": [
                {{"name": "source_file", "body": {{"type": "CHOICE", "members": [{}]}}}}
            ]}}"#,
            members.join(",")
        ))
    }

    #[test]
    fn test_too_many_symbols_is_rejected() {
        // end + source_file + 65536 strings
        let handle = choice_grammar(
            (0..=u32::from(u16::MAX)).map(|i| format!(r#"{{"type": "STRING", "value": "t{i}"}}"#)),
        );
        assert_eq!(
            Language::new(handle).unwrap_err(),
            LanguageError::TooManySymbols {
                name: "jai".to_string(),
                count: usize::from(u16::MAX) + 3,
            }
        );
    }

    #[test]
    fn test_too_many_fields_is_rejected() {
        let handle = choice_grammar((0..=u32::from(u16::MAX)).map(|i| {
            format!(r#"{{"type": "FIELD", "name": "f{i}", "content": {{"type": "BLANK"}}}}"#)
        }));
        assert_eq!(
            Language::new(handle).unwrap_err(),
            LanguageError::TooManyFields {
                name: "jai".to_string(),
                count: usize::from(u16::MAX) + 1,
            }
        );
    }
}
