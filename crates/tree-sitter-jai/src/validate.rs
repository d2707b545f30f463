//! Structural validation of compiled grammars.
//!
//! A grammar that decodes can still be unusable: a `SEQ` with no members, a
//! `SYMBOL` pointing at a rule that does not exist, a conflict group naming a
//! typo. Such artifacts are rejected here, at load time, so that no
//! [`GrammarHandle`](crate::GrammarHandle) ever exists for them.
//!
//! Findings that do not make the grammar unusable (unreachable rules, left
//! recursion, mixed precedence levels) are reported as `tracing` events.

use crate::grammar::{Grammar, Rule, RuleType};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// A validation failure encountered when checking a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The grammar defines no rules, so there is no start rule.
    #[error("grammar has no rules")]
    NoRules,

    /// Two rules share a name.
    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),

    /// A reference to a symbol that no rule or external token defines.
    #[error("undefined symbol '{symbol}' referenced in {context}")]
    UndefinedSymbol {
        /// The missing symbol name.
        symbol: String,
        /// Where the reference was found, e.g. `rule 'block'` or `conflicts`.
        context: String,
    },

    /// A rule node lacks the payload its kind requires.
    #[error("malformed {kind} node in {context}: {reason}")]
    Malformed {
        /// The rule type of the offending node.
        kind: &'static str,
        /// Where the node was found.
        context: String,
        /// What is missing.
        reason: &'static str,
    },
}

/// Performs structural validation of a decoded [`Grammar`].
///
/// The passes, in order:
///
/// - the grammar has at least one rule and no duplicate rule names;
/// - every rule node carries the fields its kind needs;
/// - every referenced symbol is defined;
/// - unreachable rules, left recursion and mixed precedence levels are
///   reported but not rejected.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate(grammar: &Grammar) -> Result<(), ValidationError> {
    check_rule_names(grammar)?;
    check_rule_shapes(grammar)?;
    check_undefined_symbols(grammar)?;

    check_unreachable_rules(grammar);
    check_left_recursion(grammar);
    check_precedence(grammar);

    Ok(())
}

fn check_rule_names(grammar: &Grammar) -> Result<(), ValidationError> {
    if grammar.rules.is_empty() {
        return Err(ValidationError::NoRules);
    }

    let mut seen = FxHashSet::default();
    for name in grammar.rule_names() {
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateRule(name.to_string()));
        }
    }
    Ok(())
}

fn check_rule_shapes(grammar: &Grammar) -> Result<(), ValidationError> {
    for definition in &grammar.rules {
        check_rule_shape(&definition.body, &|| format!("rule '{}'", definition.name))?;
    }
    for extra in &grammar.extras {
        check_rule_shape(extra, &|| "extras".to_string())?;
    }
    for external in &grammar.externals {
        check_rule_shape(external, &|| "externals".to_string())?;
    }
    Ok(())
}

fn check_rule_shape(rule: &Rule, context: &dyn Fn() -> String) -> Result<(), ValidationError> {
    let missing = match rule.rule_type {
        RuleType::Blank => None,
        RuleType::String | RuleType::Pattern => rule
            .value
            .as_deref()
            .is_none_or(str::is_empty)
            .then_some("missing literal value"),
        RuleType::Symbol => rule.name.is_none().then_some("missing symbol name"),
        RuleType::Choice | RuleType::Seq => {
            rule.members.is_empty().then_some("has no members")
        }
        RuleType::Field if rule.name.is_none() => Some("missing field name"),
        RuleType::Alias if rule.value.is_none() => Some("missing alias name"),
        RuleType::Reserved if rule.context_name.is_none() => Some("missing context name"),
        kind if kind.is_precedence() && rule.precedence.is_none() => {
            Some("missing precedence level")
        }
        kind if kind.is_unary() => rule.content.is_none().then_some("missing content"),
        _ => None,
    };

    if let Some(reason) = missing {
        return Err(ValidationError::Malformed {
            kind: rule.type_name(),
            context: context(),
            reason,
        });
    }

    for child in rule.children() {
        check_rule_shape(child, context)?;
    }
    Ok(())
}

fn check_undefined_symbols(grammar: &Grammar) -> Result<(), ValidationError> {
    let mut defined: FxHashSet<&str> = grammar.rule_names().collect();
    for external in &grammar.externals {
        if let Some(name) = external.symbol_name() {
            defined.insert(name);
        }
    }

    let undefined = |symbol: &str, context: String| ValidationError::UndefinedSymbol {
        symbol: symbol.to_string(),
        context,
    };

    for definition in &grammar.rules {
        let mut referenced = Vec::new();
        collect_referenced_symbols(&definition.body, &mut referenced);
        if let Some(symbol) = referenced.into_iter().find(|s| !defined.contains(s)) {
            return Err(undefined(symbol, format!("rule '{}'", definition.name)));
        }
    }

    let mut referenced = Vec::new();
    for extra in &grammar.extras {
        collect_referenced_symbols(extra, &mut referenced);
    }
    if let Some(symbol) = referenced.into_iter().find(|s| !defined.contains(s)) {
        return Err(undefined(symbol, "extras".to_string()));
    }

    let named_lists = [
        ("conflicts", grammar.conflicts.iter().flatten().collect::<Vec<_>>()),
        ("inline", grammar.inline.iter().collect()),
        ("supertypes", grammar.supertypes.iter().collect()),
        ("word", grammar.word.iter().collect()),
    ];
    for (context, names) in named_lists {
        if let Some(symbol) = names.into_iter().find(|s| !defined.contains(s.as_str())) {
            return Err(undefined(symbol.as_str(), context.to_string()));
        }
    }

    Ok(())
}

/// Pushes every symbol name referenced anywhere below `rule`.
pub(crate) fn collect_referenced_symbols<'g>(rule: &'g Rule, symbols: &mut Vec<&'g str>) {
    if let Some(name) = rule.symbol_name() {
        symbols.push(name);
    }
    for child in rule.children() {
        collect_referenced_symbols(child, symbols);
    }
}

fn check_unreachable_rules(grammar: &Grammar) {
    let Some(start) = grammar.start_rule() else {
        return;
    };

    // Extras and external tokens can appear anywhere, so they are roots too.
    let mut to_visit = vec![start.name.as_str()];
    for root in grammar.extras.iter().chain(&grammar.externals) {
        collect_referenced_symbols(root, &mut to_visit);
    }

    let mut reachable = FxHashSet::default();
    while let Some(rule_name) = to_visit.pop() {
        if !reachable.insert(rule_name) {
            continue;
        }
        if let Some(rule) = grammar.rule(rule_name) {
            collect_referenced_symbols(rule, &mut to_visit);
        }
    }

    for rule_name in grammar.rule_names() {
        if !reachable.contains(rule_name) && !grammar.inline.iter().any(|n| n == rule_name) {
            tracing::warn!(grammar = %grammar.name, rule = rule_name, "unreachable rule");
        }
    }
}

fn check_left_recursion(grammar: &Grammar) {
    for definition in &grammar.rules {
        if has_immediate_left_recursion(&definition.body, &definition.name) {
            tracing::debug!(
                grammar = %grammar.name,
                rule = %definition.name,
                "rule is left-recursive"
            );
        }
    }
}

fn has_immediate_left_recursion(rule: &Rule, target: &str) -> bool {
    match rule.rule_type {
        RuleType::Symbol => rule.name.as_deref() == Some(target),
        RuleType::Seq => rule
            .members
            .first()
            .is_some_and(|first| has_immediate_left_recursion(first, target)),
        RuleType::Choice => rule
            .members
            .iter()
            .any(|member| has_immediate_left_recursion(member, target)),
        RuleType::Prec
        | RuleType::PrecLeft
        | RuleType::PrecRight
        | RuleType::PrecDynamic
        | RuleType::Field
        | RuleType::Alias => rule
            .content
            .as_deref()
            .is_some_and(|content| has_immediate_left_recursion(content, target)),
        _ => false,
    }
}

fn check_precedence(grammar: &Grammar) {
    let mut prec_levels: FxHashMap<&str, Vec<i32>> = FxHashMap::default();

    for definition in &grammar.rules {
        collect_precedence_levels(&definition.body, &mut prec_levels, &definition.name);
    }

    for (rule, levels) in &prec_levels {
        if levels.len() > 1 {
            tracing::debug!(
                grammar = %grammar.name,
                rule,
                ?levels,
                "rule uses several precedence levels"
            );
        }
    }
}

fn collect_precedence_levels<'g>(
    rule: &Rule,
    levels: &mut FxHashMap<&'g str, Vec<i32>>,
    context: &'g str,
) {
    if let Some(level) = rule.precedence() {
        let seen = levels.entry(context).or_default();
        if !seen.contains(&level) {
            seen.push(level);
        }
    }
    for child in rule.children() {
        collect_precedence_levels(child, levels, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_grammar;

    fn grammar_with_rules(rules: &str) -> Grammar {
        let json = format!(r#"{{"name": "jai", "abi_version": 14, "rules": [{rules}]}}"#);
        parse_grammar(&json).unwrap()
    }

    #[test]
    fn test_valid_grammar_passes() {
        let grammar = grammar_with_rules(
            r#"{"name": "source_file", "body": {"type": "REPEAT", "content": {"type": "SYMBOL", "name": "number"}}},
               {"name": "number", "body": {"type": "PATTERN", "value": "\\d+"}}"#,
        );
        assert_eq!(validate(&grammar), Ok(()));
    }

    #[test]
    fn test_no_rules() {
        let grammar = grammar_with_rules("");
        assert_eq!(validate(&grammar), Err(ValidationError::NoRules));
    }

    #[test]
    fn test_duplicate_rule() {
        let grammar = grammar_with_rules(
            r#"{"name": "source_file", "body": {"type": "STRING", "value": "a"}},
               {"name": "source_file", "body": {"type": "STRING", "value": "b"}}"#,
        );
        assert_eq!(
            validate(&grammar),
            Err(ValidationError::DuplicateRule("source_file".to_string()))
        );
    }

    #[test]
    fn test_undefined_symbol_in_rule() {
        let grammar = grammar_with_rules(
            r##"{"name": "source_file", "body": {"type": "SEQ", "members": [
                {"type": "STRING", "value": "#load"},
                {"type": "FIELD", "name": "path", "content": {"type": "SYMBOL", "name": "string_literal"}}
            ]}}"##,
        );
        let err = validate(&grammar).unwrap_err();
        assert_eq!(
            err.to_string(),
            "undefined symbol 'string_literal' referenced in rule 'source_file'"
        );
    }

    #[test]
    fn test_undefined_symbol_in_conflicts() {
        let json = r#"{
            "name": "jai",
            "abi_version": 14,
            "rules": [{"name": "source_file", "body": {"type": "BLANK"}}],
            "conflicts": [["source_file", "declaration"]]
        }"#;
        let grammar = parse_grammar(json).unwrap();
        assert_eq!(
            validate(&grammar),
            Err(ValidationError::UndefinedSymbol {
                symbol: "declaration".to_string(),
                context: "conflicts".to_string(),
            })
        );
    }

    #[test]
    fn test_external_tokens_count_as_defined() {
        let json = r#"{
            "name": "jai",
            "abi_version": 14,
            "rules": [{"name": "source_file", "body": {"type": "SYMBOL", "name": "heredoc"}}],
            "externals": [{"type": "SYMBOL", "name": "heredoc"}]
        }"#;
        let grammar = parse_grammar(json).unwrap();
        assert_eq!(validate(&grammar), Ok(()));
    }

    #[test]
    fn test_malformed_nodes() {
        let cases = [
            (r#"{"type": "SEQ"}"#, "SEQ", "has no members"),
            (r#"{"type": "SYMBOL"}"#, "SYMBOL", "missing symbol name"),
            (r#"{"type": "STRING", "value": ""}"#, "STRING", "missing literal value"),
            (
                r#"{"type": "PREC_LEFT", "content": {"type": "BLANK"}}"#,
                "PREC_LEFT",
                "missing precedence level",
            ),
            (r#"{"type": "REPEAT"}"#, "REPEAT", "missing content"),
            (
                r#"{"type": "FIELD", "content": {"type": "BLANK"}}"#,
                "FIELD",
                "missing field name",
            ),
        ];

        for (body, kind, reason) in cases {
            let grammar = grammar_with_rules(&format!(r#"{{"name": "source_file", "body": {body}}}"#));
            assert_eq!(
                validate(&grammar),
                Err(ValidationError::Malformed {
                    kind,
                    context: "rule 'source_file'".to_string(),
                    reason,
                }),
                "case {body}"
            );
        }
    }

    #[test]
    fn test_left_recursion_detection() {
        let rule: Rule = facet_json::from_str(
            r#"{"type": "PREC_LEFT", "precedence": 1, "content": {"type": "SEQ", "members": [
                {"type": "FIELD", "name": "left", "content": {"type": "SYMBOL", "name": "expr"}},
                {"type": "STRING", "value": "+"}
            ]}}"#,
        )
        .unwrap();
        assert!(has_immediate_left_recursion(&rule, "expr"));
        assert!(!has_immediate_left_recursion(&rule, "term"));
    }

    #[test]
    fn test_collect_referenced_symbols_walks_all_children() {
        let rule: Rule = facet_json::from_str(
            r#"{"type": "CHOICE", "members": [
                {"type": "SYMBOL", "name": "a"},
                {"type": "REPEAT", "content": {"type": "SEQ", "members": [
                    {"type": "STRING", "value": ","},
                    {"type": "SYMBOL", "name": "b"}
                ]}}
            ]}"#,
        )
        .unwrap();
        let mut symbols = Vec::new();
        collect_referenced_symbols(&rule, &mut symbols);
        assert_eq!(symbols, ["a", "b"]);
    }
}
