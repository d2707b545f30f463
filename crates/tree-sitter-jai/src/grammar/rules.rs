//! Rule nodes of a compiled grammar.
//!
//! A compiled grammar stores every rule body as a tree of [`Rule`] nodes. Each
//! node is tagged by a [`RuleType`] and carries only the payload fields its
//! kind uses: literals in `value`, references in `name`, children in `content`
//! or `members`, and precedence levels in `precedence`.

use facet::Facet;

/// A single node of a rule body.
///
/// Atomic nodes (`STRING`, `PATTERN`, `SYMBOL`, `BLANK`) have no children.
/// Unary wrappers (`REPEAT`, `PREC_*`, `FIELD`, `ALIAS`, `TOKEN`, ...) hold one
/// child in `content`, and `SEQ`/`CHOICE` hold their operands in `members`.
#[derive(Debug, Clone, PartialEq, Facet)]
pub struct Rule {
    /// The discriminant identifying what kind of rule this is.
    #[facet(rename = "type")]
    pub rule_type: RuleType,

    /// Literal text of a `STRING`, source of a `PATTERN`, or the alias name
    /// of an `ALIAS`.
    #[facet(default)]
    pub value: Option<String>,

    /// Regex flags attached to a `PATTERN`.
    #[facet(default)]
    pub flags: Option<String>,

    /// Target of a `SYMBOL`, or the field name of a `FIELD`.
    #[facet(default)]
    pub name: Option<String>,

    /// Child of a unary wrapper.
    #[facet(default)]
    pub content: Option<Box<Rule>>,

    /// Operands of a `SEQ` or `CHOICE`.
    #[facet(default)]
    pub members: Vec<Rule>,

    /// Whether an `ALIAS` produces a named node.
    #[facet(default)]
    pub named: Option<bool>,

    /// Level of a `PREC`, `PREC_LEFT`, `PREC_RIGHT` or `PREC_DYNAMIC` wrapper.
    #[facet(default)]
    pub precedence: Option<i32>,

    /// Reserved-word context of a `RESERVED` wrapper.
    #[facet(default)]
    pub context_name: Option<String>,
}

/// The kinds of rule node a compiled grammar may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum RuleType {
    /// An empty production.
    #[facet(rename = "BLANK")]
    Blank,
    /// A literal string token.
    #[facet(rename = "STRING")]
    String,
    /// A regular-expression pattern token.
    #[facet(rename = "PATTERN")]
    Pattern,
    /// A reference to another named rule.
    #[facet(rename = "SYMBOL")]
    Symbol,
    /// One of several alternatives.
    #[facet(rename = "CHOICE")]
    Choice,
    /// Member rules in sequence.
    #[facet(rename = "SEQ")]
    Seq,
    /// Zero or more repetitions.
    #[facet(rename = "REPEAT")]
    Repeat,
    /// One or more repetitions.
    #[facet(rename = "REPEAT1")]
    Repeat1,
    /// A plain precedence wrapper.
    #[facet(rename = "PREC")]
    Prec,
    /// A left-associative precedence wrapper.
    #[facet(rename = "PREC_LEFT")]
    PrecLeft,
    /// A right-associative precedence wrapper.
    #[facet(rename = "PREC_RIGHT")]
    PrecRight,
    /// A precedence wrapper resolved at parse time.
    #[facet(rename = "PREC_DYNAMIC")]
    PrecDynamic,
    /// A named field applied to a subrule.
    #[facet(rename = "FIELD")]
    Field,
    /// An alternate node name for a subrule.
    #[facet(rename = "ALIAS")]
    Alias,
    /// Collapses a subrule into a single token.
    #[facet(rename = "TOKEN")]
    Token,
    /// A token that may not be preceded by extras.
    #[facet(rename = "IMMEDIATE_TOKEN")]
    ImmediateToken,
    /// A reserved-word context wrapper.
    #[facet(rename = "RESERVED")]
    Reserved,
}

impl RuleType {
    /// Returns the canonical artifact spelling of this rule type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RuleType::Blank => "BLANK",
            RuleType::String => "STRING",
            RuleType::Pattern => "PATTERN",
            RuleType::Symbol => "SYMBOL",
            RuleType::Choice => "CHOICE",
            RuleType::Seq => "SEQ",
            RuleType::Repeat => "REPEAT",
            RuleType::Repeat1 => "REPEAT1",
            RuleType::Prec => "PREC",
            RuleType::PrecLeft => "PREC_LEFT",
            RuleType::PrecRight => "PREC_RIGHT",
            RuleType::PrecDynamic => "PREC_DYNAMIC",
            RuleType::Field => "FIELD",
            RuleType::Alias => "ALIAS",
            RuleType::Token => "TOKEN",
            RuleType::ImmediateToken => "IMMEDIATE_TOKEN",
            RuleType::Reserved => "RESERVED",
        }
    }

    /// Returns `true` for the four precedence wrappers.
    #[must_use]
    pub fn is_precedence(self) -> bool {
        matches!(
            self,
            RuleType::Prec | RuleType::PrecLeft | RuleType::PrecRight | RuleType::PrecDynamic
        )
    }

    /// Returns `true` for kinds that wrap exactly one child in `content`.
    #[must_use]
    pub fn is_unary(self) -> bool {
        self.is_precedence()
            || matches!(
                self,
                RuleType::Repeat
                    | RuleType::Repeat1
                    | RuleType::Field
                    | RuleType::Alias
                    | RuleType::Token
                    | RuleType::ImmediateToken
                    | RuleType::Reserved
            )
    }
}

impl Rule {
    /// Returns the canonical string name of this rule type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.rule_type.as_str()
    }

    /// Returns `true` if this rule represents a terminal (lexical) token.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.rule_type, RuleType::String | RuleType::Pattern)
    }

    /// Returns `true` if this rule is a symbol reference.
    #[must_use]
    pub fn is_symbol(&self) -> bool {
        matches!(self.rule_type, RuleType::Symbol)
    }

    /// Returns the referenced symbol name, if applicable.
    #[must_use]
    pub fn symbol_name(&self) -> Option<&str> {
        if self.is_symbol() {
            self.name.as_deref()
        } else {
            None
        }
    }

    /// Returns the precedence level if this rule is a precedence wrapper.
    #[must_use]
    pub fn precedence(&self) -> Option<i32> {
        if self.rule_type.is_precedence() {
            self.precedence
        } else {
            None
        }
    }

    /// Returns the literal string value if this is a `STRING` rule.
    #[must_use]
    pub fn string_value(&self) -> Option<&str> {
        self.value_if(RuleType::String)
    }

    /// Returns the pattern source if this is a `PATTERN` rule.
    #[must_use]
    pub fn pattern_value(&self) -> Option<&str> {
        self.value_if(RuleType::Pattern)
    }

    /// Returns the alias name if this is an `ALIAS` rule.
    #[must_use]
    pub fn alias_value(&self) -> Option<&str> {
        self.value_if(RuleType::Alias)
    }

    /// Iterates over the direct children of this node, `content` first.
    pub fn children(&self) -> impl Iterator<Item = &Rule> {
        self.content.as_deref().into_iter().chain(self.members.iter())
    }

    fn value_if(&self, kind: RuleType) -> Option<&str> {
        if self.rule_type == kind {
            self.value.as_deref()
        } else {
            None
        }
    }
}
