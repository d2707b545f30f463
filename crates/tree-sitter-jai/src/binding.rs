//! The binding module: the process-wide handle to the compiled Jai grammar.

use crate::grammar::{parse_grammar, Grammar, GrammarError};
use crate::validate::validate;
use std::fmt;
use std::sync::OnceLock;

/// The compiled Jai grammar artifact, embedded at build time.
pub const GRAMMAR_JSON: &str = include_str!("grammar.json");

/// The grammar name every artifact loaded by this binding must carry.
pub const GRAMMAR_NAME: &str = "jai";

/// Opaque handle to a decoded and validated compiled grammar.
///
/// A handle can only be obtained through [`language`] or
/// [`GrammarHandle::load`], so holding one means the artifact behind it
/// decoded and passed validation.
pub struct GrammarHandle {
    grammar: Grammar,
}

impl GrammarHandle {
    /// Decodes, validates and name-checks a compiled grammar artifact.
    ///
    /// This is the recoverable counterpart of [`language`]: it never panics.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] if the artifact is empty, is not a valid
    /// artifact document, fails validation, or names a grammar other than
    /// [`GRAMMAR_NAME`].
    pub fn load(source: &str) -> Result<Self, GrammarError> {
        let grammar = parse_grammar(source)?;
        if grammar.name != GRAMMAR_NAME {
            return Err(GrammarError::NameMismatch {
                expected: GRAMMAR_NAME,
                found: grammar.name,
            });
        }
        validate(&grammar)?;

        tracing::debug!(
            grammar = %grammar.name,
            abi_version = grammar.abi_version,
            rules = grammar.rules.len(),
            "loaded compiled grammar"
        );
        Ok(Self { grammar })
    }

    /// The grammar's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.grammar.name
    }

    /// The runtime ABI version the grammar was compiled for.
    #[must_use]
    pub fn abi_version(&self) -> u32 {
        self.grammar.abi_version
    }

    /// Read-only access to the decoded rule graph.
    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }
}

impl fmt::Debug for GrammarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarHandle")
            .field("name", &self.grammar.name)
            .field("abi_version", &self.grammar.abi_version)
            .finish_non_exhaustive()
    }
}

static JAI: OnceLock<GrammarHandle> = OnceLock::new();

/// Returns the process-wide handle to the compiled Jai grammar.
///
/// The embedded artifact is decoded on first use; every later call, from any
/// thread, returns the same reference.
///
/// # Panics
///
/// Panics on first use if the embedded artifact is missing, corrupt or fails
/// validation. No handle is ever returned for such an artifact.
#[must_use]
pub fn language() -> &'static GrammarHandle {
    JAI.get_or_init(|| {
        GrammarHandle::load(GRAMMAR_JSON)
            .unwrap_or_else(|err| panic!("Error loading Jai grammar: {err}"))
    })
}

/// A plain function pointer producing a grammar handle.
///
/// This is the `const`-friendly shape of the accessor, for callers that want
/// to store "a language" in a constant or a registry without loading it.
#[derive(Clone, Copy)]
pub struct LanguageFn(fn() -> &'static GrammarHandle);

impl LanguageFn {
    /// Wraps an accessor function.
    #[must_use]
    pub const fn from_raw(accessor: fn() -> &'static GrammarHandle) -> Self {
        Self(accessor)
    }

    /// Returns the wrapped accessor function.
    #[must_use]
    pub const fn into_raw(self) -> fn() -> &'static GrammarHandle {
        self.0
    }

    /// Calls the accessor.
    #[must_use]
    pub fn handle(self) -> &'static GrammarHandle {
        (self.0)()
    }
}

impl fmt::Debug for LanguageFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LanguageFn").finish()
    }
}

/// The Jai grammar as a [`LanguageFn`].
pub const LANGUAGE: LanguageFn = LanguageFn::from_raw(language);
