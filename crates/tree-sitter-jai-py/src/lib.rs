//! Python bindings for the Jai grammar.
//!
//! Exposes the grammar handle to Python as `tree_sitter_jai._binding`.

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use tree_sitter_jai::{Language, GRAMMAR_JSON};

/// The Jai language as seen from Python.
#[pyclass(name = "Language", module = "tree_sitter_jai", frozen)]
struct PyLanguage {
    inner: Language,
}

#[pymethods]
impl PyLanguage {
    #[getter]
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[getter]
    fn abi_version(&self) -> u32 {
        self.inner.abi_version()
    }

    #[getter]
    fn node_kind_count(&self) -> usize {
        self.inner.node_kind_count()
    }

    #[getter]
    fn field_count(&self) -> usize {
        self.inner.field_count()
    }

    #[getter]
    fn fingerprint(&self) -> u64 {
        self.inner.fingerprint()
    }

    fn node_kind_for_id(&self, id: u16) -> Option<&'static str> {
        self.inner.node_kind_for_id(id)
    }

    #[pyo3(signature = (kind, named = true))]
    fn id_for_node_kind(&self, kind: &str, named: bool) -> Option<u16> {
        self.inner.id_for_node_kind(kind, named)
    }

    fn node_kind_is_named(&self, id: u16) -> bool {
        self.inner.node_kind_is_named(id)
    }

    fn node_kind_is_visible(&self, id: u16) -> bool {
        self.inner.node_kind_is_visible(id)
    }

    fn field_name_for_id(&self, id: u16) -> Option<&'static str> {
        self.inner.field_name_for_id(id)
    }

    fn field_id_for_name(&self, name: &str) -> Option<u16> {
        self.inner.field_id_for_name(name).map(std::num::NonZeroU16::get)
    }

    fn __eq__(&self, other: &Self) -> bool {
        self.inner == other.inner
    }

    fn __hash__(&self) -> u64 {
        self.inner.fingerprint()
    }

    fn __repr__(&self) -> String {
        format!(
            "<Language name={:?} abi_version={}>",
            self.inner.name(),
            self.inner.abi_version()
        )
    }
}

/// Returns the Jai language.
///
/// Every call wraps the same process-wide grammar handle.
#[pyfunction]
fn language() -> PyResult<PyLanguage> {
    Language::new(tree_sitter_jai::language())
        .map(|inner| PyLanguage { inner })
        .map_err(|err| PyRuntimeError::new_err(format!("Error loading Jai grammar: {err}")))
}

#[pymodule]
fn _binding(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(language, m)?)?;
    m.add_class::<PyLanguage>()?;
    m.add("GRAMMAR_JSON", GRAMMAR_JSON)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
