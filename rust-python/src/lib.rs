use pyo3::prelude::*;

// Module declarations
mod context;
mod errors;
mod molecule;
mod symmetries;
mod utils;

use context::PyContext;
use molecule::{PyBasisFunction, PyElement};
use symmetries::PySymmetryOperation;
use utils::version;

/// Python module definition
#[pymodule]
fn libmsym(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyElement>()?;
    m.add_class::<PyBasisFunction>()?;
    m.add_class::<PySymmetryOperation>()?;
    m.add_class::<PyContext>()?;

    // Exceptions
    m.add("Error", m.py().get_type_bound::<errors::Error>())?;

    // Utility functions
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(errors::error_string, m)?)?;

    // Module metadata
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
