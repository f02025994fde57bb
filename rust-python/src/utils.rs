/// Utility functions for the libmsym Python module
use pyo3::prelude::*;

/// Get the version of the msym library
#[pyfunction]
pub fn version() -> &'static str {
    msym::VERSION
}
