use crate::errors::to_py_err;
use crate::molecule::{PyBasisFunction, PyElement};
use crate::symmetries::PySymmetryOperation;
use msym::{BasisFunction, Context, Thresholds};
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Python wrapper for the analysis context
///
/// `elements`, `basis_functions` and `point_group` are properties; assigning
/// them installs into the engine.
/// Usable as a context manager; leaving the block releases the engine.
#[pyclass(name = "Context")]
pub struct PyContext {
    inner: Context,
}

impl PyContext {
    fn wrap_basis_function(&self, bf: &BasisFunction) -> PyResult<PyBasisFunction> {
        let element = self
            .inner
            .element_of(bf)
            .map_err(to_py_err)?
            .cloned()
            .ok_or_else(|| {
                PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                    "Basis function {} is not bound to an installed element",
                    bf.name()
                ))
            })?;
        Ok(PyBasisFunction {
            inner: bf.clone(),
            element: PyElement { inner: element },
        })
    }
}

#[pymethods]
impl PyContext {
    #[new]
    #[pyo3(signature = (elements=Vec::new(), basis_functions=Vec::new(), point_group=None))]
    fn new(
        elements: Vec<PyElement>,
        basis_functions: Vec<PyBasisFunction>,
        point_group: Option<&str>,
    ) -> PyResult<Self> {
        let mut context = PyContext {
            inner: Context::create().map_err(to_py_err)?,
        };
        if !elements.is_empty() {
            context.set_elements(elements)?;
        }
        if !basis_functions.is_empty() {
            context.set_basis_functions(basis_functions)?;
        }
        if let Some(name) = point_group.filter(|name| !name.is_empty()) {
            context.set_point_group(name)?;
            context.inner.find_symmetry().map_err(to_py_err)?;
        }
        Ok(context)
    }

    fn __enter__(slf: Py<Self>) -> Py<Self> {
        slf
    }

    #[pyo3(signature = (_exc_type=None, _exc_value=None, _traceback=None))]
    fn __exit__(
        &mut self,
        _exc_type: Option<&Bound<'_, PyAny>>,
        _exc_value: Option<&Bound<'_, PyAny>>,
        _traceback: Option<&Bound<'_, PyAny>>,
    ) -> bool {
        self.inner.release();
        false
    }

    #[getter]
    fn elements(&self) -> PyResult<Vec<PyElement>> {
        let elements = self.inner.elements().map_err(to_py_err)?;
        Ok(elements
            .iter()
            .map(|e| PyElement { inner: e.clone() })
            .collect())
    }

    #[setter]
    fn set_elements(&mut self, elements: Vec<PyElement>) -> PyResult<()> {
        let elements: Vec<_> = elements.into_iter().map(|e| e.inner).collect();
        self.inner.install_elements(&elements).map_err(to_py_err)?;
        Ok(())
    }

    #[getter]
    fn basis_functions(&self) -> PyResult<Vec<PyBasisFunction>> {
        let installed = self.inner.basis_functions().map_err(to_py_err)?;
        installed
            .iter()
            .map(|bf| self.wrap_basis_function(bf))
            .collect()
    }

    #[setter]
    fn set_basis_functions(&mut self, basis_functions: Vec<PyBasisFunction>) -> PyResult<()> {
        let basis: Vec<_> = basis_functions.into_iter().map(|bf| bf.inner).collect();
        self.inner.install_basis_functions(&basis).map_err(to_py_err)?;
        Ok(())
    }

    #[getter]
    fn point_group(&self) -> PyResult<Option<String>> {
        Ok(self.inner.point_group().map_err(to_py_err)?.map(str::to_owned))
    }

    #[setter]
    fn set_point_group(&mut self, name: &str) -> PyResult<()> {
        self.inner.set_point_group(name).map_err(to_py_err)
    }

    #[getter]
    fn symmetry_operations(&self) -> PyResult<Vec<PySymmetryOperation>> {
        let operations = self.inner.symmetry_operations().map_err(to_py_err)?;
        Ok(operations.iter().copied().map(PySymmetryOperation::from).collect())
    }

    /// Engine thresholds as a dict
    #[getter]
    fn thresholds<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let t = self.inner.thresholds().map_err(to_py_err)?;
        let dict = PyDict::new_bound(py);
        dict.set_item("zero", t.zero)?;
        dict.set_item("geometry", t.geometry)?;
        dict.set_item("angle", t.angle)?;
        dict.set_item("equivalence", t.equivalence)?;
        dict.set_item("permutation", t.permutation)?;
        dict.set_item("eigfact", t.eigfact)?;
        dict.set_item("orthogonalization", t.orthogonalization)?;
        Ok(dict)
    }

    /// Update thresholds; keys not given keep their current value
    #[pyo3(signature = (**values))]
    fn set_thresholds(&mut self, values: Option<&Bound<'_, PyDict>>) -> PyResult<()> {
        let mut t: Thresholds = self.inner.thresholds().map_err(to_py_err)?;
        if let Some(values) = values {
            for (key, value) in values.iter() {
                let key: String = key.extract()?;
                let value: f64 = value.extract()?;
                let slot = match key.as_str() {
                    "zero" => &mut t.zero,
                    "geometry" => &mut t.geometry,
                    "angle" => &mut t.angle,
                    "equivalence" => &mut t.equivalence,
                    "permutation" => &mut t.permutation,
                    "eigfact" => &mut t.eigfact,
                    "orthogonalization" => &mut t.orthogonalization,
                    _ => {
                        return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
                            "Unknown threshold: {}",
                            key
                        )))
                    }
                };
                *slot = value;
            }
        }
        self.inner.set_thresholds(&t).map_err(to_py_err)
    }

    /// Detect the point group and return its name
    fn find_symmetry(&mut self) -> PyResult<String> {
        self.inner
            .find_symmetry()
            .map(str::to_owned)
            .map_err(to_py_err)
    }

    /// Symmetrize the element coordinates and return the updated elements
    fn symmetrize_elements(&mut self) -> PyResult<Vec<PyElement>> {
        let elements = self.inner.symmetrize_elements().map_err(to_py_err)?;
        Ok(elements
            .iter()
            .map(|e| PyElement { inner: e.clone() })
            .collect())
    }

    fn generate_salc_subspaces(&mut self) -> PyResult<()> {
        self.inner.generate_salc_subspaces().map_err(to_py_err)
    }

    /// Subspaces from the last generation as (characters, coefficient rows)
    #[getter]
    fn salc_subspaces(&self) -> PyResult<Vec<(Vec<f64>, Vec<Vec<f64>>)>> {
        let engine = self.inner.native().map_err(to_py_err)?;
        Ok(engine
            .salc_subspaces()
            .iter()
            .map(|s| {
                let c = s.coefficients();
                let rows = (0..c.nrows())
                    .map(|i| c.row(i).iter().copied().collect())
                    .collect();
                (s.characters().to_vec(), rows)
            })
            .collect())
    }

    fn release(&mut self) {
        self.inner.release();
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.inner)
    }
}
