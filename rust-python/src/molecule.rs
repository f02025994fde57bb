use crate::errors::to_py_err;
use msym::{BasisFunction, Element};
use nalgebra::Vector3;
use pyo3::prelude::*;

/// Python wrapper for an element (point mass)
#[pyclass(name = "Element")]
#[derive(Clone)]
pub struct PyElement {
    pub(crate) inner: Element,
}

#[pymethods]
impl PyElement {
    #[new]
    #[pyo3(signature = (name, coordinates, mass=None, charge=0))]
    fn new(
        name: &str,
        coordinates: (f64, f64, f64),
        mass: Option<f64>,
        charge: i32,
    ) -> PyResult<Self> {
        let (x, y, z) = coordinates;
        let position = Vector3::new(x, y, z);
        let element = match mass {
            Some(mass) => Element::with_mass(name, mass, position),
            None => Element::new(name, position),
        }
        .map_err(to_py_err)?;
        Ok(PyElement {
            inner: element.with_charge(charge),
        })
    }

    #[getter]
    fn name(&self) -> &str {
        self.inner.name()
    }

    #[getter]
    fn mass(&self) -> f64 {
        self.inner.mass
    }

    #[getter]
    fn charge(&self) -> i32 {
        self.inner.charge
    }

    #[getter]
    fn coordinates(&self) -> (f64, f64, f64) {
        let r = self.inner.coordinates;
        (r.x, r.y, r.z)
    }

    #[setter]
    fn set_coordinates(&mut self, coordinates: (f64, f64, f64)) {
        let (x, y, z) = coordinates;
        self.inner.coordinates = Vector3::new(x, y, z);
    }

    fn __eq__(&self, other: &PyElement) -> bool {
        self.inner == other.inner
    }

    fn __repr__(&self) -> String {
        let r = self.inner.coordinates;
        format!(
            "Element({}, mass={}, charge={}, coordinates=({}, {}, {}))",
            self.inner.name(),
            self.inner.mass,
            self.inner.charge,
            r.x,
            r.y,
            r.z
        )
    }
}

/// Python wrapper for a real spherical harmonic basis function
#[pyclass(name = "RealSphericalHarmonic")]
#[derive(Clone)]
pub struct PyBasisFunction {
    pub(crate) inner: BasisFunction,
    /// The element the function sits on, as last seen by Python.
    pub(crate) element: PyElement,
}

#[pymethods]
impl PyBasisFunction {
    #[new]
    #[pyo3(signature = (element, n, l, m, name=""))]
    fn new(element: PyElement, n: i32, l: i32, m: i32, name: &str) -> PyResult<Self> {
        let inner = BasisFunction::real_spherical_harmonic(&element.inner, n, l, m, name)
            .map_err(to_py_err)?;
        Ok(PyBasisFunction { inner, element })
    }

    #[getter]
    fn element(&self) -> PyElement {
        self.element.clone()
    }

    #[getter]
    fn name(&self) -> &str {
        self.inner.name()
    }

    /// Quantum numbers (n, l, m)
    #[getter]
    fn quantum_numbers(&self) -> Option<(i32, i32, i32)> {
        self.inner
            .real_spherical_harmonic_parameters()
            .map(|sh| (sh.n, sh.l, sh.m))
    }

    fn __repr__(&self) -> String {
        match self.quantum_numbers() {
            Some((n, l, m)) => format!(
                "RealSphericalHarmonic({}, n={}, l={}, m={}, element={})",
                self.inner.name(),
                n,
                l,
                m,
                self.element.inner.name()
            ),
            None => format!("BasisFunction({})", self.inner.name()),
        }
    }
}
