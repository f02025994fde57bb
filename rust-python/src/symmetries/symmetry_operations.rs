use msym::{Orientation, SymmetryOperation, SymmetryOperationKind};
use pyo3::prelude::*;

/// Python wrapper for one symmetry operation of a point group
#[pyclass(name = "SymmetryOperation")]
#[derive(Clone)]
pub struct PySymmetryOperation {
    pub(crate) inner: SymmetryOperation,
}

impl From<SymmetryOperation> for PySymmetryOperation {
    fn from(inner: SymmetryOperation) -> Self {
        PySymmetryOperation { inner }
    }
}

#[pymethods]
impl PySymmetryOperation {
    /// One of "E", "C", "S", "σ", "i"
    #[getter]
    fn kind(&self) -> &'static str {
        match self.inner.kind() {
            SymmetryOperationKind::Identity => "E",
            SymmetryOperationKind::ProperRotation => "C",
            SymmetryOperationKind::ImproperRotation => "S",
            SymmetryOperationKind::Reflection => "σ",
            SymmetryOperationKind::Inversion => "i",
        }
    }

    #[getter]
    fn order(&self) -> u32 {
        self.inner.order()
    }

    #[getter]
    fn power(&self) -> u32 {
        self.inner.power()
    }

    /// "", "h", "v" or "d"
    #[getter]
    fn orientation(&self) -> &'static str {
        match self.inner.orientation() {
            Orientation::None => "",
            Orientation::Horizontal => "h",
            Orientation::Vertical => "v",
            Orientation::Dihedral => "d",
        }
    }

    #[getter]
    fn vector(&self) -> (f64, f64, f64) {
        let v = self.inner.vector();
        (v.x, v.y, v.z)
    }

    #[getter]
    fn conjugacy_class(&self) -> usize {
        self.inner.conjugacy_class()
    }

    /// The 3x3 matrix as nested rows
    fn matrix(&self) -> Vec<Vec<f64>> {
        let m = self.inner.matrix();
        (0..3).map(|i| (0..3).map(|j| m[(i, j)]).collect()).collect()
    }

    fn __repr__(&self) -> String {
        let label = match self.inner.kind() {
            SymmetryOperationKind::Identity | SymmetryOperationKind::Inversion => {
                self.kind().to_string()
            }
            SymmetryOperationKind::Reflection => format!("{}{}", self.kind(), self.orientation()),
            _ => format!(
                "{}{}^{}{}",
                self.kind(),
                self.inner.order(),
                self.inner.power(),
                self.orientation()
            ),
        };
        let (x, y, z) = self.vector();
        format!(
            "SymmetryOperation({}, class={}, vector=({:.6}, {:.6}, {:.6}))",
            label,
            self.inner.conjugacy_class(),
            x,
            y,
            z
        )
    }
}
