use msym::{ErrorKind, MsymError, ReturnCode};
use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

create_exception!(libmsym, Error, PyException, "Failure reported by the symmetry engine.");

/// Attributes attached to a raised `libmsym.Error`.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorFields {
    /// Name of the error kind, e.g. `"PointGroupError"`
    pub kind: String,
    /// Raw engine status code; `None` for binding-only kinds
    pub value: Option<i32>,
    pub description: &'static str,
    pub details: String,
}

impl From<&MsymError> for ErrorFields {
    fn from(error: &MsymError) -> Self {
        Self {
            kind: format!("{:?}", error.kind()),
            value: error.kind().return_code().map(ReturnCode::raw),
            description: error.description(),
            details: error.details().to_owned(),
        }
    }
}

fn engine_error(error: &MsymError) -> PyErr {
    let fields = ErrorFields::from(error);
    let err = Error::new_err(error.to_string());
    Python::with_gil(|py| {
        let value = err.value_bound(py);
        let attached = value
            .setattr("kind", &fields.kind)
            .and_then(|_| value.setattr("value", fields.value))
            .and_then(|_| value.setattr("description", fields.description))
            .and_then(|_| value.setattr("details", &fields.details));
        match attached {
            Ok(()) => err.clone_ref(py),
            Err(e) => e,
        }
    })
}

/// Map a library error onto a Python exception.
///
/// Misuse of a context surfaces as `RuntimeError`, malformed names as
/// `ValueError`, everything the engine reports as `libmsym.Error` carrying
/// `kind`, `value`, `description` and `details` attributes.
pub fn to_py_err(error: MsymError) -> PyErr {
    match error.kind() {
        ErrorKind::Precondition | ErrorKind::Resource => PyRuntimeError::new_err(error.to_string()),
        ErrorKind::InvalidInput => PyValueError::new_err(error.to_string()),
        _ => engine_error(&error),
    }
}

/// General description of a raw engine status code.
#[pyfunction]
pub fn error_string(code: i32) -> PyResult<&'static str> {
    ReturnCode::from_raw(code)
        .map(msym::error_string)
        .ok_or_else(|| PyValueError::new_err(format!("Unknown status code {}", code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_fields_carry_kind_and_code() {
        let error = MsymError::new(ErrorKind::PointGroupError, "D6h does not fit");
        let fields = ErrorFields::from(&error);
        assert_eq!(fields.kind, "PointGroupError");
        assert_eq!(fields.value, Some(ReturnCode::PointGroupError.raw()));
        assert_eq!(fields.description, "Error determining point group");
        assert_eq!(fields.details, "D6h does not fit");

        let misuse = MsymError::new(ErrorKind::Precondition, "released");
        assert_eq!(ErrorFields::from(&misuse).value, None);
    }
}
