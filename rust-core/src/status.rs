//! Engine status codes and the transient error detail buffer.
//!
//! The detail buffer is process-global, exactly like the engine it describes:
//! it is overwritten by the next failing call on any context. Callers capture it
//! right after the failing call while holding [`engine_call_lock`].

use std::fmt;

use parking_lot::{Mutex, MutexGuard};

/// Status returned by every entry of the engine call table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReturnCode {
    Success = 0,
    InvalidInput = -1,
    InvalidContext = -2,
    InvalidThreshold = -3,
    InvalidElements = -4,
    InvalidBasis = -5,
    InvalidPointGroup = -6,
    InvalidEquivalenceSet = -7,
    InvalidPermutation = -8,
    InvalidGeometry = -9,
    InvalidCharacterTable = -10,
    InvalidSubspace = -11,
    InvalidSubgroups = -12,
    InvalidAxes = -13,
    SymmetryError = -14,
    PermutationError = -15,
    PointGroupError = -16,
    SymmetrizationError = -17,
    SubspaceError = -18,
}

impl ReturnCode {
    pub fn from_raw(value: i32) -> Option<Self> {
        let code = match value {
            0 => Self::Success,
            -1 => Self::InvalidInput,
            -2 => Self::InvalidContext,
            -3 => Self::InvalidThreshold,
            -4 => Self::InvalidElements,
            -5 => Self::InvalidBasis,
            -6 => Self::InvalidPointGroup,
            -7 => Self::InvalidEquivalenceSet,
            -8 => Self::InvalidPermutation,
            -9 => Self::InvalidGeometry,
            -10 => Self::InvalidCharacterTable,
            -11 => Self::InvalidSubspace,
            -12 => Self::InvalidSubgroups,
            -13 => Self::InvalidAxes,
            -14 => Self::SymmetryError,
            -15 => Self::PermutationError,
            -16 => Self::PointGroupError,
            -17 => Self::SymmetrizationError,
            -18 => Self::SubspaceError,
            _ => return None,
        };
        Some(code)
    }

    pub fn raw(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(error_string(*self))
    }
}

/// General description of a status code. Always available.
pub fn error_string(code: ReturnCode) -> &'static str {
    match code {
        ReturnCode::Success => "Success",
        ReturnCode::InvalidInput => "Invalid input",
        ReturnCode::InvalidContext => "Invalid context",
        ReturnCode::InvalidThreshold => "Invalid threshold",
        ReturnCode::InvalidElements => "Invalid elements",
        ReturnCode::InvalidBasis => "Invalid basis functions",
        ReturnCode::InvalidPointGroup => "Invalid point group",
        ReturnCode::InvalidEquivalenceSet => "Invalid equivalence set",
        ReturnCode::InvalidPermutation => "Invalid permutation",
        ReturnCode::InvalidGeometry => "Invalid geometry",
        ReturnCode::InvalidCharacterTable => "Invalid character table",
        ReturnCode::InvalidSubspace => "Invalid subspace",
        ReturnCode::InvalidSubgroups => "Invalid subgroups",
        ReturnCode::InvalidAxes => "Invalid axes",
        ReturnCode::SymmetryError => "Error determining symmetry operations",
        ReturnCode::PermutationError => "Error determining permutation",
        ReturnCode::PointGroupError => "Error determining point group",
        ReturnCode::SymmetrizationError => "Error symmetrizing elements",
        ReturnCode::SubspaceError => "Error generating subspaces",
    }
}

static ERROR_DETAILS: Mutex<String> = parking_lot::const_mutex(String::new());
static ENGINE_CALL: Mutex<()> = parking_lot::const_mutex(());

/// Overwrite the transient detail buffer. Called by the engine right before it
/// returns a failing status.
pub fn set_error_details(details: fmt::Arguments<'_>) {
    let mut buffer = ERROR_DETAILS.lock();
    buffer.clear();
    fmt::write(&mut *buffer, details).ok();
}

/// Copy of the detail written by the most recent failing call.
pub fn error_details() -> String {
    ERROR_DETAILS.lock().clone()
}

/// Serializes "engine call, then detail capture" across threads.
pub fn engine_call_lock() -> MutexGuard<'static, ()> {
    ENGINE_CALL.lock()
}

/// Write the detail buffer and evaluate to the given failing code.
#[macro_export]
macro_rules! fail {
    ($code:expr, $($arg:tt)*) => {{
        $crate::status::set_error_details(format_args!($($arg)*));
        $code
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values_round_trip() {
        for value in -18..=0 {
            assert_eq!(ReturnCode::from_raw(value).unwrap().raw(), value);
        }
        assert_eq!(ReturnCode::from_raw(1), None);
        assert_eq!(ReturnCode::from_raw(-19), None);
    }

    #[test]
    fn test_error_details_keep_last_failure() {
        let _guard = engine_call_lock();
        let code = fail!(ReturnCode::InvalidAxes, "axis {} is degenerate", 2);
        assert_eq!(code, ReturnCode::InvalidAxes);
        assert_eq!(error_details(), "axis 2 is degenerate");
        assert_eq!(error_string(code), "Invalid axes");
        assert!(ReturnCode::Success.is_success());
    }
}
