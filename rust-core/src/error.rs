//! Structured errors raised at the engine boundary.
//!
//! Every failing engine status is mapped 1:1 onto an [`ErrorKind`]; the binding
//! layer adds [`ErrorKind::Resource`] (handle allocation) and
//! [`ErrorKind::Precondition`] (an operation issued in the wrong state).

use thiserror::Error;

use crate::status::{self, ReturnCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    InvalidContext,
    InvalidThreshold,
    InvalidElements,
    InvalidBasis,
    InvalidPointGroup,
    InvalidEquivalenceSet,
    InvalidPermutation,
    InvalidGeometry,
    InvalidCharacterTable,
    InvalidSubspace,
    InvalidSubgroups,
    InvalidAxes,
    SymmetryError,
    PermutationError,
    PointGroupError,
    SymmetrizationError,
    SubspaceError,
    /// The engine could not allocate a context.
    Resource,
    /// Misuse of the context: wrong operation order or use after release.
    Precondition,
}

impl ErrorKind {
    /// Kind for a failing engine status, `None` for success.
    pub fn from_return_code(code: ReturnCode) -> Option<Self> {
        let kind = match code {
            ReturnCode::Success => return None,
            ReturnCode::InvalidInput => Self::InvalidInput,
            ReturnCode::InvalidContext => Self::InvalidContext,
            ReturnCode::InvalidThreshold => Self::InvalidThreshold,
            ReturnCode::InvalidElements => Self::InvalidElements,
            ReturnCode::InvalidBasis => Self::InvalidBasis,
            ReturnCode::InvalidPointGroup => Self::InvalidPointGroup,
            ReturnCode::InvalidEquivalenceSet => Self::InvalidEquivalenceSet,
            ReturnCode::InvalidPermutation => Self::InvalidPermutation,
            ReturnCode::InvalidGeometry => Self::InvalidGeometry,
            ReturnCode::InvalidCharacterTable => Self::InvalidCharacterTable,
            ReturnCode::InvalidSubspace => Self::InvalidSubspace,
            ReturnCode::InvalidSubgroups => Self::InvalidSubgroups,
            ReturnCode::InvalidAxes => Self::InvalidAxes,
            ReturnCode::SymmetryError => Self::SymmetryError,
            ReturnCode::PermutationError => Self::PermutationError,
            ReturnCode::PointGroupError => Self::PointGroupError,
            ReturnCode::SymmetrizationError => Self::SymmetrizationError,
            ReturnCode::SubspaceError => Self::SubspaceError,
        };
        Some(kind)
    }

    /// The engine status this kind corresponds to, if any.
    pub fn return_code(&self) -> Option<ReturnCode> {
        let code = match self {
            Self::InvalidInput => ReturnCode::InvalidInput,
            Self::InvalidContext => ReturnCode::InvalidContext,
            Self::InvalidThreshold => ReturnCode::InvalidThreshold,
            Self::InvalidElements => ReturnCode::InvalidElements,
            Self::InvalidBasis => ReturnCode::InvalidBasis,
            Self::InvalidPointGroup => ReturnCode::InvalidPointGroup,
            Self::InvalidEquivalenceSet => ReturnCode::InvalidEquivalenceSet,
            Self::InvalidPermutation => ReturnCode::InvalidPermutation,
            Self::InvalidGeometry => ReturnCode::InvalidGeometry,
            Self::InvalidCharacterTable => ReturnCode::InvalidCharacterTable,
            Self::InvalidSubspace => ReturnCode::InvalidSubspace,
            Self::InvalidSubgroups => ReturnCode::InvalidSubgroups,
            Self::InvalidAxes => ReturnCode::InvalidAxes,
            Self::SymmetryError => ReturnCode::SymmetryError,
            Self::PermutationError => ReturnCode::PermutationError,
            Self::PointGroupError => ReturnCode::PointGroupError,
            Self::SymmetrizationError => ReturnCode::SymmetrizationError,
            Self::SubspaceError => ReturnCode::SubspaceError,
            Self::Resource | Self::Precondition => return None,
        };
        Some(code)
    }

    fn description(&self) -> &'static str {
        match self.return_code() {
            Some(code) => status::error_string(code),
            None => match self {
                Self::Resource => "Could not allocate symmetry context",
                _ => "Operation not valid in the current context state",
            },
        }
    }
}

/// One failing operation: a stable kind, the generic description of that kind,
/// and the transient detail captured at the point of failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{description}: {details}")]
pub struct MsymError {
    kind: ErrorKind,
    description: &'static str,
    details: String,
}

impl MsymError {
    pub fn new(kind: ErrorKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            description: kind.description(),
            details: details.into(),
        }
    }

    /// Build the error for a failing engine status.
    ///
    /// Returns `None` for [`ReturnCode::Success`].
    pub fn from_return_code(code: ReturnCode, details: impl Into<String>) -> Option<Self> {
        ErrorKind::from_return_code(code).map(|kind| Self {
            kind,
            description: status::error_string(code),
            details: details.into(),
        })
    }

    pub(crate) fn precondition(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Precondition, details)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    /// True when the error reports caller misuse rather than bad data.
    /// Such errors are not meant to be handled and retried.
    pub fn is_contract_violation(&self) -> bool {
        self.kind == ErrorKind::Precondition
    }
}

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, MsymError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_codes_map_one_to_one() {
        for value in -18..=-1 {
            let code = ReturnCode::from_raw(value).unwrap();
            let kind = ErrorKind::from_return_code(code).unwrap();
            assert_eq!(kind.return_code(), Some(code));
        }
        assert_eq!(ErrorKind::from_return_code(ReturnCode::Success), None);
        assert_eq!(ErrorKind::Precondition.return_code(), None);
    }

    #[test]
    fn test_error_display_carries_details() {
        let err = MsymError::from_return_code(ReturnCode::InvalidBasis, "no element").unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidBasis);
        assert_eq!(err.details(), "no element");
        assert_eq!(err.to_string(), "Invalid basis functions: no element");
        assert!(!err.is_contract_violation());
        assert!(MsymError::precondition("released").is_contract_violation());
    }
}
