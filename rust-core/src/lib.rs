//! Molecular point group symmetry library
//!
//! Determines the point group of a set of point masses, symmetrizes their
//! coordinates and decomposes atomic basis functions into symmetry-adapted
//! linear combinations (SALCs). The [`AnalysisContext`] sequences these steps
//! over an engine implementing [`NativeContext`].

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod molecule;
pub mod status;
pub mod symmetries;

mod _tests_context;

pub use config::Thresholds;
pub use context::{AnalysisContext, Context, ContextState};
pub use engine::{MsymContext, NativeContext};
pub use error::{ErrorKind, MsymError, Result};
pub use molecule::{
    BasisFunction, BasisFunctionKind, BasisFunctionType, Element, ElementRef, RealSphericalHarmonic,
};
pub use status::{error_string, ReturnCode};
pub use symmetries::{Orientation, SalcSubspace, SymmetryOperation, SymmetryOperationKind};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
