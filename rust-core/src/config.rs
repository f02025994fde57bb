// Constants

use serde::{Deserialize, Serialize};

// Tolerances
pub const ZERO_TOLERANCE: f64 = 1.0e-3; // Distances below this (relative to structure size) count as zero
pub const GEOMETRY_TOLERANCE: f64 = 1.0e-3; // Collinearity / coplanarity decisions
pub const ANGLE_TOLERANCE: f64 = 1.0e-3; // Merging of candidate axes
pub const EQUIVALENCE_TOLERANCE: f64 = 5.0e-4; // Equal distances from the center
pub const PERMUTATION_TOLERANCE: f64 = 5.0e-3; // Matching atoms under a symmetry operation
pub const EIGFACT_TOLERANCE: f64 = 1.0e-3; // Degenerate eigenvalues (inertia tensor, SALC projector)
pub const ORTHOGONALIZATION_TOLERANCE: f64 = 1.0e-1; // Basis closure under the point group

pub const MATRIX_TOLERANCE: f64 = 1e-8; // Exact comparisons between generated operation matrices
pub const MAX_AXIS_ORDER: u32 = 120; // Largest rotation order considered when reading an operation matrix

/// Numerical thresholds used by the symmetry engine.
///
/// All values are relative to the size of the structure (the largest distance
/// from the center of mass), except `angle` which is an absolute value on the
/// unit sphere. Missing fields fall back to the defaults when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub zero: f64,
    pub geometry: f64,
    pub angle: f64,
    pub equivalence: f64,
    pub permutation: f64,
    pub eigfact: f64,
    pub orthogonalization: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            zero: ZERO_TOLERANCE,
            geometry: GEOMETRY_TOLERANCE,
            angle: ANGLE_TOLERANCE,
            equivalence: EQUIVALENCE_TOLERANCE,
            permutation: PERMUTATION_TOLERANCE,
            eigfact: EIGFACT_TOLERANCE,
            orthogonalization: ORTHOGONALIZATION_TOLERANCE,
        }
    }
}

impl Thresholds {
    /// Name of the first threshold that is not a finite value in (0, 1).
    pub fn first_invalid(&self) -> Option<&'static str> {
        let named = [
            ("zero", self.zero),
            ("geometry", self.geometry),
            ("angle", self.angle),
            ("equivalence", self.equivalence),
            ("permutation", self.permutation),
            ("eigfact", self.eigfact),
            ("orthogonalization", self.orthogonalization),
        ];
        named
            .iter()
            .find(|(_, value)| !(value.is_finite() && *value > 0.0 && *value < 1.0))
            .map(|(name, _)| *name)
    }
}
