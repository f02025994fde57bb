// Symmetries module: Point group detection, symmetrization and symmetry-adapted subspaces
// This module holds the numerical core behind the symmetry engine

// ======================== MODULE DECLARATIONS ========================
pub mod equivalence_sets;
pub mod point_groups;
pub mod salc_subspaces;
pub mod spherical_harmonics;
pub mod structure;
pub mod symmetrization;
pub mod symmetry_detection;
pub mod symmetry_operations;


// ======================== SYMMETRY OPERATIONS ========================
pub use symmetry_operations::{
    SymmetryOperation,              // struct - one operation: kind, order, power, orientation, axis, class
    SymmetryOperationKind,          // enum - Identity, ProperRotation, ImproperRotation, Reflection, Inversion
    Orientation,                    // enum - None, Horizontal, Vertical, Dihedral
    rotation_matrix,                // fn(axis: &Vector3<f64>, angle: f64) -> Matrix3<f64>
    reflection_matrix,              // fn(normal: &Vector3<f64>) -> Matrix3<f64>
    improper_rotation_matrix,       // fn(axis: &Vector3<f64>, angle: f64) -> Matrix3<f64>
};

// SymmetryOperation impl methods:
//   kind(&self) -> SymmetryOperationKind                           - operation type
//   order(&self) -> u32 / power(&self) -> u32                      - n and k of C_n^k / S_n^k
//   orientation(&self) -> Orientation                              - relation to the principal axis
//   vector(&self) -> Vector3<f64>                                  - axis or plane normal
//   conjugacy_class(&self) -> usize                                - class index, contiguous per class
//   matrix(&self) -> Matrix3<f64>                                  - 3x3 orthogonal matrix

// ======================== POINT GROUPS ========================
pub use point_groups::{
    PointGroup,                     // struct - point group placed in the frame of a structure
    PointGroupKind,                 // enum - Schoenflies family (Cn, Cnv, Dnh, Td, Oh, Ih, Kh, ...)
    PointGroupType,                 // struct - family + principal order, parses/prints Schoenflies names
};

// PointGroup impl methods:
//   new(group_type: PointGroupType, frame: Matrix3<f64>) -> Result<Self> - generate operations in frame
//   name(&self) -> String                                          - Schoenflies name
//   operations(&self) -> &[SymmetryOperation]                      - operations, classes contiguous
//   matrices(&self) -> &[Matrix3<f64>]                             - matrices parallel to operations
//   class_sizes(&self) -> Vec<usize>                               - operations per conjugacy class

// ======================== ANALYSIS ========================
pub use structure::Structure;                   // struct - centered positions with element types
pub use equivalence_sets::EquivalenceSets;      // struct - permutations and orbits of the elements
pub use symmetrization::{symmetrize, Symmetrized}; // fn - project coordinates onto the symmetric subspace
pub use salc_subspaces::{
    generate_salc_subspaces,        // fn(group, equivalence, basis, thresholds) -> Result<Vec<SalcSubspace>>
    AtomicOrbital,                  // struct - element index + real spherical harmonic
    SalcSubspace,                   // struct - isotypic component: characters + orthonormal coefficients
};
