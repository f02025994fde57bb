mod symmetry_operations;

pub use symmetry_operations::PySymmetryOperation;
