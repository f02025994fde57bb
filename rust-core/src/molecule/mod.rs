// Molecule module: Elements (atoms) and the basis functions placed on them
// These are plain data carried across the engine boundary

// ======================== MODULE DECLARATIONS ========================
pub mod basis_function;
pub mod element;
pub mod periodic_table;

// Test modules
mod _tests_molecule;

// ======================== ELEMENTS ========================
pub use element::{
    Element,   // struct - point mass with coordinates, charge and a 3-character name
    ElementId, // struct - opaque engine-assigned identity
};
// Element impl methods:
//   new(name: &str, coordinates: Vector3<f64>) -> Result<Self>          - element with standard atomic weight
//   with_mass(name: &str, mass: f64, coordinates: Vector3<f64>) -> Result<Self> - element with explicit mass
//   with_charge(self, charge: i32) -> Self                              - sets the charge
//   same_type(&self, other: &Element, mass_tolerance: f64) -> bool      - interchangeable under symmetry

// ======================== BASIS FUNCTIONS ========================
pub use basis_function::{
    BasisFunction,         // struct - function on exactly one element
    BasisFunctionId,       // struct - opaque engine-assigned identity
    BasisFunctionKind,     // enum - tagged payload (RealSphericalHarmonic)
    BasisFunctionType,     // enum - type tag seen by the engine
    ElementRef,            // enum - Unbound(element value) or Bound(ElementId)
    RealSphericalHarmonic, // struct - n, l, m quantum numbers
};
pub use periodic_table::standard_atomic_weight;
