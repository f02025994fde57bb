// Engine module: The call table the analysis context is written against
// Every entry reports a status code; failing entries leave a detail message
// in the process-wide buffer (see status::error_details)

// ======================== MODULE DECLARATIONS ========================
pub mod native;


pub use native::MsymContext; // struct - in-process symmetry engine

use crate::config::Thresholds;
use crate::interfaces::PointGroupName;
use crate::molecule::{BasisFunction, Element};
use crate::status::ReturnCode;
use crate::symmetries::SymmetryOperation;

/// Opaque engine context.
///
/// `create` and `release` bracket the lifetime of a handle. Element and basis
/// function arrays passed in are copied; the engine assigns identities to its
/// copies and basis functions must reference elements by those identities.
pub trait NativeContext: Sized {
    /// New handle, `None` when the engine cannot allocate one.
    fn create() -> Option<Self>;
    fn release(self) -> ReturnCode;

    fn set_thresholds(&mut self, thresholds: &Thresholds) -> ReturnCode;
    fn get_thresholds(&self) -> Result<&Thresholds, ReturnCode>;

    /// Replace the element set. Clears the basis, the point group and any
    /// derived results.
    fn set_elements(&mut self, elements: &[Element]) -> ReturnCode;
    fn get_elements(&self) -> Result<&[Element], ReturnCode>;

    /// Replace the basis. Each function must be bound to an element identity
    /// issued by the last `set_elements`.
    fn set_basis_functions(&mut self, basis_functions: &[BasisFunction]) -> ReturnCode;
    fn get_basis_functions(&self) -> Result<&[BasisFunction], ReturnCode>;

    fn set_point_group_by_name(&mut self, name: &PointGroupName) -> ReturnCode;
    /// Write the NUL-terminated point group name into `buffer`.
    fn get_point_group_name(&self, buffer: &mut [u8]) -> ReturnCode;

    fn find_symmetry(&mut self) -> ReturnCode;
    fn get_symmetry_operations(&self) -> Result<&[SymmetryOperation], ReturnCode>;

    fn symmetrize_elements(&mut self) -> ReturnCode;
    fn generate_salc_subspaces(&mut self) -> ReturnCode;
}
