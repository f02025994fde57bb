use std::collections::HashSet;

use log::debug;

use crate::config::Thresholds;
use crate::engine::NativeContext;
use crate::error::{ErrorKind, MsymError, Result};
use crate::interfaces::PointGroupName;
use crate::molecule::{BasisFunction, BasisFunctionId, Element, ElementId};
use crate::status::ReturnCode;
use crate::symmetries::symmetry_detection::{find_point_group, point_group_for_structure};
use crate::symmetries::{
    generate_salc_subspaces, symmetrize, AtomicOrbital, EquivalenceSets, PointGroup,
    PointGroupType, SalcSubspace, Structure, SymmetryOperation,
};

/// Translate an internal result into a status code, leaving the detail in the
/// shared buffer on failure.
fn report(result: Result<()>) -> ReturnCode {
    match result {
        Ok(()) => ReturnCode::Success,
        Err(e) => {
            let code = e.kind().return_code().unwrap_or(ReturnCode::InvalidContext);
            crate::fail!(code, "{}", e.details())
        }
    }
}

fn no_point_group() -> MsymError {
    MsymError::new(ErrorKind::PointGroupError, "Point group has not been determined")
}

/// In-process symmetry engine.
///
/// Holds copies of the installed elements and basis functions, the current
/// point group placed in the frame of the elements, and the results derived
/// from it.
#[derive(Debug, Default)]
pub struct MsymContext {
    thresholds: Thresholds,
    elements: Vec<Element>,
    basis_functions: Vec<BasisFunction>,
    structure: Option<Structure>,
    point_group: Option<PointGroup>,
    requested_group: Option<PointGroupType>,
    subspaces: Vec<SalcSubspace>,
    symmetrization_error: Option<f64>,
}

impl MsymContext {
    pub fn point_group(&self) -> Option<&PointGroup> {
        self.point_group.as_ref()
    }

    /// Subspaces from the last successful `generate_salc_subspaces`.
    pub fn salc_subspaces(&self) -> &[SalcSubspace] {
        &self.subspaces
    }

    /// Error estimate of the last symmetrization.
    pub fn symmetrization_error(&self) -> Option<f64> {
        self.symmetrization_error
    }

    /// Orbits of the elements under the current point group.
    pub fn equivalence_sets(&self) -> Result<EquivalenceSets> {
        let group = self.point_group.as_ref().ok_or_else(no_point_group)?;
        let structure = self.current_structure();
        let tolerance = structure.tolerance(self.thresholds.permutation);
        EquivalenceSets::new(&structure, group, tolerance)
    }

    fn current_structure(&self) -> Structure {
        self.structure
            .clone()
            .unwrap_or_else(|| Structure::new(&self.elements))
    }

    fn element_index(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == Some(id))
    }

    fn clear_derived(&mut self) {
        self.structure = None;
        self.point_group = None;
        self.subspaces.clear();
        self.symmetrization_error = None;
    }

    fn try_set_elements(&mut self, elements: &[Element]) -> Result<()> {
        if elements.is_empty() {
            return Err(MsymError::new(ErrorKind::InvalidElements, "No elements"));
        }
        for (i, element) in elements.iter().enumerate() {
            let finite = element.coordinates.iter().all(|c| c.is_finite());
            if !finite || !element.mass.is_finite() || element.mass < 0.0 {
                return Err(MsymError::new(
                    ErrorKind::InvalidElements,
                    format!(
                        "Element {} ({}) has invalid mass {} or coordinates {:?}",
                        i,
                        element.name(),
                        element.mass,
                        element.coordinates
                    ),
                ));
            }
        }
        if let Some((i, j)) = Structure::new(elements).coincident_pair(self.thresholds.zero) {
            return Err(MsymError::new(
                ErrorKind::InvalidElements,
                format!(
                    "Elements {} ({}) and {} ({}) coincide",
                    i,
                    elements[i].name(),
                    j,
                    elements[j].name()
                ),
            ));
        }
        self.elements = elements
            .iter()
            .map(|element| {
                let mut copy = element.clone();
                copy.set_id(ElementId::issue());
                copy
            })
            .collect();
        self.basis_functions.clear();
        self.requested_group = None;
        self.clear_derived();
        debug!("Installed {} elements", self.elements.len());
        Ok(())
    }

    fn try_set_basis_functions(&mut self, basis_functions: &[BasisFunction]) -> Result<()> {
        if self.elements.is_empty() {
            return Err(MsymError::new(
                ErrorKind::InvalidBasis,
                "No elements to place basis functions on",
            ));
        }
        let mut seen = HashSet::with_capacity(basis_functions.len());
        for (i, bf) in basis_functions.iter().enumerate() {
            let id = bf.bound_element().ok_or_else(|| {
                MsymError::new(
                    ErrorKind::InvalidBasis,
                    format!(
                        "Basis function {} ({}) is not bound to an element",
                        i,
                        bf.name()
                    ),
                )
            })?;
            if self.element_index(id).is_none() {
                return Err(MsymError::new(
                    ErrorKind::InvalidBasis,
                    format!(
                        "Basis function {} ({}) references an unknown element",
                        i,
                        bf.name()
                    ),
                ));
            }
            let Some(harmonic) = bf.real_spherical_harmonic_parameters() else {
                return Err(MsymError::new(
                    ErrorKind::InvalidBasis,
                    format!("Basis function {} ({}) has an unsupported type", i, bf.name()),
                ));
            };
            if !harmonic.is_valid() {
                return Err(MsymError::new(
                    ErrorKind::InvalidBasis,
                    format!(
                        "Basis function {} ({}) has invalid quantum numbers n = {}, l = {}, m = {}",
                        i,
                        bf.name(),
                        harmonic.n,
                        harmonic.l,
                        harmonic.m
                    ),
                ));
            }
            if !seen.insert((id, harmonic)) {
                return Err(MsymError::new(
                    ErrorKind::InvalidBasis,
                    format!("Basis function {} ({}) is a duplicate", i, bf.name()),
                ));
            }
        }
        self.basis_functions = basis_functions
            .iter()
            .map(|bf| {
                let mut copy = bf.clone();
                copy.set_id(BasisFunctionId::issue());
                copy
            })
            .collect();
        self.subspaces.clear();
        debug!("Installed {} basis functions", self.basis_functions.len());
        Ok(())
    }

    /// Detect the point group, or re-place a group set by name in the frame
    /// of the current elements.
    fn try_find_symmetry(&mut self) -> Result<()> {
        if self.elements.is_empty() {
            return Err(MsymError::new(ErrorKind::InvalidElements, "No elements"));
        }
        let structure = Structure::new(&self.elements);
        let group = match self.requested_group {
            Some(group_type) => {
                point_group_for_structure(&structure, group_type, &self.thresholds)?
            }
            None => find_point_group(&structure, &self.thresholds)?,
        };
        debug!("Point group {} with {} operations", group.name(), group.order());
        self.clear_derived();
        self.structure = Some(structure);
        self.point_group = Some(group);
        Ok(())
    }

    fn try_set_point_group(&mut self, name: &PointGroupName) -> Result<()> {
        let group_type: PointGroupType = name.as_str().parse()?;
        let structure = Structure::new(&self.elements);
        let group = point_group_for_structure(&structure, group_type, &self.thresholds)?;
        debug!("Point group set to {}", group.name());
        self.clear_derived();
        self.structure = Some(structure);
        self.point_group = Some(group);
        self.requested_group = Some(group_type);
        Ok(())
    }

    fn try_symmetrize(&mut self) -> Result<()> {
        let group = self.point_group.as_ref().ok_or_else(no_point_group)?;
        let structure = self.current_structure();
        let tolerance = structure.tolerance(self.thresholds.permutation);
        let equivalence = EquivalenceSets::new(&structure, group, tolerance)?;
        let symmetrized = symmetrize(&structure, group, &equivalence, &self.thresholds)?;
        for (element, coordinates) in self.elements.iter_mut().zip(symmetrized.coordinates) {
            element.coordinates = coordinates;
        }
        self.structure = Some(Structure::new(&self.elements));
        self.symmetrization_error = Some(symmetrized.error);
        Ok(())
    }

    fn try_generate_salc_subspaces(&mut self) -> Result<()> {
        let group = self.point_group.as_ref().ok_or_else(no_point_group)?;
        if self.basis_functions.is_empty() {
            return Err(MsymError::new(ErrorKind::InvalidBasis, "No basis functions"));
        }
        let structure = self.current_structure();
        let tolerance = structure.tolerance(self.thresholds.permutation);
        let equivalence = EquivalenceSets::new(&structure, group, tolerance)?;

        let mut basis = Vec::with_capacity(self.basis_functions.len());
        for bf in &self.basis_functions {
            let element = bf
                .bound_element()
                .and_then(|id| self.element_index(id))
                .ok_or_else(|| {
                    MsymError::new(
                        ErrorKind::InvalidBasis,
                        format!(
                            "Basis function {} is not bound to an installed element",
                            bf.name()
                        ),
                    )
                })?;
            if let Some(harmonic) = bf.real_spherical_harmonic_parameters() {
                basis.push(AtomicOrbital { element, harmonic });
            }
        }
        self.subspaces =
            generate_salc_subspaces(group, &equivalence, &basis, &self.thresholds)?;
        Ok(())
    }
}

impl NativeContext for MsymContext {
    fn create() -> Option<Self> {
        Some(Self::default())
    }

    fn release(self) -> ReturnCode {
        debug!("Releasing context with {} elements", self.elements.len());
        ReturnCode::Success
    }

    fn set_thresholds(&mut self, thresholds: &Thresholds) -> ReturnCode {
        match thresholds.first_invalid() {
            Some(name) => crate::fail!(
                ReturnCode::InvalidThreshold,
                "Threshold {} must be a finite value in (0, 1)",
                name
            ),
            None => {
                self.thresholds = *thresholds;
                ReturnCode::Success
            }
        }
    }

    fn get_thresholds(&self) -> std::result::Result<&Thresholds, ReturnCode> {
        Ok(&self.thresholds)
    }

    fn set_elements(&mut self, elements: &[Element]) -> ReturnCode {
        report(self.try_set_elements(elements))
    }

    fn get_elements(&self) -> std::result::Result<&[Element], ReturnCode> {
        Ok(&self.elements)
    }

    fn set_basis_functions(&mut self, basis_functions: &[BasisFunction]) -> ReturnCode {
        report(self.try_set_basis_functions(basis_functions))
    }

    fn get_basis_functions(&self) -> std::result::Result<&[BasisFunction], ReturnCode> {
        Ok(&self.basis_functions)
    }

    fn set_point_group_by_name(&mut self, name: &PointGroupName) -> ReturnCode {
        report(self.try_set_point_group(name))
    }

    fn get_point_group_name(&self, buffer: &mut [u8]) -> ReturnCode {
        let Some(group) = &self.point_group else {
            return report(Err(no_point_group()));
        };
        let name = group.name();
        if name.len() + 1 > buffer.len() {
            return crate::fail!(
                ReturnCode::InvalidInput,
                "Buffer of {} bytes is too small for point group name {}",
                buffer.len(),
                name
            );
        }
        buffer.fill(0);
        buffer[..name.len()].copy_from_slice(name.as_bytes());
        ReturnCode::Success
    }

    fn find_symmetry(&mut self) -> ReturnCode {
        report(self.try_find_symmetry())
    }

    fn get_symmetry_operations(&self) -> std::result::Result<&[SymmetryOperation], ReturnCode> {
        match &self.point_group {
            Some(group) => Ok(group.operations()),
            None => Err(report(Err(no_point_group()))),
        }
    }

    fn symmetrize_elements(&mut self) -> ReturnCode {
        report(self.try_symmetrize())
    }

    fn generate_salc_subspaces(&mut self) -> ReturnCode {
        report(self.try_generate_salc_subspaces())
    }
}
