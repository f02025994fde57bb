//! Analysis context: a stateful handle that owns one engine context and
//! sequences the analysis pipeline.
//!
//! The usual order is elements, then (optionally) basis functions, then a
//! point group (found or set), then symmetrization and SALC generation.
//! Every engine status is translated into a [`MsymError`] carrying the detail
//! the engine left for that call.

use log::{debug, warn};

use crate::config::Thresholds;
use crate::engine::{MsymContext, NativeContext};
use crate::error::{ErrorKind, MsymError, Result};
use crate::interfaces::PointGroupName;
use crate::molecule::{BasisFunction, Element, ElementId, ElementRef};
use crate::status::{self, ReturnCode};
use crate::symmetries::SymmetryOperation;

/// Context over the built-in engine.
pub type Context = AnalysisContext<MsymContext>;

/// Furthest pipeline stage a context has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContextState {
    Created,
    ElementsSet,
    BasisSet,
    PointGroupKnown,
    Symmetrized,
    SubspacesGenerated,
    Released,
}

/// Translate a status code, capturing the engine detail while the engine
/// call lock is still held by the caller.
fn check(code: ReturnCode) -> Result<()> {
    match MsymError::from_return_code(code, status::error_details()) {
        None => Ok(()),
        Some(e) => Err(e),
    }
}

fn released(operation: &str) -> MsymError {
    MsymError::precondition(format!("{} called on a released context", operation))
}

pub struct AnalysisContext<N: NativeContext = MsymContext> {
    handle: Option<N>,
    elements: Vec<Element>,
    /// Elements replaced by the last `install_elements`, for resolving
    /// basis functions bound to them.
    previous_elements: Vec<Element>,
    basis_functions: Vec<BasisFunction>,
    point_group: Option<String>,
    symmetry_operations: Vec<SymmetryOperation>,
    symmetrized: bool,
    subspaces_generated: bool,
}

impl<N: NativeContext> AnalysisContext<N> {
    /// Acquire a fresh engine context.
    pub fn create() -> Result<Self> {
        let handle = {
            let _guard = status::engine_call_lock();
            N::create()
        }
        .ok_or_else(|| {
            MsymError::new(ErrorKind::Resource, "Engine could not create a context")
        })?;
        debug!("Created analysis context");
        Ok(Self {
            handle: Some(handle),
            elements: Vec::new(),
            previous_elements: Vec::new(),
            basis_functions: Vec::new(),
            point_group: None,
            symmetry_operations: Vec::new(),
            symmetrized: false,
            subspaces_generated: false,
        })
    }

    /// Create a context and run the first pipeline stages: install `elements`,
    /// then `basis_functions` when non-empty. When `point_group` is given it
    /// is set and then placed by `find_symmetry`; otherwise no point group is
    /// determined.
    pub fn with(
        elements: &[Element],
        basis_functions: &[BasisFunction],
        point_group: Option<&str>,
    ) -> Result<Self> {
        let mut context = Self::create()?;
        context.install_elements(elements)?;
        if !basis_functions.is_empty() {
            context.install_basis_functions(basis_functions)?;
        }
        if let Some(name) = point_group {
            context.set_point_group(name)?;
            context.find_symmetry()?;
        }
        Ok(context)
    }

    pub fn state(&self) -> ContextState {
        if self.handle.is_none() {
            ContextState::Released
        } else if self.subspaces_generated {
            ContextState::SubspacesGenerated
        } else if self.symmetrized {
            ContextState::Symmetrized
        } else if self.point_group.is_some() {
            ContextState::PointGroupKnown
        } else if !self.basis_functions.is_empty() {
            ContextState::BasisSet
        } else if !self.elements.is_empty() {
            ContextState::ElementsSet
        } else {
            ContextState::Created
        }
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// The engine context, for engine-specific results.
    pub fn native(&self) -> Result<&N> {
        self.handle.as_ref().ok_or_else(|| released("native"))
    }

    fn call(&mut self, operation: &str, f: impl FnOnce(&mut N) -> ReturnCode) -> Result<()> {
        let handle = self.handle.as_mut().ok_or_else(|| released(operation))?;
        let _guard = status::engine_call_lock();
        check(f(handle))
    }

    fn read<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&N) -> std::result::Result<T, ReturnCode>,
    ) -> Result<T> {
        let handle = self.handle.as_ref().ok_or_else(|| released(operation))?;
        let _guard = status::engine_call_lock();
        f(handle).or_else(|code| {
            check(code)?;
            Err(MsymError::new(
                ErrorKind::InvalidContext,
                format!("{} failed without a status", operation),
            ))
        })
    }

    fn read_point_group_name(&self) -> Result<String> {
        let mut buffer = [0u8; PointGroupName::MAX_LEN + 1];
        let handle = self.handle.as_ref().ok_or_else(|| released("point_group"))?;
        {
            let _guard = status::engine_call_lock();
            check(handle.get_point_group_name(&mut buffer))?;
        }
        Ok(PointGroupName::from_buffer(&buffer)?.as_str().to_owned())
    }

    fn read_symmetry_operations(&self) -> Result<Vec<SymmetryOperation>> {
        self.read("symmetry_operations", |n| {
            n.get_symmetry_operations().map(|ops| ops.to_vec())
        })
    }

    pub fn thresholds(&self) -> Result<Thresholds> {
        self.read("thresholds", |n| n.get_thresholds().copied())
    }

    pub fn set_thresholds(&mut self, thresholds: &Thresholds) -> Result<()> {
        self.call("set_thresholds", |n| n.set_thresholds(thresholds))
    }

    /// Install the element set and return the context-owned copies.
    ///
    /// Discards all previously installed basis functions and any point group
    /// or derived results.
    pub fn install_elements(&mut self, elements: &[Element]) -> Result<&[Element]> {
        self.call("install_elements", |n| n.set_elements(elements))?;
        let installed = self.read("install_elements", |n| {
            n.get_elements().map(|e| e.to_vec())
        })?;
        self.previous_elements = std::mem::replace(&mut self.elements, installed);
        self.basis_functions.clear();
        self.point_group = None;
        self.symmetry_operations.clear();
        self.symmetrized = false;
        self.subspaces_generated = false;
        Ok(&self.elements)
    }

    /// Install basis functions, rebinding each to the context-owned copy of
    /// the element it references.
    ///
    /// An element reference matches by value among the installed elements. A
    /// bound reference matches by identity, or, when it was bound to the
    /// element set replaced by the last `install_elements`, by the value it was
    /// bound to. On failure the installed basis is left unchanged.
    pub fn install_basis_functions(
        &mut self,
        basis_functions: &[BasisFunction],
    ) -> Result<&[BasisFunction]> {
        if self.handle.is_none() {
            return Err(released("install_basis_functions"));
        }
        if self.elements.is_empty() {
            return Err(MsymError::precondition(
                "Elements must be installed before basis functions",
            ));
        }
        let mut rebound = Vec::with_capacity(basis_functions.len());
        for (i, bf) in basis_functions.iter().enumerate() {
            let id = match bf.element_ref() {
                ElementRef::Unbound(element) => self
                    .elements
                    .iter()
                    .find(|installed| *installed == element)
                    .and_then(|installed| installed.id()),
                ElementRef::Bound(id) => self.rebind(*id),
            };
            let id = id.ok_or_else(|| {
                MsymError::new(
                    ErrorKind::InvalidBasis,
                    format!(
                        "Basis function {} ({}) references an element that is not installed",
                        i,
                        bf.name()
                    ),
                )
            })?;
            let mut copy = bf.clone();
            copy.bind(id);
            rebound.push(copy);
        }

        self.call("install_basis_functions", |n| n.set_basis_functions(&rebound))?;
        let installed = self.read("install_basis_functions", |n| {
            n.get_basis_functions().map(|b| b.to_vec())
        })?;
        self.basis_functions = installed;
        self.subspaces_generated = false;
        Ok(&self.basis_functions)
    }

    /// Identity of the installed element matching a bound reference.
    ///
    /// References into the previous element set resolve to the element at the
    /// same position if it is unchanged, else to the first equal element.
    fn rebind(&self, id: ElementId) -> Option<ElementId> {
        if let Some(current) = self.elements.iter().find(|e| e.id() == Some(id)) {
            return current.id();
        }
        let position = self.previous_elements.iter().position(|e| e.id() == Some(id))?;
        let value = &self.previous_elements[position];
        match self.elements.get(position) {
            Some(same) if same == value => same.id(),
            _ => self.elements.iter().find(|e| *e == value).and_then(|e| e.id()),
        }
    }

    /// Install a point group by Schoenflies name and refresh the operations.
    pub fn set_point_group(&mut self, name: &str) -> Result<()> {
        if self.handle.is_none() {
            return Err(released("set_point_group"));
        }
        if self.elements.is_empty() {
            return Err(MsymError::precondition(
                "Elements must be installed before setting a point group",
            ));
        }
        let name = PointGroupName::new(name)?;
        self.call("set_point_group", |n| n.set_point_group_by_name(&name))?;
        let point_group = self.read_point_group_name()?;
        let operations = self.read_symmetry_operations()?;
        self.point_group = Some(point_group);
        self.symmetry_operations = operations;
        self.symmetrized = false;
        self.subspaces_generated = false;
        Ok(())
    }

    /// Determine the point group of the installed elements.
    ///
    /// On failure the previous point group and operations are kept.
    pub fn find_symmetry(&mut self) -> Result<&str> {
        if self.handle.is_none() {
            return Err(released("find_symmetry"));
        }
        if self.elements.is_empty() {
            return Err(MsymError::precondition(
                "Elements must be installed before finding symmetry",
            ));
        }
        self.call("find_symmetry", |n| n.find_symmetry())?;
        let point_group = self.read_point_group_name()?;
        let operations = self.read_symmetry_operations()?;
        debug!(
            "Found point group {} with {} operations",
            point_group,
            operations.len()
        );
        self.symmetry_operations = operations;
        self.symmetrized = false;
        self.subspaces_generated = false;
        Ok(self.point_group.insert(point_group).as_str())
    }

    /// Make the element coordinates exactly symmetric under the current point
    /// group and return the updated elements.
    pub fn symmetrize_elements(&mut self) -> Result<&[Element]> {
        if self.handle.is_none() {
            return Err(released("symmetrize_elements"));
        }
        if self.point_group.is_none() {
            return Err(MsymError::precondition(
                "A point group must be found or set before symmetrizing",
            ));
        }
        self.call("symmetrize_elements", |n| n.symmetrize_elements())?;
        let elements = self.read("symmetrize_elements", |n| {
            n.get_elements().map(|e| e.to_vec())
        })?;
        self.elements = elements;
        self.symmetrized = true;
        Ok(&self.elements)
    }

    /// Decompose the installed basis into symmetry-adapted subspaces.
    ///
    /// The subspaces stay in the engine; see [`AnalysisContext::native`].
    pub fn generate_salc_subspaces(&mut self) -> Result<()> {
        if self.handle.is_none() {
            return Err(released("generate_salc_subspaces"));
        }
        if self.point_group.is_none() {
            return Err(MsymError::precondition(
                "A point group must be found or set before generating subspaces",
            ));
        }
        if self.basis_functions.is_empty() {
            return Err(MsymError::new(
                ErrorKind::InvalidBasis,
                "No basis functions installed",
            ));
        }
        self.call("generate_salc_subspaces", |n| n.generate_salc_subspaces())?;
        self.subspaces_generated = true;
        Ok(())
    }

    pub fn elements(&self) -> Result<&[Element]> {
        self.live("elements")?;
        Ok(&self.elements)
    }

    pub fn basis_functions(&self) -> Result<&[BasisFunction]> {
        self.live("basis_functions")?;
        Ok(&self.basis_functions)
    }

    pub fn point_group(&self) -> Result<Option<&str>> {
        self.live("point_group")?;
        Ok(self.point_group.as_deref())
    }

    pub fn symmetry_operations(&self) -> Result<&[SymmetryOperation]> {
        self.live("symmetry_operations")?;
        Ok(&self.symmetry_operations)
    }

    /// The context-owned element a basis function is bound to.
    pub fn element_of(&self, basis_function: &BasisFunction) -> Result<Option<&Element>> {
        self.live("element_of")?;
        Ok(basis_function
            .bound_element()
            .and_then(|id| self.elements.iter().find(|e| e.id() == Some(id))))
    }

    fn live(&self, operation: &str) -> Result<()> {
        match self.handle {
            Some(_) => Ok(()),
            None => Err(released(operation)),
        }
    }

    /// Return the engine context and drop all held state. Safe to call any
    /// number of times; only the first call reaches the engine.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            let code = {
                let _guard = status::engine_call_lock();
                handle.release()
            };
            if !code.is_success() {
                warn!("Engine reported {} while releasing a context", code);
            }
        }
        self.elements.clear();
        self.previous_elements.clear();
        self.basis_functions.clear();
        self.point_group = None;
        self.symmetry_operations.clear();
        self.symmetrized = false;
        self.subspaces_generated = false;
    }
}

impl<N: NativeContext> Drop for AnalysisContext<N> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<N: NativeContext> std::fmt::Debug for AnalysisContext<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("state", &self.state())
            .field("elements", &self.elements.len())
            .field("basis_functions", &self.basis_functions.len())
            .field("point_group", &self.point_group)
            .field("symmetry_operations", &self.symmetry_operations.len())
            .finish()
    }
}
