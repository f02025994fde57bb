use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interfaces::BasisFunctionName;
use crate::molecule::element::{Element, ElementId};

/// Opaque identity assigned by the engine when a basis function is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisFunctionId(u64);

static NEXT_BASIS_FUNCTION_ID: AtomicU64 = AtomicU64::new(1);

impl BasisFunctionId {
    pub(crate) fn issue() -> Self {
        Self(NEXT_BASIS_FUNCTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which element a basis function sits on.
///
/// Callers construct basis functions against their own element values
/// (`Unbound`); installing them into a context rebinds the reference to the
/// identity of the context-owned copy (`Bound`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementRef {
    Unbound(Element),
    Bound(ElementId),
}

/// Type tag of the basis function payload as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum BasisFunctionType {
    RealSphericalHarmonic = 0,
}

/// Real spherical harmonic with principal, angular and magnetic quantum numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RealSphericalHarmonic {
    pub n: i32,
    pub l: i32,
    pub m: i32,
}

impl RealSphericalHarmonic {
    pub fn new(n: i32, l: i32, m: i32) -> Self {
        Self { n, l, m }
    }

    pub fn is_valid(&self) -> bool {
        self.n >= 1 && self.l >= 0 && self.l < self.n && self.m.abs() <= self.l
    }
}

/// Function-specific parameters, keyed by the basis function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasisFunctionKind {
    RealSphericalHarmonic(RealSphericalHarmonic),
}

impl BasisFunctionKind {
    pub fn function_type(&self) -> BasisFunctionType {
        match self {
            Self::RealSphericalHarmonic(_) => BasisFunctionType::RealSphericalHarmonic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisFunction {
    #[serde(skip)]
    id: Option<BasisFunctionId>,
    element: ElementRef,
    pub kind: BasisFunctionKind,
    name: BasisFunctionName,
}

impl BasisFunction {
    pub fn new(element: &Element, kind: BasisFunctionKind, name: &str) -> Result<Self> {
        Ok(Self {
            id: None,
            element: ElementRef::Unbound(element.clone()),
            kind,
            name: BasisFunctionName::new(name)?,
        })
    }

    /// Real spherical harmonic basis function on `element`.
    pub fn real_spherical_harmonic(
        element: &Element,
        n: i32,
        l: i32,
        m: i32,
        name: &str,
    ) -> Result<Self> {
        Self::new(
            element,
            BasisFunctionKind::RealSphericalHarmonic(RealSphericalHarmonic::new(n, l, m)),
            name,
        )
    }

    pub fn id(&self) -> Option<BasisFunctionId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: BasisFunctionId) {
        self.id = Some(id);
    }

    pub fn element_ref(&self) -> &ElementRef {
        &self.element
    }

    /// Point the function at another element value; clears any binding.
    pub fn set_element(&mut self, element: &Element) {
        self.element = ElementRef::Unbound(element.clone());
    }

    pub(crate) fn bind(&mut self, id: ElementId) {
        self.element = ElementRef::Bound(id);
    }

    /// Identity of the context-owned element this function is bound to.
    pub fn bound_element(&self) -> Option<ElementId> {
        match self.element {
            ElementRef::Bound(id) => Some(id),
            ElementRef::Unbound(_) => None,
        }
    }

    pub fn function_type(&self) -> BasisFunctionType {
        self.kind.function_type()
    }

    pub fn real_spherical_harmonic_parameters(&self) -> Option<RealSphericalHarmonic> {
        match self.kind {
            BasisFunctionKind::RealSphericalHarmonic(sh) => Some(sh),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}
