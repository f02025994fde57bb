use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::interfaces::ElementName;
use crate::molecule::periodic_table::standard_atomic_weight;

/// Opaque identity assigned by the engine when an element is registered.
///
/// Only valid for the element array it was issued for; installing a new element
/// set issues new identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u64);

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

impl ElementId {
    pub(crate) fn issue() -> Self {
        Self(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A point mass (atom).
///
/// Two elements compare equal when their mass, coordinates, charge and name are
/// equal; the engine-assigned identity does not take part in comparisons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    #[serde(skip)]
    id: Option<ElementId>,
    pub mass: f64,
    pub coordinates: Vector3<f64>,
    pub charge: i32,
    name: ElementName,
}

impl Element {
    /// Create an element, taking the mass from the periodic table when `name`
    /// is a chemical symbol (0 otherwise).
    pub fn new(name: &str, coordinates: Vector3<f64>) -> Result<Self> {
        let name = ElementName::new(name)?;
        Ok(Self {
            id: None,
            mass: standard_atomic_weight(name.as_str()).unwrap_or(0.0),
            coordinates,
            charge: 0,
            name,
        })
    }

    pub fn with_mass(name: &str, mass: f64, coordinates: Vector3<f64>) -> Result<Self> {
        let mut element = Self::new(name, coordinates)?;
        element.mass = mass;
        Ok(element)
    }

    pub fn with_charge(mut self, charge: i32) -> Self {
        self.charge = charge;
        self
    }

    pub fn id(&self) -> Option<ElementId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ElementId) {
        self.id = Some(id);
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// True if both elements are interchangeable under a symmetry operation.
    pub fn same_type(&self, other: &Element, mass_tolerance: f64) -> bool {
        self.name == other.name
            && self.charge == other.charge
            && (self.mass - other.mass).abs() <= mass_tolerance
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.mass == other.mass
            && self.coordinates == other.coordinates
            && self.charge == other.charge
            && self.name == other.name
    }
}
