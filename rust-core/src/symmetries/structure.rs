use nalgebra::{Matrix3, Vector3};

use crate::molecule::Element;

const MASS_TOLERANCE: f64 = 1e-8;

/// Elements reduced to what symmetry analysis needs: positions relative to the
/// center of mass and an interchangeability class per element.
///
/// Positions are stored in units of the structure size, so the farthest
/// element sits at distance 1 whatever the magnitude of the input coordinates.
#[derive(Debug, Clone)]
pub struct Structure {
    center: Vector3<f64>,
    positions: Vec<Vector3<f64>>,
    weights: Vec<f64>,
    types: Vec<usize>,
    scale: f64,
}

/// Largest absolute component over a set of vectors.
fn extent<'a>(vectors: impl Iterator<Item = &'a Vector3<f64>>) -> f64 {
    vectors.flat_map(|v| v.iter()).fold(0.0, |acc: f64, c| acc.max(c.abs()))
}

impl Structure {
    /// Center on the center of mass, or on the geometric center when all
    /// masses are zero.
    pub fn new(elements: &[Element]) -> Self {
        let total_mass: f64 = elements.iter().map(|e| e.mass).sum();
        let weights: Vec<f64> = if total_mass > 0.0 {
            elements.iter().map(|e| e.mass).collect()
        } else {
            vec![1.0; elements.len()]
        };
        let total_weight: f64 = weights.iter().sum();
        let reach = extent(elements.iter().map(|e| &e.coordinates));
        let center = if total_weight > 0.0 && reach > 0.0 {
            let weighted = elements
                .iter()
                .zip(&weights)
                .fold(Vector3::zeros(), |acc, (e, w)| {
                    acc + e.coordinates / reach * (*w / total_weight)
                });
            weighted * reach
        } else {
            Vector3::zeros()
        };

        let mut types = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            let existing = elements[..i]
                .iter()
                .position(|other| other.same_type(element, MASS_TOLERANCE));
            let t = match existing {
                Some(j) => types[j],
                None => types.iter().copied().max().map_or(0, |m: usize| m + 1),
            };
            types.push(t);
        }

        let mut positions: Vec<Vector3<f64>> =
            elements.iter().map(|e| e.coordinates - center).collect();
        let reach = extent(positions.iter());
        let scale = if reach > 0.0 {
            reach * positions.iter().map(|r| (r / reach).norm()).fold(0.0, f64::max)
        } else {
            0.0
        };
        if scale > 0.0 {
            for r in &mut positions {
                *r /= scale;
            }
        }

        Self {
            center,
            positions,
            weights,
            types,
            scale,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn center(&self) -> Vector3<f64> {
        self.center
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn types(&self) -> &[usize] {
        &self.types
    }

    /// Positions in units of [`Structure::scale`].
    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    /// Largest distance of an element from the center.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Tolerance in the units of `positions` for a threshold given relative to
    /// the structure size; the size is 1 in those units.
    pub fn tolerance(&self, relative: f64) -> f64 {
        relative
    }

    /// Absolute coordinates of a point given in the units of `positions`.
    pub fn to_coordinates(&self, r: &Vector3<f64>) -> Vector3<f64> {
        r * self.scale + self.center
    }

    /// First pair of elements closer than `relative` times the structure
    /// size, or closer than `relative` in absolute terms.
    pub fn coincident_pair(&self, relative: f64) -> Option<(usize, usize)> {
        for i in 0..self.len() {
            for j in (i + 1)..self.len() {
                let distance = (self.positions[i] - self.positions[j]).norm();
                if distance <= relative || distance * self.scale <= relative {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Where each element lands under `m`, if every image coincides with a
    /// distinct element of the same type within `tolerance`.
    pub fn permutation(&self, m: &Matrix3<f64>, tolerance: f64) -> Option<Vec<usize>> {
        let mut image = Vec::with_capacity(self.len());
        let mut taken = vec![false; self.len()];
        for (i, r) in self.positions.iter().enumerate() {
            let moved = m * r;
            let (j, distance) = self
                .positions
                .iter()
                .enumerate()
                .filter(|(j, _)| !taken[*j] && self.types[*j] == self.types[i])
                .map(|(j, other)| (j, (other - moved).norm()))
                .min_by(|a, b| a.1.total_cmp(&b.1))?;
            if distance > tolerance {
                return None;
            }
            taken[j] = true;
            image.push(j);
        }
        Some(image)
    }

    pub fn is_invariant_under(&self, m: &Matrix3<f64>, tolerance: f64) -> bool {
        self.permutation(m, tolerance).is_some()
    }
}
