use std::f64::consts::PI;

use log::{debug, trace, warn};
use nalgebra::{Matrix3, SymmetricEigen, Vector3};

use crate::config::Thresholds;
use crate::error::{ErrorKind, MsymError, Result};
use crate::symmetries::point_groups::{
    closure, PointGroup, PointGroupKind, PointGroupType, MAX_NAMED_ORDER,
};
use crate::symmetries::structure::Structure;
use crate::symmetries::symmetry_operations::{
    canonical_direction, describe_matrix, improper_rotation_matrix, reflection_matrix,
    rotation_matrix, SymmetryOperationKind,
};

/// Largest finite point group.
const MAX_GROUP_ORDER: usize = 240;
/// Angular slack when reading orders off detected (noisy) operations.
const DETECTED_ANGLE_TOLERANCE: f64 = 0.01;

/// Directions merged when closer than a fixed angle.
struct AxisSet {
    axes: Vec<Vector3<f64>>,
    cos_limit: f64,
}

impl AxisSet {
    fn new(angle: f64) -> Self {
        Self {
            axes: Vec::new(),
            cos_limit: angle.cos(),
        }
    }

    fn insert(&mut self, v: Vector3<f64>, minimum_norm: f64) {
        if v.norm() <= minimum_norm.max(1e-12) {
            return;
        }
        let direction = canonical_direction(&v);
        if !self
            .axes
            .iter()
            .any(|a| a.dot(&direction).abs() > self.cos_limit)
        {
            self.axes.push(direction);
        }
    }
}

/// Some vector perpendicular to `z`.
pub(crate) fn any_perpendicular(z: &Vector3<f64>) -> Vector3<f64> {
    let least_aligned = [Vector3::x(), Vector3::y(), Vector3::z()]
        .into_iter()
        .min_by(|a, b| a.dot(z).abs().total_cmp(&b.dot(z).abs()))
        .unwrap_or_else(Vector3::x);
    z.cross(&least_aligned).normalize()
}

/// Right-handed frame with the given z axis and x axis projected perpendicular to it.
fn frame(z: &Vector3<f64>, x: &Vector3<f64>) -> Option<Matrix3<f64>> {
    let z = z.normalize();
    let x = x - z * x.dot(&z);
    if x.norm() < 0.1 {
        return None;
    }
    let x = x.normalize();
    let y = z.cross(&x);
    Some(Matrix3::from_columns(&[x, y, z]))
}

fn candidate_axes(structure: &Structure, thresholds: &Thresholds) -> Vec<Vector3<f64>> {
    let mut axes = AxisSet::new(thresholds.angle);
    let zero = structure.tolerance(thresholds.zero);
    let shell = structure.tolerance(thresholds.permutation);
    let positions = structure.positions();
    let types = structure.types();

    let mut inertia = Matrix3::zeros();
    for (r, w) in positions.iter().zip(structure.weights()) {
        inertia += (Matrix3::identity() * r.norm_squared() - r * r.transpose()) * *w;
    }
    let eigen = SymmetricEigen::new(inertia);
    for column in eigen.eigenvectors.column_iter() {
        axes.insert(column.into_owned(), 0.0);
    }
    for unit in [Vector3::z(), Vector3::x(), Vector3::y()] {
        axes.insert(unit, 0.0);
    }
    for r in positions {
        axes.insert(*r, zero);
    }
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            if types[i] != types[j] || (positions[i].norm() - positions[j].norm()).abs() > shell {
                continue;
            }
            axes.insert(positions[i] + positions[j], zero);
            axes.insert(positions[i] - positions[j], zero);
            axes.insert(positions[i].cross(&positions[j]), zero);
        }
    }
    axes.axes
}

/// Size of the largest set of same-type elements at equal distance from the center.
fn largest_shell(structure: &Structure, tolerance: f64) -> usize {
    let positions = structure.positions();
    let types = structure.types();
    (0..positions.len())
        .map(|i| {
            (0..positions.len())
                .filter(|&j| {
                    types[i] == types[j]
                        && (positions[i].norm() - positions[j].norm()).abs() <= tolerance
                })
                .count()
        })
        .max()
        .unwrap_or(0)
}

/// Distinct rotation axes, S axes and mirror planes of a set of operations.
#[derive(Debug, Default)]
pub(crate) struct SymmetryElements {
    rotations: Vec<(Vector3<f64>, u32)>,
    improper: Vec<(Vector3<f64>, u32)>,
    reflections: Vec<Vector3<f64>>,
    inversion: bool,
    operation_count: usize,
}

fn merge_axis(axes: &mut Vec<(Vector3<f64>, u32)>, axis: Vector3<f64>, order: u32) {
    let cos_limit = DETECTED_ANGLE_TOLERANCE.cos();
    match axes.iter_mut().find(|(a, _)| a.dot(&axis).abs() > cos_limit) {
        Some(entry) => entry.1 = entry.1.max(order),
        None => axes.push((axis, order)),
    }
}

impl SymmetryElements {
    /// Search the structure for symmetry operations and close them into a group.
    pub(crate) fn collect(structure: &Structure, thresholds: &Thresholds) -> Result<Self> {
        let tolerance = structure.tolerance(thresholds.permutation);
        let max_order = (largest_shell(structure, tolerance) as u32).clamp(2, MAX_NAMED_ORDER);
        let axes = candidate_axes(structure, thresholds);
        trace!(
            "Testing {} candidate axes up to order {}",
            axes.len(),
            max_order
        );

        let mut found = Vec::new();
        let inversion = -Matrix3::identity();
        if structure.is_invariant_under(&inversion, tolerance) {
            found.push(inversion);
        }
        for axis in &axes {
            let sigma = reflection_matrix(axis);
            if structure.is_invariant_under(&sigma, tolerance) {
                found.push(sigma);
            }
            for n in 2..=max_order {
                let cn = rotation_matrix(axis, 2.0 * PI / n as f64);
                if structure.is_invariant_under(&cn, tolerance) {
                    found.push(cn);
                }
            }
            for n in (4..=2 * max_order).step_by(2) {
                let sn = improper_rotation_matrix(axis, 2.0 * PI / n as f64);
                if structure.is_invariant_under(&sn, tolerance) {
                    found.push(sn);
                }
            }
        }
        trace!("Found {} generating operations", found.len());

        let dedupe = (10.0 * thresholds.permutation).min(0.1);
        let group = closure(&found, dedupe, MAX_GROUP_ORDER).ok_or_else(|| {
            MsymError::new(
                ErrorKind::SymmetryError,
                format!(
                    "More than {} symmetry operations found, thresholds are too loose",
                    MAX_GROUP_ORDER
                ),
            )
        })?;

        let mut elements = Self {
            operation_count: group.len(),
            ..Self::default()
        };
        for m in &group {
            let Some(geometry) = describe_matrix(m, DETECTED_ANGLE_TOLERANCE) else {
                warn!("Skipping symmetry operation with irrational rotation angle");
                continue;
            };
            match geometry.kind {
                SymmetryOperationKind::Identity => {}
                SymmetryOperationKind::Inversion => elements.inversion = true,
                SymmetryOperationKind::ProperRotation => {
                    merge_axis(&mut elements.rotations, geometry.axis, geometry.order)
                }
                SymmetryOperationKind::ImproperRotation => {
                    merge_axis(&mut elements.improper, geometry.axis, geometry.order)
                }
                SymmetryOperationKind::Reflection => {
                    let mut normals: Vec<(Vector3<f64>, u32)> =
                        elements.reflections.iter().map(|n| (*n, 1)).collect();
                    merge_axis(&mut normals, geometry.axis, 1);
                    elements.reflections = normals.into_iter().map(|(n, _)| n).collect();
                }
            }
        }
        // Highest order axes first
        elements.rotations.sort_by(|a, b| b.1.cmp(&a.1));
        elements.improper.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(elements)
    }

    pub(crate) fn operation_count(&self) -> usize {
        self.operation_count
    }

    fn max_rotation_order(&self) -> u32 {
        self.rotations.first().map_or(1, |(_, order)| *order)
    }

    fn has_reflection_with_normal(&self, axis: &Vector3<f64>) -> bool {
        let cos_limit = DETECTED_ANGLE_TOLERANCE.cos();
        self.reflections
            .iter()
            .any(|n| n.dot(axis).abs() > cos_limit)
    }

    fn principal_axis(&self) -> Option<Vector3<f64>> {
        let n = self.max_rotation_order();
        let mut principal = self.rotations.iter().filter(|(_, order)| *order == n);
        let first = principal.next()?.0;
        // Among equivalent candidates prefer one that is also an S_2n axis
        let with_improper = std::iter::once(first)
            .chain(principal.map(|(a, _)| *a))
            .find(|axis| {
                self.improper.iter().any(|(s, order)| {
                    *order == 2 * n && s.dot(axis).abs() > DETECTED_ANGLE_TOLERANCE.cos()
                })
            });
        Some(with_improper.unwrap_or(first))
    }

    /// Point group type of the detected operations.
    pub(crate) fn classify(&self) -> Result<PointGroupType> {
        let high_order_axes = self.rotations.iter().filter(|(_, o)| *o >= 3).count();
        let has_reflections = !self.reflections.is_empty();

        if high_order_axes >= 2 {
            let kind = match (self.max_rotation_order(), self.inversion, has_reflections) {
                (5, true, _) => PointGroupKind::Ih,
                (5, false, _) => PointGroupKind::I,
                (4, true, _) => PointGroupKind::Oh,
                (4, false, _) => PointGroupKind::O,
                (3, true, _) => PointGroupKind::Th,
                (3, false, true) => PointGroupKind::Td,
                (3, false, false) => PointGroupKind::T,
                (order, _, _) => {
                    return Err(MsymError::new(
                        ErrorKind::SymmetryError,
                        format!(
                            "Found {} axes of order 3 or higher with maximum order {}",
                            high_order_axes, order
                        ),
                    ))
                }
            };
            return PointGroupType::new(kind, 0);
        }

        let Some(z) = self.principal_axis() else {
            return if has_reflections {
                PointGroupType::new(PointGroupKind::Cs, 0)
            } else if self.inversion {
                PointGroupType::new(PointGroupKind::Ci, 0)
            } else {
                PointGroupType::new(PointGroupKind::Cn, 1)
            };
        };
        let n = self.max_rotation_order();
        let cos_limit = DETECTED_ANGLE_TOLERANCE.cos();
        let perpendicular_c2 = self
            .rotations
            .iter()
            .any(|(a, order)| order % 2 == 0 && a.dot(&z).abs() < DETECTED_ANGLE_TOLERANCE.sin());
        let sigma_h = self.has_reflection_with_normal(&z);

        let (kind, n) = if perpendicular_c2 {
            if sigma_h {
                (PointGroupKind::Dnh, n)
            } else if has_reflections {
                (PointGroupKind::Dnd, n)
            } else {
                (PointGroupKind::Dn, n)
            }
        } else if sigma_h {
            (PointGroupKind::Cnh, n)
        } else if has_reflections {
            (PointGroupKind::Cnv, n)
        } else if self
            .improper
            .iter()
            .any(|(s, order)| *order == 2 * n && s.dot(&z).abs() > cos_limit)
        {
            (PointGroupKind::S2n, 2 * n)
        } else {
            (PointGroupKind::Cn, n)
        };
        PointGroupType::new(kind, n)
    }

    /// Directions that may serve as the standard z axis of `group_type`.
    fn z_candidates(&self, group_type: &PointGroupType) -> Vec<Vector3<f64>> {
        let rotations_divisible_by = |k: u32| -> Vec<Vector3<f64>> {
            self.rotations
                .iter()
                .filter(|(_, order)| order % k == 0)
                .map(|(a, _)| *a)
                .collect()
        };
        match group_type.kind() {
            PointGroupKind::Ci | PointGroupKind::Kh => vec![Vector3::z()],
            PointGroupKind::Cn if group_type.n() == 1 => vec![Vector3::z()],
            PointGroupKind::Cs => self.reflections.clone(),
            PointGroupKind::T
            | PointGroupKind::Td
            | PointGroupKind::Th
            | PointGroupKind::I
            | PointGroupKind::Ih => rotations_divisible_by(2),
            PointGroupKind::O | PointGroupKind::Oh => rotations_divisible_by(4),
            PointGroupKind::S2n => self
                .improper
                .iter()
                .filter(|(_, order)| order % group_type.n() == 0)
                .map(|(a, _)| *a)
                .collect(),
            _ => rotations_divisible_by(group_type.n().max(1)),
        }
    }

    /// Directions that may serve as the standard x axis once `z` is fixed,
    /// preferring C2 axes and mirror planes through elements.
    fn x_candidates(
        &self,
        z: &Vector3<f64>,
        structure: &Structure,
        tolerance: f64,
    ) -> Vec<Vector3<f64>> {
        let through_element = |direction: &Vector3<f64>| {
            structure
                .positions()
                .iter()
                .any(|r| r.norm() > tolerance && r.cross(direction).norm() < tolerance)
        };
        let mut perpendicular: Vec<Vector3<f64>> = self
            .rotations
            .iter()
            .filter(|(a, order)| order % 2 == 0 && a.dot(z).abs() < DETECTED_ANGLE_TOLERANCE.sin())
            .map(|(a, _)| *a)
            .collect();
        let mut in_plane: Vec<Vector3<f64>> = self
            .reflections
            .iter()
            .filter(|n| n.dot(z).abs() < DETECTED_ANGLE_TOLERANCE.sin())
            .map(|n| z.cross(n))
            .collect();
        perpendicular.sort_by_key(|a| !through_element(a));
        in_plane.sort_by_key(|a| !through_element(a));

        let mut candidates = perpendicular;
        candidates.extend(in_plane);
        candidates.extend(
            structure
                .positions()
                .iter()
                .map(|r| r - z * r.dot(z))
                .filter(|p| p.norm() > tolerance),
        );
        candidates.push(any_perpendicular(z));
        candidates
    }
}

/// True when every element lies on one line through the center.
fn linear_axis(structure: &Structure, thresholds: &Thresholds) -> Option<Vector3<f64>> {
    let farthest = structure
        .positions()
        .iter()
        .max_by(|a, b| a.norm().total_cmp(&b.norm()))?;
    let axis = farthest.normalize();
    let tolerance = structure.tolerance(thresholds.geometry);
    structure
        .positions()
        .iter()
        .all(|r| r.cross(&axis).norm() < tolerance)
        .then(|| canonical_direction(&axis))
}

fn is_point(structure: &Structure, thresholds: &Thresholds) -> bool {
    structure.scale() < thresholds.zero
}

/// Try frames built from the detected symmetry elements until the ideal
/// operations of `group_type` all map the structure onto itself.
fn align(
    structure: &Structure,
    group_type: PointGroupType,
    elements: &SymmetryElements,
    tolerance: f64,
) -> Result<Option<PointGroup>> {
    let standard = group_type.standard_matrices()?;
    for z in elements.z_candidates(&group_type) {
        for x in elements.x_candidates(&z, structure, tolerance) {
            let Some(f) = frame(&z, &x) else {
                continue;
            };
            let fits = standard
                .iter()
                .all(|m| structure.is_invariant_under(&(f * m * f.transpose()), tolerance));
            if fits {
                return PointGroup::new(group_type, f).map(Some);
            }
        }
    }
    Ok(None)
}

fn linear_point_group(
    structure: &Structure,
    group_type: PointGroupType,
    axis: &Vector3<f64>,
    tolerance: f64,
) -> Result<Option<PointGroup>> {
    let Some(f) = frame(axis, &any_perpendicular(axis)) else {
        return Ok(None);
    };
    let group = PointGroup::new(group_type, f)?;
    let fits = group
        .matrices()
        .iter()
        .all(|m| structure.is_invariant_under(m, tolerance));
    Ok(fits.then_some(group))
}

/// Determine the point group of a structure and place it in the structure's frame.
pub(crate) fn find_point_group(
    structure: &Structure,
    thresholds: &Thresholds,
) -> Result<PointGroup> {
    if is_point(structure, thresholds) {
        debug!("All elements coincide with the center, point group Kh");
        return PointGroup::new(PointGroupType::new(PointGroupKind::Kh, 0)?, Matrix3::identity());
    }
    let tolerance = structure.tolerance(thresholds.permutation);

    if let Some(axis) = linear_axis(structure, thresholds) {
        let kind = if structure.is_invariant_under(&-Matrix3::identity(), tolerance) {
            PointGroupKind::Dnh
        } else {
            PointGroupKind::Cnv
        };
        let group_type = PointGroupType::new(kind, 0)?;
        debug!("Linear structure along {:?}, point group {}", axis, group_type);
        return linear_point_group(structure, group_type, &axis, tolerance)?.ok_or_else(|| {
            MsymError::new(
                ErrorKind::SymmetryError,
                format!("Linear structure is not symmetric under {}", group_type),
            )
        });
    }

    let elements = SymmetryElements::collect(structure, thresholds)?;
    let group_type = elements.classify()?;
    debug!(
        "Detected {} symmetry operations, point group {}",
        elements.operation_count(),
        group_type
    );
    if elements.operation_count() != group_type.order() {
        warn!(
            "Detected {} operations but {} has {}",
            elements.operation_count(),
            group_type,
            group_type.order()
        );
    }
    align(structure, group_type, &elements, tolerance)?.ok_or_else(|| {
        MsymError::new(
            ErrorKind::SymmetryError,
            format!("Could not align point group {} with the elements", group_type),
        )
    })
}

/// Instantiate a requested point group in the frame of a structure.
pub(crate) fn point_group_for_structure(
    structure: &Structure,
    group_type: PointGroupType,
    thresholds: &Thresholds,
) -> Result<PointGroup> {
    let incompatible = || {
        MsymError::new(
            ErrorKind::PointGroupError,
            format!("Point group {} is not a symmetry of the elements", group_type),
        )
    };
    // Every point group leaves a single point invariant
    if structure.is_empty() || is_point(structure, thresholds) {
        return PointGroup::new(group_type, Matrix3::identity());
    }
    if group_type.kind() == PointGroupKind::Kh {
        return Err(incompatible());
    }
    let tolerance = structure.tolerance(thresholds.permutation);

    if group_type.is_linear() {
        let axis = linear_axis(structure, thresholds).ok_or_else(incompatible)?;
        return linear_point_group(structure, group_type, &axis, tolerance)?
            .ok_or_else(incompatible);
    }

    let elements = SymmetryElements::collect(structure, thresholds)?;
    align(structure, group_type, &elements, tolerance)?.ok_or_else(incompatible)
}
