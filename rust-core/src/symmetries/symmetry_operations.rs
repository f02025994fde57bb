use std::f64::consts::PI;

use nalgebra::{Matrix3, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::MAX_AXIS_ORDER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymmetryOperationKind {
    Identity,
    ProperRotation,
    ImproperRotation,
    Reflection,
    Inversion,
}

/// Orientation of an operation relative to the principal axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    None,
    Horizontal,
    Vertical,
    Dihedral,
}

/// One symmetry operation of the analyzed structure.
///
/// `vector` is the rotation axis (rotations) or the plane normal (reflections),
/// and zero for the identity and the inversion. `order`/`power` describe
/// C<sub>n</sub><sup>k</sup> and S<sub>n</sub><sup>k</sup>; reflections and the
/// identity carry order 1, the inversion order 2 (S<sub>2</sub>).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymmetryOperation {
    kind: SymmetryOperationKind,
    order: u32,
    power: u32,
    orientation: Orientation,
    vector: Vector3<f64>,
    conjugacy_class: usize,
}

impl SymmetryOperation {
    pub(crate) fn new(
        geometry: &OperationGeometry,
        orientation: Orientation,
        conjugacy_class: usize,
    ) -> Self {
        Self {
            kind: geometry.kind,
            order: geometry.order,
            power: geometry.power,
            orientation,
            vector: geometry.axis,
            conjugacy_class,
        }
    }

    pub fn kind(&self) -> SymmetryOperationKind {
        self.kind
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn power(&self) -> u32 {
        self.power
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Axis or plane normal (unit length, zero for E and i).
    pub fn vector(&self) -> Vector3<f64> {
        self.vector
    }

    pub fn conjugacy_class(&self) -> usize {
        self.conjugacy_class
    }

    pub fn is_proper(&self) -> bool {
        matches!(
            self.kind,
            SymmetryOperationKind::Identity | SymmetryOperationKind::ProperRotation
        )
    }

    /// Matrix of the operation acting on column vectors.
    pub fn matrix(&self) -> Matrix3<f64> {
        let angle = 2.0 * PI * self.power as f64 / self.order.max(1) as f64;
        match self.kind {
            SymmetryOperationKind::Identity => Matrix3::identity(),
            SymmetryOperationKind::Inversion => -Matrix3::identity(),
            SymmetryOperationKind::Reflection => reflection_matrix(&self.vector),
            SymmetryOperationKind::ProperRotation => rotation_matrix(&self.vector, angle),
            SymmetryOperationKind::ImproperRotation => {
                improper_rotation_matrix(&self.vector, angle)
            }
        }
    }
}

/// Kind, order, power and axis read off an orthogonal matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OperationGeometry {
    pub kind: SymmetryOperationKind,
    pub order: u32,
    pub power: u32,
    pub axis: Vector3<f64>,
}

pub fn rotation_matrix(axis: &Vector3<f64>, angle: f64) -> Matrix3<f64> {
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle).into_inner()
}

pub fn reflection_matrix(normal: &Vector3<f64>) -> Matrix3<f64> {
    let n = normal.normalize();
    Matrix3::identity() - 2.0 * n * n.transpose()
}

/// Rotation by `angle` followed by the reflection through the perpendicular plane.
pub fn improper_rotation_matrix(axis: &Vector3<f64>, angle: f64) -> Matrix3<f64> {
    reflection_matrix(axis) * rotation_matrix(axis, angle)
}

/// Flip `v` so that its first significant component (z, then x, then y) is
/// positive, and normalize it.
pub fn canonical_direction(v: &Vector3<f64>) -> Vector3<f64> {
    let n = v.normalize();
    let sign = [n.z, n.x, n.y]
        .into_iter()
        .find(|c| c.abs() > 1e-8)
        .map(f64::signum)
        .unwrap_or(1.0);
    n * sign
}

/// Axis (canonical sign) and angle in [0, 2π) of a proper rotation matrix.
/// The identity yields a zero axis and a zero angle.
fn rotation_axis_angle(r: &Matrix3<f64>) -> (Vector3<f64>, f64) {
    let cos = ((r.trace() - 1.0) / 2.0).clamp(-1.0, 1.0);
    let w = Vector3::new(
        r[(2, 1)] - r[(1, 2)],
        r[(0, 2)] - r[(2, 0)],
        r[(1, 0)] - r[(0, 1)],
    );
    let sin_abs = w.norm() / 2.0;
    if sin_abs < 1e-9 && cos > 0.0 {
        return (Vector3::zeros(), 0.0);
    }
    let raw_axis = if sin_abs > 1e-6 {
        w / (2.0 * sin_abs)
    } else {
        // Half turn: R + I = 2 a a^T
        let b = r + Matrix3::identity();
        let column = (0..3)
            .max_by(|&i, &j| b.column(i).norm().total_cmp(&b.column(j).norm()))
            .unwrap_or(2);
        b.column(column).into_owned()
    };
    let axis = canonical_direction(&raw_axis);
    let sin = w.dot(&axis) / 2.0;
    (axis, sin.atan2(cos).rem_euclid(2.0 * PI))
}

/// Smallest `(k, n)` with `angle ≈ 2πk/n` within `tolerance` radians.
///
/// The slack shrinks with `n` so that it never exceeds half the gap between
/// neighbouring fractions of order `n` or lower.
fn rational_turn(angle: f64, tolerance: f64) -> Option<(u32, u32)> {
    (1..=MAX_AXIS_ORDER).find_map(|n| {
        let exact = angle * n as f64 / (2.0 * PI);
        let k = exact.round();
        let error = (exact - k).abs() * 2.0 * PI / n as f64;
        let slack = tolerance.min(PI / (n * n) as f64);
        (error < slack).then_some(((k as u32) % n, n))
    })
}

/// Describe an orthogonal matrix as a symmetry operation.
///
/// `tolerance` is the angular slack (radians) used to recognize rational
/// rotation angles; `None` means the angle is not a rational fraction of a turn
/// with a supported order.
pub(crate) fn describe_matrix(m: &Matrix3<f64>, tolerance: f64) -> Option<OperationGeometry> {
    let improper = m.determinant() < 0.0;
    let proper = if improper { -*m } else { *m };
    let (axis, angle) = rotation_axis_angle(&proper);
    let identity_like =
        axis == Vector3::zeros() || angle < tolerance || 2.0 * PI - angle < tolerance;

    if !improper {
        if identity_like {
            return Some(OperationGeometry {
                kind: SymmetryOperationKind::Identity,
                order: 1,
                power: 1,
                axis: Vector3::zeros(),
            });
        }
        let (power, order) = rational_turn(angle, tolerance)?;
        return Some(OperationGeometry {
            kind: SymmetryOperationKind::ProperRotation,
            order,
            power,
            axis,
        });
    }

    if identity_like {
        return Some(OperationGeometry {
            kind: SymmetryOperationKind::Inversion,
            order: 2,
            power: 1,
            axis: Vector3::zeros(),
        });
    }
    // -M is a rotation by θ + π about the S axis
    let theta = (angle - PI).rem_euclid(2.0 * PI);
    if theta < tolerance || 2.0 * PI - theta < tolerance {
        return Some(OperationGeometry {
            kind: SymmetryOperationKind::Reflection,
            order: 1,
            power: 1,
            axis,
        });
    }
    let (mut power, order) = rational_turn(theta, tolerance)?;
    // S_n^k with n odd is improper only for odd k
    if order % 2 == 1 && power % 2 == 0 {
        power += order;
    }
    Some(OperationGeometry {
        kind: SymmetryOperationKind::ImproperRotation,
        order,
        power,
        axis,
    })
}

/// Largest absolute entry of `a - b`.
pub fn matrix_distance(a: &Matrix3<f64>, b: &Matrix3<f64>) -> f64 {
    (a - b).abs().max()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_describe_proper_rotations() {
        let z = Vector3::z();
        let c3 = describe_matrix(&rotation_matrix(&z, 2.0 * PI / 3.0), 1e-6).unwrap();
        assert_eq!(c3.kind, SymmetryOperationKind::ProperRotation);
        assert_eq!((c3.order, c3.power), (3, 1));
        assert!((c3.axis - z).norm() < TOL);

        let c3_2 = describe_matrix(&rotation_matrix(&z, 4.0 * PI / 3.0), 1e-6).unwrap();
        assert_eq!((c3_2.order, c3_2.power), (3, 2));
        assert!((c3_2.axis - z).norm() < TOL);

        // Same operation through the opposite axis
        let flipped = describe_matrix(&rotation_matrix(&-z, 2.0 * PI / 3.0), 1e-6).unwrap();
        assert_eq!((flipped.order, flipped.power), (3, 2));

        let c2 =
            describe_matrix(&rotation_matrix(&Vector3::new(1.0, -1.0, 0.0), PI), 1e-6).unwrap();
        assert_eq!((c2.order, c2.power), (2, 1));
        assert!(c2.axis.x > 0.0);
    }

    #[test]
    fn test_describe_improper_operations() {
        let z = Vector3::z();
        let inversion = describe_matrix(&-Matrix3::identity(), 1e-6).unwrap();
        assert_eq!(inversion.kind, SymmetryOperationKind::Inversion);

        let sigma = describe_matrix(&reflection_matrix(&Vector3::y()), 1e-6).unwrap();
        assert_eq!(sigma.kind, SymmetryOperationKind::Reflection);
        assert!((sigma.axis - Vector3::y()).norm() < TOL);

        let s4 = describe_matrix(&improper_rotation_matrix(&z, PI / 2.0), 1e-6).unwrap();
        assert_eq!(s4.kind, SymmetryOperationKind::ImproperRotation);
        assert_eq!((s4.order, s4.power), (4, 1));

        let s4_3 = describe_matrix(&improper_rotation_matrix(&z, 3.0 * PI / 2.0), 1e-6).unwrap();
        assert_eq!((s4_3.order, s4_3.power), (4, 3));

        // σ·C3^5 = σ·C3^2
        let s3_5 = describe_matrix(&improper_rotation_matrix(&z, 4.0 * PI / 3.0), 1e-6).unwrap();
        assert_eq!((s3_5.order, s3_5.power), (3, 5));
    }

    #[test]
    fn test_operation_matrix_round_trips_geometry() {
        let axis = Vector3::new(1.0, 1.0, 1.0).normalize();
        let m = rotation_matrix(&axis, 2.0 * PI / 3.0);
        let geometry = describe_matrix(&m, 1e-6).unwrap();
        let op = SymmetryOperation::new(&geometry, Orientation::None, 0);
        assert!(matrix_distance(&op.matrix(), &m) < TOL);
        assert!(op.is_proper());
    }
}
