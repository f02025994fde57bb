use std::f64::consts::PI;

use nalgebra::{DMatrix, Matrix3, Vector3};

use crate::error::{ErrorKind, MsymError, Result};

/// Associated Legendre function P_l^m(x) without the Condon-Shortley phase.
fn associated_legendre(l: u32, m: u32, x: f64) -> f64 {
    let sin_theta = ((1.0 - x) * (1.0 + x)).max(0.0).sqrt();
    let mut p_mm = 1.0;
    let mut odd = 1.0;
    for _ in 0..m {
        p_mm *= odd * sin_theta;
        odd += 2.0;
    }
    if l == m {
        return p_mm;
    }
    let mut p_m1 = x * (2 * m + 1) as f64 * p_mm;
    if l == m + 1 {
        return p_m1;
    }
    for ll in (m + 2)..=l {
        let p_ll = (x * (2 * ll - 1) as f64 * p_m1 - (ll + m - 1) as f64 * p_mm) / (ll - m) as f64;
        p_mm = p_m1;
        p_m1 = p_ll;
    }
    p_m1
}

fn factorial_ratio(l: u32, m: u32) -> f64 {
    // (l - m)! / (l + m)!
    ((l - m + 1)..=(l + m)).fold(1.0, |acc, k| acc / k as f64)
}

/// Orthonormal real spherical harmonic Y_lm at the direction of `r`.
///
/// Positive `m` uses cos(mφ), negative `m` sin(|m|φ).
pub fn real_spherical_harmonic(l: u32, m: i32, r: &Vector3<f64>) -> f64 {
    let norm = r.norm();
    if norm == 0.0 {
        return if l == 0 { (1.0 / (4.0 * PI)).sqrt() } else { 0.0 };
    }
    let cos_theta = r.z / norm;
    let phi = r.y.atan2(r.x);
    let am = m.unsigned_abs();
    let normalization = ((2 * l + 1) as f64 / (4.0 * PI) * factorial_ratio(l, am)).sqrt();
    let legendre = associated_legendre(l, am, cos_theta);
    match m {
        0 => normalization * legendre,
        m if m > 0 => 2f64.sqrt() * normalization * legendre * (am as f64 * phi).cos(),
        _ => 2f64.sqrt() * normalization * legendre * (am as f64 * phi).sin(),
    }
}

/// Quasi-uniform points on the unit sphere.
fn fibonacci_sphere(count: usize) -> Vec<Vector3<f64>> {
    let golden_angle = PI * (3.0 - 5f64.sqrt());
    (0..count)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
            let radius = (1.0 - z * z).sqrt();
            let phi = golden_angle * i as f64;
            Vector3::new(radius * phi.cos(), radius * phi.sin(), z)
        })
        .collect()
}

/// Matrix W with Y_m(g⁻¹ r) = Σ_m' Y_m'(r) W[m' + l, m + l] for an orthogonal `g`.
///
/// Obtained by least squares over sample directions.
pub fn transformation_matrix(l: u32, g: &Matrix3<f64>) -> Result<DMatrix<f64>> {
    let dimension = (2 * l + 1) as usize;
    let samples = fibonacci_sphere((6 * dimension).max(32));
    let inverse = g.transpose();
    let magnetic = |column: usize| column as i32 - l as i32;

    let a = DMatrix::from_fn(samples.len(), dimension, |i, j| {
        real_spherical_harmonic(l, magnetic(j), &samples[i])
    });
    let b = DMatrix::from_fn(samples.len(), dimension, |i, j| {
        real_spherical_harmonic(l, magnetic(j), &(inverse * samples[i]))
    });
    a.svd(true, true).solve(&b, 1e-12).map_err(|e| {
        MsymError::new(
            ErrorKind::SubspaceError,
            format!("Could not transform spherical harmonics with l = {}: {}", l, e),
        )
    })
}
