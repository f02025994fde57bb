use std::collections::HashMap;

use log::{debug, trace};
use nalgebra::{DMatrix, SymmetricEigen};

use crate::config::Thresholds;
use crate::error::{ErrorKind, MsymError, Result};
use crate::molecule::RealSphericalHarmonic;
use crate::symmetries::equivalence_sets::EquivalenceSets;
use crate::symmetries::point_groups::PointGroup;
use crate::symmetries::spherical_harmonics::transformation_matrix;

/// Relative eigenvalue separation below which two eigenvectors of the class
/// sum operator belong to the same subspace.
const DEGENERACY_TOLERANCE: f64 = 1e-7;

/// A basis function reduced to its element index and quantum numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AtomicOrbital {
    pub element: usize,
    pub harmonic: RealSphericalHarmonic,
}

/// One symmetry-adapted subspace of the basis.
///
/// The columns of `coefficients` are orthonormal linear combinations of the
/// basis functions spanning an isotypic component: `multiplicity` copies of a
/// real irreducible representation of dimension `irrep_dimension`.
#[derive(Debug, Clone, PartialEq)]
pub struct SalcSubspace {
    characters: Vec<f64>,
    coefficients: DMatrix<f64>,
    multiplicity: usize,
    irrep_dimension: usize,
}

impl SalcSubspace {
    pub fn dimension(&self) -> usize {
        self.coefficients.ncols()
    }

    /// Character of the subspace on each conjugacy class.
    pub fn characters(&self) -> &[f64] {
        &self.characters
    }

    /// Basis functions x SALCs.
    pub fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    pub fn multiplicity(&self) -> usize {
        self.multiplicity
    }

    pub fn irrep_dimension(&self) -> usize {
        self.irrep_dimension
    }

    /// True for the component on which every operation acts trivially.
    pub fn is_totally_symmetric(&self) -> bool {
        let identity = self.characters.first().copied().unwrap_or(0.0);
        self.characters.iter().all(|c| (c - identity).abs() < 1e-6)
    }
}

fn primes(count: usize) -> Vec<u64> {
    let mut found: Vec<u64> = Vec::with_capacity(count);
    let mut candidate = 2;
    while found.len() < count {
        if found.iter().all(|p| candidate % p != 0) {
            found.push(candidate);
        }
        candidate += 1;
    }
    found
}

fn perfect_square_root(value: usize) -> Option<usize> {
    let root = (value as f64).sqrt().round() as usize;
    (root * root == value).then_some(root)
}

/// Matrix of every operation on the basis; entry `[b', b]` is the weight of
/// function `b'` in the image of function `b`.
fn representation(
    group: &PointGroup,
    equivalence: &EquivalenceSets,
    basis: &[AtomicOrbital],
    thresholds: &Thresholds,
) -> Result<Vec<DMatrix<f64>>> {
    let mut index = HashMap::with_capacity(basis.len());
    for (i, orbital) in basis.iter().enumerate() {
        if index.insert(*orbital, i).is_some() {
            return Err(MsymError::new(
                ErrorKind::InvalidBasis,
                format!(
                    "Duplicate basis function (n = {}, l = {}, m = {}) on element {}",
                    orbital.harmonic.n, orbital.harmonic.l, orbital.harmonic.m, orbital.element
                ),
            ));
        }
    }
    let max_l = basis.iter().map(|o| o.harmonic.l).max().unwrap_or(0) as u32;

    let mut matrices = Vec::with_capacity(group.order());
    for (g, (matrix, permutation)) in group
        .matrices()
        .iter()
        .zip(equivalence.permutations())
        .enumerate()
    {
        let rotations = (0..=max_l)
            .map(|l| transformation_matrix(l, matrix))
            .collect::<Result<Vec<_>>>()?;
        let mut d = DMatrix::zeros(basis.len(), basis.len());
        for (b, orbital) in basis.iter().enumerate() {
            let RealSphericalHarmonic { n, l, m } = orbital.harmonic;
            let w = &rotations[l as usize];
            for m_image in -l..=l {
                let weight = w[((m_image + l) as usize, (m + l) as usize)];
                if weight.abs() < 1e-12 {
                    continue;
                }
                let image = AtomicOrbital {
                    element: permutation[orbital.element],
                    harmonic: RealSphericalHarmonic::new(n, l, m_image),
                };
                match index.get(&image) {
                    Some(&b_image) => d[(b_image, b)] = weight,
                    None if weight.abs() > thresholds.orthogonalization => {
                        return Err(MsymError::new(
                            ErrorKind::InvalidBasis,
                            format!(
                                "Basis is not closed under operation {}: missing (n = {}, l = {}, m = {}) on element {}",
                                g, n, l, m_image, image.element
                            ),
                        ));
                    }
                    None => {}
                }
            }
        }
        matrices.push(d);
    }
    Ok(matrices)
}

/// Decompose the span of `basis` into symmetry-adapted subspaces.
///
/// The basis is diagonalized with a generic element of the class-sum algebra;
/// its eigenspaces are the isotypic components. Subspaces are ordered by
/// decreasing eigenvalue, which puts the totally symmetric one first.
pub fn generate_salc_subspaces(
    group: &PointGroup,
    equivalence: &EquivalenceSets,
    basis: &[AtomicOrbital],
    thresholds: &Thresholds,
) -> Result<Vec<SalcSubspace>> {
    if basis.is_empty() {
        return Err(MsymError::new(ErrorKind::InvalidBasis, "No basis functions"));
    }
    let representation = representation(group, equivalence, basis, thresholds)?;
    let operations = group.operations();
    let class_count = group.class_count();
    let class_sizes = group.class_sizes();

    // sqrt(p) weights are rationally independent; classes of inverse
    // operations share a weight so that the operator is symmetric
    let roots: Vec<f64> = primes(class_count).iter().map(|p| (*p as f64).sqrt()).collect();
    let mut weights = vec![0.0; class_count];
    for (g, op) in operations.iter().enumerate() {
        let class = op.conjugacy_class();
        if weights[class] != 0.0 {
            continue;
        }
        let inverse_class = group
            .inverse_of(g)
            .map_or(class, |i| operations[i].conjugacy_class());
        weights[class] = roots[class] + roots[inverse_class];
    }

    let n = basis.len();
    let mut z = DMatrix::zeros(n, n);
    for (d, op) in representation.iter().zip(operations) {
        z += d * weights[op.conjugacy_class()];
    }
    let z = (&z + z.transpose()) * 0.5;
    let eigen = SymmetricEigen::new(z);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    let scale = eigen.eigenvalues.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = DEGENERACY_TOLERANCE * scale;

    let mut groups: Vec<Vec<usize>> = Vec::new();
    for i in order {
        match groups.last_mut() {
            Some(current)
                if (eigen.eigenvalues[current[0]] - eigen.eigenvalues[i]).abs() < tolerance =>
            {
                current.push(i)
            }
            _ => groups.push(vec![i]),
        }
    }

    let representatives: Vec<usize> = (0..class_count)
        .map(|class| {
            operations
                .iter()
                .position(|op| op.conjugacy_class() == class)
                .unwrap_or(0)
        })
        .collect();

    let mut subspaces = Vec::with_capacity(groups.len());
    for columns in groups {
        let coefficients = DMatrix::from_fn(n, columns.len(), |row, k| {
            eigen.eigenvectors[(row, columns[k])]
        });
        let characters: Vec<f64> = representatives
            .iter()
            .map(|&g| (coefficients.transpose() * &representation[g] * &coefficients).trace())
            .collect();
        let norm: f64 = characters
            .iter()
            .zip(&class_sizes)
            .map(|(chi, size)| chi * chi * *size as f64)
            .sum::<f64>()
            / group.order() as f64;
        let rounded = norm.round();
        if (norm - rounded).abs() > thresholds.eigfact || rounded < 1.0 {
            return Err(MsymError::new(
                ErrorKind::SubspaceError,
                format!("Subspace character norm {} is not integral", norm),
            ));
        }
        let rounded = rounded as usize;
        // Real irreducible: norm m², complex pair: 2m²
        let multiplicity = perfect_square_root(rounded)
            .or_else(|| (rounded % 2 == 0).then(|| perfect_square_root(rounded / 2)).flatten())
            .ok_or_else(|| {
                MsymError::new(
                    ErrorKind::SubspaceError,
                    format!(
                        "Subspace character norm {} does not match an isotypic component",
                        rounded
                    ),
                )
            })?;
        if columns.len() % multiplicity != 0 {
            return Err(MsymError::new(
                ErrorKind::SubspaceError,
                format!(
                    "Subspace of dimension {} cannot hold {} copies of an irreducible representation",
                    columns.len(),
                    multiplicity
                ),
            ));
        }
        trace!(
            "Subspace of dimension {} with characters {:?}",
            columns.len(),
            characters
        );
        subspaces.push(SalcSubspace {
            irrep_dimension: columns.len() / multiplicity,
            characters,
            coefficients,
            multiplicity,
        });
    }
    debug!(
        "Generated {} subspaces for {} basis functions in {}",
        subspaces.len(),
        n,
        group.name()
    );
    Ok(subspaces)
}
