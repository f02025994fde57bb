use crate::error::{ErrorKind, MsymError, Result};
use crate::symmetries::point_groups::PointGroup;
use crate::symmetries::structure::Structure;

/// Action of a point group on the elements of a structure.
///
/// `permutations[g][i]` is the element that element `i` is carried onto by
/// operation `g`; each equivalence set is an orbit of that action, listed in
/// ascending element order.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceSets {
    permutations: Vec<Vec<usize>>,
    sets: Vec<Vec<usize>>,
}

impl EquivalenceSets {
    pub fn new(structure: &Structure, group: &PointGroup, tolerance: f64) -> Result<Self> {
        let mut permutations = Vec::with_capacity(group.order());
        for (matrix, operation) in group.matrices().iter().zip(group.operations()) {
            let permutation = structure.permutation(matrix, tolerance).ok_or_else(|| {
                MsymError::new(
                    ErrorKind::PermutationError,
                    format!(
                        "Elements are not permuted by {:?} operation of order {} in {}",
                        operation.kind(),
                        operation.order(),
                        group.name()
                    ),
                )
            })?;
            permutations.push(permutation);
        }

        let mut assigned = vec![false; structure.len()];
        let mut sets = Vec::new();
        for i in 0..structure.len() {
            if assigned[i] {
                continue;
            }
            let mut orbit: Vec<usize> = permutations.iter().map(|p| p[i]).collect();
            orbit.sort_unstable();
            orbit.dedup();
            for &j in &orbit {
                assigned[j] = true;
            }
            sets.push(orbit);
        }
        Ok(Self { permutations, sets })
    }

    pub fn permutations(&self) -> &[Vec<usize>] {
        &self.permutations
    }

    pub fn sets(&self) -> &[Vec<usize>] {
        &self.sets
    }

    /// Index of the set containing element `i`.
    pub fn set_of(&self, i: usize) -> Option<usize> {
        self.sets.iter().position(|set| set.contains(&i))
    }
}
