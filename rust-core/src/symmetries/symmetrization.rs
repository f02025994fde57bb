use log::debug;
use nalgebra::Vector3;

use crate::config::Thresholds;
use crate::error::{ErrorKind, MsymError, Result};
use crate::symmetries::equivalence_sets::EquivalenceSets;
use crate::symmetries::point_groups::PointGroup;
use crate::symmetries::structure::Structure;

/// Symmetrized element coordinates and the accumulated displacement.
#[derive(Debug, Clone, PartialEq)]
pub struct Symmetrized {
    pub coordinates: Vec<Vector3<f64>>,
    /// Root of the summed relative change in distance from the center.
    pub error: f64,
}

/// Replace every element by the average of the images that the group maps
/// onto its position, so that the result is exactly invariant.
///
/// Linear groups first project the structure onto their axis.
pub fn symmetrize(
    structure: &Structure,
    group: &PointGroup,
    equivalence: &EquivalenceSets,
    thresholds: &Thresholds,
) -> Result<Symmetrized> {
    let order = group.order();
    let axis = group.principal_axis();
    let positions: Vec<Vector3<f64>> = if group.group_type().is_linear() {
        structure
            .positions()
            .iter()
            .map(|r| axis * r.dot(&axis))
            .collect()
    } else {
        structure.positions().to_vec()
    };

    let mut symmetric = positions.clone();
    for set in equivalence.sets() {
        if set.len() > order {
            return Err(MsymError::new(
                ErrorKind::SymmetrizationError,
                format!(
                    "Equivalence set of {} elements exceeds the order {} of {}",
                    set.len(),
                    order,
                    group.name()
                ),
            ));
        }
        let mut sums = vec![Vector3::zeros(); set.len()];
        for (matrix, permutation) in group.matrices().iter().zip(equivalence.permutations()) {
            for &i in set {
                let target = set
                    .iter()
                    .position(|&j| j == permutation[i])
                    .ok_or_else(|| {
                        MsymError::new(
                            ErrorKind::InvalidEquivalenceSet,
                            format!("Element {} is mapped out of its equivalence set", i),
                        )
                    })?;
                sums[target] += matrix * positions[i];
            }
        }
        for (k, &i) in set.iter().enumerate() {
            symmetric[i] = sums[k] / order as f64;
        }
    }

    let zero = structure.tolerance(thresholds.zero);
    let mut error = 0.0;
    for set in equivalence.sets() {
        for &i in set {
            let before = structure.positions()[i].norm();
            let after = symmetric[i].norm();
            if set.len() == 1 && before <= zero {
                continue;
            }
            if before > 0.0 {
                error += (before - after) / before;
            }
        }
    }
    let error = error.max(0.0).sqrt();
    debug!("Symmetrized {} elements in {}, error {:e}", structure.len(), group.name(), error);

    Ok(Symmetrized {
        coordinates: symmetric.iter().map(|r| structure.to_coordinates(r)).collect(),
        error,
    })
}
