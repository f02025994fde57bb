use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use nalgebra::{Matrix3, Vector3};

use crate::config::MATRIX_TOLERANCE;
use crate::error::{ErrorKind, MsymError, Result};
use crate::symmetries::symmetry_operations::{
    describe_matrix, improper_rotation_matrix, matrix_distance, reflection_matrix,
    rotation_matrix, Orientation, OperationGeometry, SymmetryOperation, SymmetryOperationKind,
};

/// Largest principal axis order accepted in a point group name.
pub const MAX_NAMED_ORDER: u32 = 60;

const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Point group family in Schoenflies notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointGroupKind {
    Ci,
    Cs,
    Cn,
    Cnv,
    Cnh,
    Dn,
    Dnh,
    Dnd,
    S2n,
    T,
    Td,
    Th,
    O,
    Oh,
    I,
    Ih,
    Kh,
}

/// A point group type: family plus principal order.
///
/// `n` is the principal axis order for the axial families (the S order for
/// `S2n`) and 0 for the linear groups C0v / D0h and the polyhedral groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointGroupType {
    kind: PointGroupKind,
    n: u32,
}

impl PointGroupType {
    pub fn new(kind: PointGroupKind, n: u32) -> Result<Self> {
        let valid = match kind {
            PointGroupKind::Cn => (1..=MAX_NAMED_ORDER).contains(&n),
            PointGroupKind::Cnv | PointGroupKind::Dnh => {
                n == 0 || (2..=MAX_NAMED_ORDER).contains(&n)
            }
            PointGroupKind::Cnh | PointGroupKind::Dn | PointGroupKind::Dnd => {
                (2..=MAX_NAMED_ORDER).contains(&n)
            }
            PointGroupKind::S2n => n >= 4 && n % 2 == 0 && n <= 2 * MAX_NAMED_ORDER,
            _ => n == 0,
        };
        if !valid {
            return Err(MsymError::new(
                ErrorKind::InvalidPointGroup,
                format!("Invalid order {} for point group family {:?}", n, kind),
            ));
        }
        Ok(Self { kind, n })
    }

    pub fn kind(&self) -> PointGroupKind {
        self.kind
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    /// True for C0v and D0h.
    pub fn is_linear(&self) -> bool {
        matches!(self.kind, PointGroupKind::Cnv | PointGroupKind::Dnh) && self.n == 0
    }

    /// Number of operations in the finite group used to represent this type.
    ///
    /// Linear groups are represented by C2v / D2h and Kh by Oh.
    pub fn order(&self) -> usize {
        let n = self.n as usize;
        match self.kind {
            PointGroupKind::Ci | PointGroupKind::Cs => 2,
            PointGroupKind::Cn => n,
            PointGroupKind::Cnv if n == 0 => 4,
            PointGroupKind::Dnh if n == 0 => 8,
            PointGroupKind::Cnv | PointGroupKind::Cnh | PointGroupKind::Dn => 2 * n,
            PointGroupKind::Dnh | PointGroupKind::Dnd => 4 * n,
            PointGroupKind::S2n => n,
            PointGroupKind::T => 12,
            PointGroupKind::Td | PointGroupKind::Th | PointGroupKind::O => 24,
            PointGroupKind::Oh | PointGroupKind::Kh => 48,
            PointGroupKind::I => 60,
            PointGroupKind::Ih => 120,
        }
    }

    /// Generators of the group in its standard frame: principal axis along z,
    /// the first C2' axis (or σv plane) along x.
    fn generators(&self) -> Vec<Matrix3<f64>> {
        let z = Vector3::z();
        let x = Vector3::x();
        // Linear groups use the n = 2 representation
        let n = if self.is_linear() { 2 } else { self.n.max(1) };
        let cn = rotation_matrix(&z, 2.0 * PI / n as f64);
        let sigma_h = reflection_matrix(&z);
        let sigma_v = reflection_matrix(&Vector3::y());
        let c2_x = rotation_matrix(&x, PI);
        let diagonal = Vector3::new(1.0, 1.0, 1.0);
        let c3_diagonal = rotation_matrix(&diagonal, 2.0 * PI / 3.0);
        let c2_z = rotation_matrix(&z, PI);
        let c4_z = rotation_matrix(&z, PI / 2.0);
        let inversion = -Matrix3::identity();

        match self.kind {
            PointGroupKind::Ci => vec![inversion],
            PointGroupKind::Cs => vec![sigma_h],
            PointGroupKind::Cn => vec![cn],
            PointGroupKind::Cnv => vec![cn, sigma_v],
            PointGroupKind::Cnh => vec![cn, sigma_h],
            PointGroupKind::Dn => vec![cn, c2_x],
            PointGroupKind::Dnh => vec![cn, c2_x, sigma_h],
            PointGroupKind::Dnd => {
                // σd bisects the C2' axes at 0 and π/n
                let half = PI / (2.0 * n as f64);
                let normal = Vector3::new(-half.sin(), half.cos(), 0.0);
                vec![cn, c2_x, reflection_matrix(&normal)]
            }
            PointGroupKind::S2n => vec![improper_rotation_matrix(&z, 2.0 * PI / n as f64)],
            PointGroupKind::T => vec![c2_z, c3_diagonal],
            PointGroupKind::Td => vec![
                c2_z,
                c3_diagonal,
                reflection_matrix(&Vector3::new(1.0, -1.0, 0.0)),
            ],
            PointGroupKind::Th => vec![c2_z, c3_diagonal, inversion],
            PointGroupKind::O => vec![c4_z, c3_diagonal],
            PointGroupKind::Oh | PointGroupKind::Kh => vec![c4_z, c3_diagonal, inversion],
            PointGroupKind::I | PointGroupKind::Ih => {
                let c5 = rotation_matrix(&Vector3::new(0.0, 1.0, GOLDEN_RATIO), 2.0 * PI / 5.0);
                let mut generators = vec![c5, c3_diagonal];
                if self.kind == PointGroupKind::Ih {
                    generators.push(inversion);
                }
                generators
            }
        }
    }

    /// All operation matrices in the standard frame.
    pub(crate) fn standard_matrices(&self) -> Result<Vec<Matrix3<f64>>> {
        let matrices = closure(&self.generators(), MATRIX_TOLERANCE.sqrt(), self.order())
            .ok_or_else(|| {
                MsymError::new(
                    ErrorKind::InvalidPointGroup,
                    format!("Generators of {} do not close", self),
                )
            })?;
        if matrices.len() != self.order() {
            return Err(MsymError::new(
                ErrorKind::InvalidPointGroup,
                format!(
                    "Generated {} operations for {}, expected {}",
                    matrices.len(),
                    self,
                    self.order()
                ),
            ));
        }
        Ok(matrices)
    }

    /// Orientation of an operation expressed in the standard frame.
    fn orientation(&self, geometry: &OperationGeometry) -> Orientation {
        let a = geometry.axis;
        let along_z = a.z.abs() > 1.0 - 1e-6;
        let in_plane = a.z.abs() < 1e-6;
        let along_coordinate_axis = a.iter().any(|c| c.abs() > 1.0 - 1e-6);
        let alternating = |direction: Vector3<f64>| {
            if self.n == 0 || self.n % 2 == 1 || self.kind == PointGroupKind::Dnd {
                return Orientation::Vertical;
            }
            let step = PI / self.n as f64;
            let angle = direction.y.atan2(direction.x).rem_euclid(PI);
            let k = (angle / step).round() as u64 % self.n as u64;
            if k % 2 == 0 {
                Orientation::Vertical
            } else {
                Orientation::Dihedral
            }
        };

        match geometry.kind {
            SymmetryOperationKind::ProperRotation if geometry.order == 2 && !along_z => {
                match self.kind {
                    PointGroupKind::Dn | PointGroupKind::Dnh | PointGroupKind::Dnd if in_plane => {
                        alternating(a)
                    }
                    PointGroupKind::O | PointGroupKind::Oh | PointGroupKind::Kh
                        if !along_coordinate_axis =>
                    {
                        Orientation::Vertical
                    }
                    _ => Orientation::None,
                }
            }
            SymmetryOperationKind::Reflection => match self.kind {
                PointGroupKind::Cs | PointGroupKind::Cnh => Orientation::Horizontal,
                PointGroupKind::Dnh if along_z => Orientation::Horizontal,
                PointGroupKind::Cnv | PointGroupKind::Dnh if in_plane => {
                    alternating(Vector3::z().cross(&a))
                }
                PointGroupKind::Dnd | PointGroupKind::Td => Orientation::Dihedral,
                PointGroupKind::Th | PointGroupKind::Oh | PointGroupKind::Kh => {
                    if along_coordinate_axis {
                        Orientation::Horizontal
                    } else {
                        Orientation::Dihedral
                    }
                }
                _ => Orientation::None,
            },
            _ => Orientation::None,
        }
    }
}

impl fmt::Display for PointGroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.n;
        match self.kind {
            PointGroupKind::Ci => write!(f, "Ci"),
            PointGroupKind::Cs => write!(f, "Cs"),
            PointGroupKind::Cn => write!(f, "C{}", n),
            PointGroupKind::Cnv => write!(f, "C{}v", n),
            PointGroupKind::Cnh => write!(f, "C{}h", n),
            PointGroupKind::Dn => write!(f, "D{}", n),
            PointGroupKind::Dnh => write!(f, "D{}h", n),
            PointGroupKind::Dnd => write!(f, "D{}d", n),
            PointGroupKind::S2n => write!(f, "S{}", n),
            PointGroupKind::T => write!(f, "T"),
            PointGroupKind::Td => write!(f, "Td"),
            PointGroupKind::Th => write!(f, "Th"),
            PointGroupKind::O => write!(f, "O"),
            PointGroupKind::Oh => write!(f, "Oh"),
            PointGroupKind::I => write!(f, "I"),
            PointGroupKind::Ih => write!(f, "Ih"),
            PointGroupKind::Kh => write!(f, "Kh"),
        }
    }
}

impl FromStr for PointGroupType {
    type Err = MsymError;

    /// Parse a Schoenflies symbol such as `C2v`, `D6h`, `S4`, `Td` or `D0h`.
    fn from_str(name: &str) -> Result<Self> {
        let invalid = || {
            MsymError::new(
                ErrorKind::InvalidPointGroup,
                format!("Invalid point group name {}", name),
            )
        };
        let fixed = match name {
            "Ci" | "S2" => Some(PointGroupKind::Ci),
            "Cs" | "C1h" | "C1v" => Some(PointGroupKind::Cs),
            "T" => Some(PointGroupKind::T),
            "Td" => Some(PointGroupKind::Td),
            "Th" => Some(PointGroupKind::Th),
            "O" => Some(PointGroupKind::O),
            "Oh" => Some(PointGroupKind::Oh),
            "I" => Some(PointGroupKind::I),
            "Ih" => Some(PointGroupKind::Ih),
            "Kh" => Some(PointGroupKind::Kh),
            _ => None,
        };
        if let Some(kind) = fixed {
            return Self::new(kind, 0);
        }

        let mut chars = name.chars();
        let family = chars.next().ok_or_else(invalid)?;
        let rest = chars.as_str();
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(invalid());
        }
        let n: u32 = rest[..digits_end].parse().map_err(|_| invalid())?;
        let kind = match (family, &rest[digits_end..]) {
            ('C', "") => PointGroupKind::Cn,
            ('C', "v") => PointGroupKind::Cnv,
            ('C', "h") => PointGroupKind::Cnh,
            ('D', "") => PointGroupKind::Dn,
            ('D', "h") => PointGroupKind::Dnh,
            ('D', "d") => PointGroupKind::Dnd,
            ('S', "") => PointGroupKind::S2n,
            _ => return Err(invalid()),
        };
        Self::new(kind, n).map_err(|_| invalid())
    }
}

/// Close a set of generators under multiplication.
///
/// Returns `None` when more than `limit` distinct matrices are produced.
pub(crate) fn closure(
    generators: &[Matrix3<f64>],
    tolerance: f64,
    limit: usize,
) -> Option<Vec<Matrix3<f64>>> {
    let mut elements = vec![Matrix3::identity()];
    let mut frontier = 0;
    while frontier < elements.len() {
        let current = elements[frontier];
        for generator in generators {
            let product = generator * current;
            if !elements
                .iter()
                .any(|m| matrix_distance(m, &product) < tolerance)
            {
                if elements.len() == limit {
                    return None;
                }
                elements.push(product);
            }
        }
        frontier += 1;
    }
    Some(elements)
}

fn position_of(matrices: &[Matrix3<f64>], target: &Matrix3<f64>) -> Option<usize> {
    matrices
        .iter()
        .position(|m| matrix_distance(m, target) < MATRIX_TOLERANCE.sqrt())
}

/// A point group instantiated in the frame of a concrete structure.
#[derive(Debug, Clone)]
pub struct PointGroup {
    group_type: PointGroupType,
    frame: Matrix3<f64>,
    matrices: Vec<Matrix3<f64>>,
    operations: Vec<SymmetryOperation>,
    class_count: usize,
}

impl PointGroup {
    /// Build the group in `frame`, whose columns are the standard x, y and z
    /// axes expressed in structure coordinates.
    ///
    /// Operations are ordered so that conjugacy classes are contiguous, with
    /// the identity first.
    pub fn new(group_type: PointGroupType, frame: Matrix3<f64>) -> Result<Self> {
        let standard = group_type.standard_matrices()?;
        let mut entries = Vec::with_capacity(standard.len());
        for matrix in &standard {
            let geometry = describe_matrix(matrix, 1e-6).ok_or_else(|| {
                MsymError::new(
                    ErrorKind::InvalidPointGroup,
                    format!("Unrecognized operation generated for {}", group_type),
                )
            })?;
            let orientation = group_type.orientation(&geometry);
            entries.push((*matrix, geometry, orientation));
        }

        entries.sort_by(|a, b| {
            operation_sort_key(&a.1, a.2).compare(&operation_sort_key(&b.1, b.2))
        });

        // Classes numbered by first appearance, then grouped
        let sorted: Vec<Matrix3<f64>> = entries.iter().map(|(m, _, _)| *m).collect();
        let mut class_of = vec![usize::MAX; sorted.len()];
        let mut class_count = 0;
        for i in 0..sorted.len() {
            if class_of[i] != usize::MAX {
                continue;
            }
            for h in &sorted {
                let conjugate = h * sorted[i] * h.transpose();
                if let Some(j) = position_of(&sorted, &conjugate) {
                    class_of[j] = class_count;
                }
            }
            class_count += 1;
        }
        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by_key(|&i| class_of[i]);

        let mut matrices = Vec::with_capacity(entries.len());
        let mut operations = Vec::with_capacity(entries.len());
        for i in order {
            let (matrix, geometry, orientation) = &entries[i];
            let in_frame = OperationGeometry {
                axis: frame * geometry.axis,
                ..*geometry
            };
            matrices.push(frame * matrix * frame.transpose());
            operations.push(SymmetryOperation::new(&in_frame, *orientation, class_of[i]));
        }

        Ok(Self {
            group_type,
            frame,
            matrices,
            operations,
            class_count,
        })
    }

    pub fn group_type(&self) -> PointGroupType {
        self.group_type
    }

    pub fn name(&self) -> String {
        self.group_type.to_string()
    }

    pub fn order(&self) -> usize {
        self.operations.len()
    }

    pub fn frame(&self) -> &Matrix3<f64> {
        &self.frame
    }

    pub fn principal_axis(&self) -> Vector3<f64> {
        self.frame.column(2).into_owned()
    }

    pub fn operations(&self) -> &[SymmetryOperation] {
        &self.operations
    }

    /// Operation matrices in structure coordinates, parallel to `operations`.
    pub fn matrices(&self) -> &[Matrix3<f64>] {
        &self.matrices
    }

    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// Number of operations in each conjugacy class.
    pub fn class_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.class_count];
        for op in &self.operations {
            sizes[op.conjugacy_class()] += 1;
        }
        sizes
    }

    /// Index of the operation whose matrix is the inverse of operation `i`.
    pub fn inverse_of(&self, i: usize) -> Option<usize> {
        position_of(&self.matrices, &self.matrices[i].transpose())
    }
}

/// Character-table style ordering of operations.
struct SortKey {
    kind: u8,
    orientation: Orientation,
    order: i64,
    power: u32,
    axis: [f64; 3],
}

impl SortKey {
    fn compare(&self, other: &Self) -> std::cmp::Ordering {
        self.kind
            .cmp(&other.kind)
            .then(self.orientation.cmp(&other.orientation))
            .then(self.order.cmp(&other.order))
            .then(self.power.cmp(&other.power))
            .then_with(|| {
                self.axis
                    .iter()
                    .zip(other.axis.iter())
                    .map(|(a, b)| b.total_cmp(a))
                    .find(|o| o.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

fn operation_sort_key(geometry: &OperationGeometry, orientation: Orientation) -> SortKey {
    let kind = match geometry.kind {
        SymmetryOperationKind::Identity => 0,
        SymmetryOperationKind::ProperRotation => 1,
        SymmetryOperationKind::Inversion => 2,
        SymmetryOperationKind::ImproperRotation => 3,
        SymmetryOperationKind::Reflection => 4,
    };
    let round = |v: f64| (v * 1e6).round() / 1e6;
    SortKey {
        kind,
        orientation,
        order: -(geometry.order as i64),
        power: geometry.power,
        axis: [round(geometry.axis.z), round(geometry.axis.x), round(geometry.axis.y)],
    }
}
