//! Closed-form 3×3 solve for the affine normal equations.

/// Relative determinant floor: |det| below `MIN_REL_DET · scale³` is replaced.
pub const MIN_REL_DET: f64 = 1e-9;

pub type Mat3 = [[f64; 3]; 3];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solve3 {
    pub x: [f64; 3],
    /// Determinant actually used for the division.
    pub det: f64,
    /// True if the determinant was replaced by the regularizing floor.
    pub regularized: bool,
}

pub fn det3(m: &Mat3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

fn with_column(m: &Mat3, col: usize, b: &[f64; 3]) -> Mat3 {
    let mut out = *m;
    for (row, &v) in out.iter_mut().zip(b) {
        row[col] = v;
    }
    out
}

/// Solve `m · x = b` by Cramer's rule. A near-singular `m` never divides by
/// ~0: its determinant is floored to a small value of the same sign, which
/// keeps the result finite and bounded.
pub fn solve3(m: &Mat3, b: &[f64; 3]) -> Solve3 {
    let scale = m
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(1.0_f64, f64::max);
    let floor = MIN_REL_DET * scale * scale * scale;

    let raw_det = det3(m);
    let (det, regularized) = if raw_det.is_finite() && raw_det.abs() >= floor {
        (raw_det, false)
    } else if raw_det.is_finite() && raw_det < 0.0 {
        (-floor, true)
    } else {
        (floor, true)
    };

    let mut x = [0.0; 3];
    for (col, out) in x.iter_mut().enumerate() {
        let v = det3(&with_column(m, col, b)) / det;
        *out = if v.is_finite() { v } else { 0.0 };
    }
    Solve3 { x, det, regularized }
}
