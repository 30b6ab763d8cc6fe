//! Math primitives for scene snapshots and export
//!
//! Matrices use the row/column indexing of the host scene graph:
//! `m[row][col]` with the translation in the last column. The document
//! grammar serializes matrices column-major, which the writer handles.

use serde::{Deserialize, Serialize};

/// Tolerance below which two values are considered equal for presence and
/// identity tests throughout the exporter.
pub const EPSILON: f32 = 1.0e-6;

/// 2D vector (UV coordinates, curve handles)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 3D vector (position, normal, euler angles, scale)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Self = Self { x: 1.0, y: 1.0, z: 1.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Component access by axis index (0 = x, 1 = y, 2 = z).
    pub fn component(&self, axis: usize) -> f32 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit-length copy, or the vector unchanged when its length is within
    /// EPSILON of zero.
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len <= EPSILON {
            return self;
        }
        Vec3::new(self.x / len, self.y / len, self.z / len)
    }
}

/// 4D vector (axis-angle rotation, homogeneous coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

/// Rotation quaternion stored scalar-first, matching the host scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// True when the rotation is the identity within EPSILON.
    pub fn is_identity(&self) -> bool {
        (self.w - 1.0).abs() <= EPSILON
            && self.x.abs() <= EPSILON
            && self.y.abs() <= EPSILON
            && self.z.abs() <= EPSILON
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 4x4 transformation matrix, `m[row][col]`, translation in the last column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat4 {
    pub m: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Build a matrix from rows.
    pub fn from_rows(rows: [[f32; 4]; 4]) -> Self {
        Self { m: rows }
    }

    /// Translation-only transform.
    pub fn from_translation(t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.m[0][3] = t.x;
        m.m[1][3] = t.y;
        m.m[2][3] = t.z;
        m
    }

    /// Get the translation column.
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.m[0][3], self.m[1][3], self.m[2][3])
    }

    /// Matrix product `self * other`.
    pub fn mul(&self, other: &Mat4) -> Mat4 {
        let mut result = [[0.0f32; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                result[i][j] = self.m[i][0] * other.m[0][j]
                    + self.m[i][1] * other.m[1][j]
                    + self.m[i][2] * other.m[2][j]
                    + self.m[i][3] * other.m[3][j];
            }
        }
        Mat4 { m: result }
    }

    /// Determinant of the full 4x4 matrix.
    pub fn determinant(&self) -> f32 {
        let m = &self.m;

        let s0 = m[0][0] * m[1][1] - m[1][0] * m[0][1];
        let s1 = m[0][0] * m[1][2] - m[1][0] * m[0][2];
        let s2 = m[0][0] * m[1][3] - m[1][0] * m[0][3];
        let s3 = m[0][1] * m[1][2] - m[1][1] * m[0][2];
        let s4 = m[0][1] * m[1][3] - m[1][1] * m[0][3];
        let s5 = m[0][2] * m[1][3] - m[1][2] * m[0][3];

        let c5 = m[2][2] * m[3][3] - m[3][2] * m[2][3];
        let c4 = m[2][1] * m[3][3] - m[3][1] * m[2][3];
        let c3 = m[2][1] * m[3][2] - m[3][1] * m[2][2];
        let c2 = m[2][0] * m[3][3] - m[3][0] * m[2][3];
        let c1 = m[2][0] * m[3][2] - m[3][0] * m[2][2];
        let c0 = m[2][0] * m[3][1] - m[3][0] * m[2][1];

        s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0
    }

    /// Full inverse, or `None` when the determinant is within EPSILON of
    /// zero.
    pub fn inverse(&self) -> Option<Mat4> {
        let m = &self.m;

        let s0 = m[0][0] * m[1][1] - m[1][0] * m[0][1];
        let s1 = m[0][0] * m[1][2] - m[1][0] * m[0][2];
        let s2 = m[0][0] * m[1][3] - m[1][0] * m[0][3];
        let s3 = m[0][1] * m[1][2] - m[1][1] * m[0][2];
        let s4 = m[0][1] * m[1][3] - m[1][1] * m[0][3];
        let s5 = m[0][2] * m[1][3] - m[1][2] * m[0][3];

        let c5 = m[2][2] * m[3][3] - m[3][2] * m[2][3];
        let c4 = m[2][1] * m[3][3] - m[3][1] * m[2][3];
        let c3 = m[2][1] * m[3][2] - m[3][1] * m[2][2];
        let c2 = m[2][0] * m[3][3] - m[3][0] * m[2][3];
        let c1 = m[2][0] * m[3][2] - m[3][0] * m[2][2];
        let c0 = m[2][0] * m[3][1] - m[3][0] * m[2][1];

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        if det.abs() <= EPSILON {
            return None;
        }
        let inv = 1.0 / det;

        let mut r = [[0.0f32; 4]; 4];
        r[0][0] = (m[1][1] * c5 - m[1][2] * c4 + m[1][3] * c3) * inv;
        r[0][1] = (-m[0][1] * c5 + m[0][2] * c4 - m[0][3] * c3) * inv;
        r[0][2] = (m[3][1] * s5 - m[3][2] * s4 + m[3][3] * s3) * inv;
        r[0][3] = (-m[2][1] * s5 + m[2][2] * s4 - m[2][3] * s3) * inv;

        r[1][0] = (-m[1][0] * c5 + m[1][2] * c2 - m[1][3] * c1) * inv;
        r[1][1] = (m[0][0] * c5 - m[0][2] * c2 + m[0][3] * c1) * inv;
        r[1][2] = (-m[3][0] * s5 + m[3][2] * s2 - m[3][3] * s1) * inv;
        r[1][3] = (m[2][0] * s5 - m[2][2] * s2 + m[2][3] * s1) * inv;

        r[2][0] = (m[1][0] * c4 - m[1][1] * c2 + m[1][3] * c0) * inv;
        r[2][1] = (-m[0][0] * c4 + m[0][1] * c2 - m[0][3] * c0) * inv;
        r[2][2] = (m[3][0] * s4 - m[3][1] * s2 + m[3][3] * s0) * inv;
        r[2][3] = (-m[2][0] * s4 + m[2][1] * s2 - m[2][3] * s0) * inv;

        r[3][0] = (-m[1][0] * c3 + m[1][1] * c1 - m[1][2] * c0) * inv;
        r[3][1] = (m[0][0] * c3 - m[0][1] * c1 + m[0][2] * c0) * inv;
        r[3][2] = (-m[3][0] * s3 + m[3][1] * s1 - m[3][2] * s0) * inv;
        r[3][3] = (m[2][0] * s3 - m[2][1] * s1 + m[2][2] * s0) * inv;

        Some(Mat4 { m: r })
    }

    /// Inverse when the matrix is invertible, the matrix itself otherwise.
    /// Degenerate matrices are not an error anywhere in the exporter.
    pub fn inverse_or_self(&self) -> Mat4 {
        self.inverse().unwrap_or(*self)
    }

    /// Transform a point, including the translation column.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2] * p.z + self.m[0][3],
            self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2] * p.z + self.m[1][3],
            self.m[2][0] * p.x + self.m[2][1] * p.y + self.m[2][2] * p.z + self.m[2][3],
        )
    }

    /// Transform a direction, ignoring the translation column.
    pub fn transform_direction(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z,
            self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z,
            self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z,
        )
    }

    /// Element-wise comparison against another matrix.
    pub fn differs_from(&self, other: &Mat4) -> bool {
        for i in 0..4 {
            for j in 0..4 {
                if (self.m[i][j] - other.m[i][j]).abs() > EPSILON {
                    return true;
                }
            }
        }
        false
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Convert a scalar-first quaternion to a rotation matrix.
pub fn quaternion_to_matrix(q: Quat) -> Mat4 {
    let (w, x, y, z) = (q.w, q.x, q.y, q.z);

    let xx = x * x;
    let xy = x * y;
    let xz = x * z;
    let xw = x * w;
    let yy = y * y;
    let yz = y * z;
    let yw = y * w;
    let zz = z * z;
    let zw = z * w;

    Mat4::from_rows([
        [1.0 - 2.0 * (yy + zz), 2.0 * (xy - zw), 2.0 * (xz + yw), 0.0],
        [2.0 * (xy + zw), 1.0 - 2.0 * (xx + zz), 2.0 * (yz - xw), 0.0],
        [2.0 * (xz - yw), 2.0 * (yz + xw), 1.0 - 2.0 * (xx + yy), 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_multiply() {
        let m = Mat4::IDENTITY;
        let result = m.mul(&m);

        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((result.m[i][j] - expected).abs() < 0.001);
            }
        }
    }

    #[test]
    fn test_translation_composition() {
        let a = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let b = Mat4::from_translation(Vec3::new(-4.0, 0.5, 2.0));
        let c = a.mul(&b);

        assert_eq!(c.translation(), Vec3::new(-3.0, 2.5, 5.0));
    }

    #[test]
    fn test_inverse_round_trip() {
        let mut m = Mat4::from_translation(Vec3::new(3.0, -1.0, 7.0));
        m.m[0][0] = 2.0;
        m.m[1][1] = 0.5;
        m.m[2][2] = 4.0;

        let inv = m.inverse().unwrap();
        let product = m.mul(&inv);

        assert!(!product.differs_from(&Mat4::IDENTITY));
    }

    #[test]
    fn test_inverse_singular() {
        let mut m = Mat4::IDENTITY;
        m.m[1][1] = 0.0;

        assert!(m.inverse().is_none());
        // Fallback keeps the original matrix rather than failing.
        assert_eq!(m.inverse_or_self(), m);
    }

    #[test]
    fn test_transform_point_and_direction() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(m.transform_point(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(2.0, 2.0, 3.0));
        // Directions ignore translation.
        assert_eq!(m.transform_direction(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_quaternion_identity_matrix() {
        let m = quaternion_to_matrix(Quat::IDENTITY);
        assert!(!m.differs_from(&Mat4::IDENTITY));
    }

    #[test]
    fn test_matrices_differ_by_epsilon() {
        let a = Mat4::IDENTITY;
        let mut b = Mat4::IDENTITY;
        b.m[2][3] = 5e-7;
        assert!(!a.differs_from(&b));

        b.m[2][3] = 5e-6;
        assert!(a.differs_from(&b));
    }
}
