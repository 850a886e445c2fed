//! 2D vector and matrix value types used by the simulation

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("cannot normalise a zero-length vector")]
    ZeroLength,
}

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    ///Returns the scaled vector.
    pub fn scale(self, scalar: f32) -> Vector2 {
        Vector2::new(self.x * scalar, self.y * scalar)
    }

    pub fn dot(self, other: Vector2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z-component of the 3D cross product; positive when `other` lies
    /// counter-clockwise of `self`.
    pub fn cross(self, other: Vector2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    ///Returns the magnitude of the vector.
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    ///Returns the normalized vector.
    pub fn unit(self) -> Result<Vector2, GeometryError> {
        let length = self.length();
        if length == 0.0 {
            return Err(GeometryError::ZeroLength);
        }
        Ok(self.scale(1.0 / length))
    }

    /// Clamps each component into `[-max, max]`.
    pub fn limit(self, max: f32) -> Vector2 {
        Vector2::new(self.x.clamp(-max, max), self.y.clamp(-max, max))
    }

    /// Clamps each component into `[0, max]`.
    pub fn limit_zero(self, max: f32) -> Vector2 {
        Vector2::new(self.x.clamp(0.0, max), self.y.clamp(0.0, max))
    }

    pub fn rotate(self, angle: f32) -> Vector2 {
        Matrix2::rotation(angle) * self
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, other: Vector2) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, other: Vector2) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;

    fn mul(self, scalar: f32) -> Vector2 {
        self.scale(scalar)
    }
}

impl MulAssign<f32> for Vector2 {
    fn mul_assign(&mut self, scalar: f32) {
        self.x *= scalar;
        self.y *= scalar;
    }
}

impl Neg for Vector2 {
    type Output = Vector2;

    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

/// Row-major 2x2 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix2 {
    pub rows: [[f32; 2]; 2],
}

impl Matrix2 {
    pub const IDENTITY: Matrix2 = Matrix2 {
        rows: [[1.0, 0.0], [0.0, 1.0]],
    };

    pub const fn new(rows: [[f32; 2]; 2]) -> Self {
        Self { rows }
    }

    /// Counter-clockwise rotation by `angle` radians.
    pub fn rotation(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new([[cos, -sin], [sin, cos]])
    }

    pub fn transpose(self) -> Self {
        let [[a, b], [c, d]] = self.rows;
        Self::new([[a, c], [b, d]])
    }

    pub fn determinant(self) -> f32 {
        let [[a, b], [c, d]] = self.rows;
        a * d - b * c
    }
}

impl Mul<Vector2> for Matrix2 {
    type Output = Vector2;

    fn mul(self, v: Vector2) -> Vector2 {
        let [[a, b], [c, d]] = self.rows;
        Vector2::new(a * v.x + b * v.y, c * v.x + d * v.y)
    }
}

impl Mul for Matrix2 {
    type Output = Matrix2;

    fn mul(self, other: Matrix2) -> Matrix2 {
        let [[a, b], [c, d]] = self.rows;
        let [[e, f], [g, h]] = other.rows;
        Matrix2::new([[a * e + b * g, a * f + b * h], [c * e + d * g, c * f + d * h]])
    }
}
