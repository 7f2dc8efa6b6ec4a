//! Minimal 3D vector used for mesh vertices, headings and gradients.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// A 3D point or direction.
///
/// Equality and hashing work on the exact IEEE bit patterns so a `Vec3`
/// can be used as a map key. `-0.0` and `+0.0` compare equal.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const Z: Self = Self { x: 0.0, y: 0.0, z: 1.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, o: Self) -> f32 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn cross(self, o: Self) -> Self {
        Self::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, o: Self) -> f32 {
        (self - o).length()
    }

    /// Unit vector in the same direction. The zero vector is returned as is.
    pub fn normalized(self) -> Self {
        self.try_normalized().unwrap_or(self)
    }

    /// Unit vector, or `None` for zero-length or non-finite input.
    pub fn try_normalized(self) -> Option<Self> {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            Some(self / len)
        } else {
            None
        }
    }

    /// Midpoint of an edge. Addition is commutative in IEEE arithmetic, so
    /// `a.midpoint(b)` and `b.midpoint(a)` are bit-identical.
    pub fn midpoint(self, o: Self) -> Self {
        (self + o) * 0.5
    }

    /// Component of `self` perpendicular to the unit vector `normal`.
    pub fn reject(self, normal: Self) -> Self {
        self - normal * self.dot(normal)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    fn key_bits(self) -> [u32; 3] {
        // fold -0.0 into +0.0
        let bits = |v: f32| if v == 0.0 { 0u32 } else { v.to_bits() };
        [bits(self.x), bits(self.y), bits(self.z)]
    }
}

impl PartialEq for Vec3 {
    fn eq(&self, other: &Self) -> bool {
        self.key_bits() == other.key_bits()
    }
}

impl Eq for Vec3 {}

impl Hash for Vec3 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_bits().hash(state);
    }
}

impl PartialOrd for Vec3 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order over bit patterns; only meaningful for canonical sorting.
impl Ord for Vec3 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key_bits().cmp(&other.key_bits())
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;
    fn div(self, k: f32) -> Self {
        Self::new(self.x / k, self.y / k, self.z / k)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}
