// ============================================
// Grid Pos - Целочисленная координата решётки
// ============================================

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// Точка бесконечной целочисленной решётки
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridPos {
    pub const ZERO: GridPos = GridPos { x: 0, y: 0, z: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn splat(v: i32) -> Self {
        Self { x: v, y: v, z: v }
    }

    #[inline]
    pub fn from_array(arr: [i32; 3]) -> Self {
        Self { x: arr[0], y: arr[1], z: arr[2] }
    }

    #[inline]
    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn axis(self, axis: usize) -> i32 {
        match axis {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => panic!("axis {} out of range", axis),
        }
    }

    #[inline]
    pub fn map(self, f: impl Fn(i32) -> i32) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z))
    }

    /// Деление с округлением вниз: (-1, -7, -8) / 8 = (-1, -1, -1)
    #[inline]
    pub fn div_floor(self, d: i32) -> Self {
        self.map(|v| v.div_euclid(d))
    }

    #[inline]
    pub fn rem_floor(self, d: i32) -> Self {
        self.map(|v| v.rem_euclid(d))
    }

    /// Выровнять вниз к кратному `d`
    #[inline]
    pub fn align_down(self, d: i32) -> Self {
        self.div_floor(d) * d
    }

    /// Все компоненты в [min, max)
    #[inline]
    pub fn inside(self, min: GridPos, max: GridPos) -> bool {
        self.x >= min.x && self.x < max.x
            && self.y >= min.y && self.y < max.y
            && self.z >= min.z && self.z < max.z
    }

    #[inline]
    pub fn to_f64(self) -> [f64; 3] {
        [self.x as f64, self.y as f64, self.z as f64]
    }
}

impl Add for GridPos {
    type Output = GridPos;
    #[inline]
    fn add(self, o: GridPos) -> GridPos {
        GridPos::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for GridPos {
    type Output = GridPos;
    #[inline]
    fn sub(self, o: GridPos) -> GridPos {
        GridPos::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<i32> for GridPos {
    type Output = GridPos;
    #[inline]
    fn mul(self, s: i32) -> GridPos {
        self.map(|v| v * s)
    }
}

impl Neg for GridPos {
    type Output = GridPos;
    #[inline]
    fn neg(self) -> GridPos {
        self.map(|v| -v)
    }
}

impl From<[i32; 3]> for GridPos {
    fn from(arr: [i32; 3]) -> Self {
        Self::from_array(arr)
    }
}
