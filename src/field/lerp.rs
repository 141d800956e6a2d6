// ============================================
// Lerp Field - Плотное поле с трилинейной интерполяцией
// ============================================
//
// n³ узлов; узел idx находится в мировой точке (idx + translate) / scale.
// Обратное отображение: индекс = pos * scale - translate.

use std::ops::{Add, Mul};

use ndshape::{RuntimeShape, Shape};
use ultraviolet::DVec3;

use crate::grid::coord::{GridPos, Region3};

pub struct LerpField<T> {
    resolution: i32,
    scale: DVec3,
    translate: DVec3,
    shape: RuntimeShape<u32, 3>,
    nodes: Vec<T>,
}

impl<T: Copy + Default> LerpField<T> {
    pub fn new(resolution: u32, scale: DVec3, translate: DVec3) -> Self {
        assert!(resolution >= 2, "lerp field needs at least 2 nodes per axis, got {}", resolution);
        assert!(
            scale.x != 0.0 && scale.y != 0.0 && scale.z != 0.0,
            "lerp field scale must be non-zero, got {:?}",
            scale
        );
        Self {
            resolution: resolution as i32,
            scale,
            translate,
            shape: RuntimeShape::<u32, 3>::new([resolution; 3]),
            nodes: vec![T::default(); (resolution as usize).pow(3)],
        }
    }

    #[inline]
    pub fn resolution(&self) -> i32 {
        self.resolution
    }

    #[inline]
    pub fn scale(&self) -> DVec3 {
        self.scale
    }

    #[inline]
    pub fn translate(&self) -> DVec3 {
        self.translate
    }

    /// Индексы всех узлов [0, n)³
    #[inline]
    pub fn local_region(&self) -> Region3 {
        Region3::cube(0, self.resolution)
    }

    #[inline]
    fn linearize(&self, idx: GridPos) -> usize {
        assert!(
            self.local_region().contains(idx),
            "lerp field index {:?} outside [0, {})",
            idx,
            self.resolution
        );
        self.shape.linearize([idx.x as u32, idx.y as u32, idx.z as u32]) as usize
    }

    #[inline]
    pub fn node(&self, idx: GridPos) -> T {
        self.nodes[self.linearize(idx)]
    }

    #[inline]
    pub fn node_mut(&mut self, idx: GridPos) -> &mut T {
        let i = self.linearize(idx);
        &mut self.nodes[i]
    }

    /// Мировая позиция узла
    #[inline]
    pub fn node_pos(&self, idx: GridPos) -> DVec3 {
        let [x, y, z] = idx.to_f64();
        (DVec3::new(x, y, z) + self.translate) / self.scale
    }

    /// Заполнить все узлы функцией от мировой позиции
    pub fn fill_with(&mut self, f: impl Fn(DVec3) -> T) {
        for idx in self.local_region() {
            let value = f(self.node_pos(idx));
            *self.node_mut(idx) = value;
        }
    }
}

impl<T> LerpField<T>
where
    T: Copy + Default + Add<Output = T> + Mul<f64, Output = T>,
{
    /// Трилинейная интерполяция. Вне области - значение граничной ячейки.
    pub fn sample(&self, pos: DVec3) -> T {
        let f = pos * self.scale - self.translate;
        let last = (self.resolution - 2) as f64;

        // Ячейка и вес по оси
        let split = |v: f64| -> (i32, f64) {
            let cell = v.floor().clamp(0.0, last);
            (cell as i32, (v - cell).clamp(0.0, 1.0))
        };
        let (ix, wx) = split(f.x);
        let (iy, wy) = split(f.y);
        let (iz, wz) = split(f.z);

        let mut acc = T::default();
        for corner in 0..8 {
            let dx = corner & 1;
            let dy = (corner >> 1) & 1;
            let dz = (corner >> 2) & 1;
            let w = (if dx == 1 { wx } else { 1.0 - wx })
                * (if dy == 1 { wy } else { 1.0 - wy })
                * (if dz == 1 { wz } else { 1.0 - wz });
            acc = acc + self.node(GridPos::new(ix + dx, iy + dy, iz + dz)) * w;
        }
        acc
    }
}
