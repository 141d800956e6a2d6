// ============================================
// Block Layout - Геометрия блока
// ============================================
//
// Общая для всех блоков хранилища раскладка:
// L узлов ядра + D слоёв дилатации с каждой стороны.
// Хранилище (L + 2D)³, индексация ndshape (x самый быстрый).

use std::fmt;

use ndshape::{RuntimeShape, Shape};

use crate::grid::coord::bits::{is_power_of_two, log2int};
use crate::grid::coord::{GridPos, Region3};

pub struct BlockLayout {
    size: i32,
    dilation: i32,
    extent: i32,
    log2_size: u32,
    shape: RuntimeShape<u32, 3>,
}

impl BlockLayout {
    pub fn new(size: u32, dilation: u32) -> Self {
        assert!(is_power_of_two(size as u64), "block size {} is not a power of two", size);
        assert!(
            2 * dilation <= size,
            "dilation {} exceeds half of block size {}",
            dilation,
            size
        );
        let extent = size + 2 * dilation;
        Self {
            size: size as i32,
            dilation: dilation as i32,
            extent: extent as i32,
            log2_size: log2int(size as u64),
            shape: RuntimeShape::<u32, 3>::new([extent, extent, extent]),
        }
    }

    /// Ребро ядра L
    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Дилатация D
    #[inline]
    pub fn dilation(&self) -> i32 {
        self.dilation
    }

    /// L + 2D
    #[inline]
    pub fn extent(&self) -> i32 {
        self.extent
    }

    #[inline]
    pub fn log2_size(&self) -> u32 {
        self.log2_size
    }

    /// Узлов в хранилище блока, включая дилатацию
    #[inline]
    pub fn num_nodes(&self) -> usize {
        (self.extent as usize).pow(3)
    }

    /// Ядро [0, L)³ в локальных координатах
    #[inline]
    pub fn interior(&self) -> Region3 {
        Region3::cube(0, self.size)
    }

    /// Всё хранилище [-D, L+D)³ в локальных координатах
    #[inline]
    pub fn storage(&self) -> Region3 {
        Region3::cube(-self.dilation, self.size + self.dilation)
    }

    /// Локальная координата в пределах хранилища?
    #[inline]
    pub fn covers_local(&self, p: GridPos) -> bool {
        let lo = -self.dilation;
        let hi = self.size + self.dilation;
        p.x >= lo && p.x < hi && p.y >= lo && p.y < hi && p.z >= lo && p.z < hi
    }

    /// Линейный индекс; вне [-D, L+D) - паника
    #[inline]
    pub fn linearize_local(&self, p: GridPos) -> usize {
        assert!(
            self.covers_local(p),
            "local coordinate {:?} outside block storage [{}, {})",
            p,
            -self.dilation,
            self.size + self.dilation
        );
        let d = self.dilation;
        self.shape.linearize([(p.x + d) as u32, (p.y + d) as u32, (p.z + d) as u32]) as usize
    }

    #[inline]
    pub fn delinearize(&self, index: usize) -> GridPos {
        let [x, y, z] = self.shape.delinearize(index as u32);
        GridPos::new(x as i32, y as i32, z as i32) - GridPos::splat(self.dilation)
    }

    pub fn same_geometry(&self, other: &BlockLayout) -> bool {
        self.size == other.size && self.dilation == other.dilation
    }
}

impl fmt::Debug for BlockLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockLayout")
            .field("size", &self.size)
            .field("dilation", &self.dilation)
            .finish()
    }
}
