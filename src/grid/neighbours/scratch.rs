// ============================================
// ScratchPad - Плотный буфер блока с гало в 1 узел
// ============================================
//
// Покрывает [-1, L+1)³ независимо от дилатации блока.
// Гало берётся из ядра соседа, если он есть, иначе значение по умолчанию.
// Буфер переиспользуется между блоками одного потока (for_each_init).

use ndshape::{RuntimeShape, Shape};

use crate::grid::block::Node;
use crate::grid::coord::{GridPos, Region3};

use super::ancestors::Ancestors;

pub struct ScratchPad<N> {
    size: i32,
    shape: RuntimeShape<u32, 3>,
    data: Vec<N>,
}

/// Смещение соседа по оси для локальной координаты из [-1, L+1)
#[inline]
fn halo_side(v: i32, size: i32) -> i32 {
    if v < 0 {
        -1
    } else if v >= size {
        1
    } else {
        0
    }
}

impl<N: Node> ScratchPad<N> {
    /// Пустой буфер нужного размера (нули)
    pub(crate) fn empty(size: i32) -> Self {
        let extent = (size + 2) as u32;
        Self {
            size,
            shape: RuntimeShape::<u32, 3>::new([extent; 3]),
            data: vec![N::zeroed(); (extent as usize).pow(3)],
        }
    }

    /// Собрать буфер, отсутствующие соседи = 0
    pub fn new(an: &Ancestors<'_, N>) -> Self {
        Self::with_default(an, N::zeroed())
    }

    pub fn with_default(an: &Ancestors<'_, N>, default: N) -> Self {
        let mut pad = Self::empty(an.block_size());
        pad.rebuild(an, default);
        pad
    }

    /// Перезаполнить из Ancestors, не выделяя память
    pub fn rebuild(&mut self, an: &Ancestors<'_, N>, default: N) {
        let size = an.block_size();
        if size != self.size {
            *self = Self::empty(size);
        }
        let mut i = 0;
        for p in Region3::cube(-1, size + 1) {
            let offset = GridPos::new(halo_side(p.x, size), halo_side(p.y, size), halo_side(p.z, size));
            self.data[i] = match an.get(offset) {
                Some(block) => *block.node_local(p - offset * size),
                None => default,
            };
            i += 1;
        }
    }

    #[inline]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Индекс в плоском буфере для координаты из [-1, L+1)
    #[inline]
    pub fn index_of(&self, p: GridPos) -> usize {
        assert!(
            p.inside(GridPos::splat(-1), GridPos::splat(self.size + 1)),
            "scratch coordinate {:?} outside [-1, {})",
            p,
            self.size + 1
        );
        self.shape.linearize([(p.x + 1) as u32, (p.y + 1) as u32, (p.z + 1) as u32]) as usize
    }

    #[inline]
    pub fn at(&self, p: GridPos) -> N {
        self.data[self.index_of(p)]
    }

    #[inline]
    pub fn get(&self, i: i32, j: i32, k: i32) -> N {
        self.at(GridPos::new(i, j, k))
    }

    /// Плоский вид, x самый быстрый
    #[inline]
    pub fn linearized(&self) -> &[N] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::grid::block::BlockLayout;
    use crate::grid::neighbours::Connectivity;
    use crate::grid::store::BlockIndex;

    fn filled_index(size: u32) -> BlockIndex<[i32; 3]> {
        let mut index = BlockIndex::new(Arc::new(BlockLayout::new(size, 0)), 4);
        for cell in Region3::cube(-1, 2) {
            let block = index.touch_cell(cell);
            for p in block.global_region() {
                *block.node_global_mut(p) = p.to_array();
            }
        }
        index
    }

    #[test]
    fn test_scratch_matches_world_positions() {
        let index = filled_index(4);
        let center = index.get_cell(GridPos::ZERO).unwrap();
        let an = Ancestors::resolve(&index, center, Connectivity::Vertex, 0);
        let pad = ScratchPad::new(&an);
        assert_eq!(pad.linearized().len(), 6 * 6 * 6);
        for (i, p) in Region3::cube(-1, 5).iter().enumerate() {
            assert_eq!(pad.linearized()[i], p.to_array());
            assert_eq!(pad.at(p), p.to_array());
        }
    }

    #[test]
    fn test_missing_neighbours_use_default() {
        let index = filled_index(4);
        let center = index.get_cell(GridPos::ZERO).unwrap();
        // Face: рёбра и углы гало не разрешаются
        let an = Ancestors::resolve(&index, center, Connectivity::Face, 0);
        let pad = ScratchPad::with_default(&an, [-7; 3]);
        assert_eq!(pad.get(-1, 2, 2), [-1, 2, 2]);
        assert_eq!(pad.get(4, 4, 0), [-7; 3]);
        assert_eq!(pad.get(-1, -1, -1), [-7; 3]);
        assert_eq!(pad.get(3, 3, 3), [3, 3, 3]);
    }
}
