// ============================================
// Block - Куб узлов с опциональной дилатацией
// ============================================

use std::fmt;
use std::sync::Arc;

use crate::grid::coord::{GridPos, Region3};

use super::layout::BlockLayout;
use super::Node;

/// Блок решётки: владеет (L + 2D)³ узлами
#[derive(Clone)]
pub struct Block<N> {
    base_coord: GridPos,
    layout: Arc<BlockLayout>,
    nodes: Vec<N>,
    kill_requested: bool,
    /// Some(t) - призрак чужого ранга, получен на шаге t
    ghost_stamp: Option<u64>,
}

impl<N: Node> Block<N> {
    /// Новый блок с нулевыми узлами. `base_coord` кратен L.
    pub fn new(base_coord: GridPos, layout: Arc<BlockLayout>) -> Self {
        assert_eq!(
            base_coord.rem_floor(layout.size()),
            GridPos::ZERO,
            "base coordinate {:?} is not aligned to block size {}",
            base_coord,
            layout.size()
        );
        let nodes = vec![N::zeroed(); layout.num_nodes()];
        Self { base_coord, layout, nodes, kill_requested: false, ghost_stamp: None }
    }

    /// Призрак из полученных узлов
    pub(crate) fn ghost(base_coord: GridPos, layout: Arc<BlockLayout>, nodes: Vec<N>, stamp: u64) -> Self {
        assert_eq!(nodes.len(), layout.num_nodes(), "ghost node count mismatch");
        Self { base_coord, layout, nodes, kill_requested: false, ghost_stamp: Some(stamp) }
    }

    #[inline]
    pub fn base_coord(&self) -> GridPos {
        self.base_coord
    }

    #[inline]
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    #[inline]
    pub fn size(&self) -> i32 {
        self.layout.size()
    }

    #[inline]
    pub fn dilation(&self) -> i32 {
        self.layout.dilation()
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    #[inline]
    pub fn nodes_mut(&mut self) -> &mut [N] {
        &mut self.nodes
    }

    #[inline]
    pub fn linearize_local(&self, p: GridPos) -> usize {
        self.layout.linearize_local(p)
    }

    #[inline]
    pub fn linearize_global(&self, coord: GridPos) -> usize {
        self.layout.linearize_local(coord - self.base_coord)
    }

    /// Узел по локальной координате из [-D, L+D)
    #[inline]
    pub fn node_local(&self, p: GridPos) -> &N {
        &self.nodes[self.layout.linearize_local(p)]
    }

    #[inline]
    pub fn node_local_mut(&mut self, p: GridPos) -> &mut N {
        let i = self.layout.linearize_local(p);
        &mut self.nodes[i]
    }

    /// Узел по мировой координате
    #[inline]
    pub fn node_global(&self, coord: GridPos) -> &N {
        self.node_local(coord - self.base_coord)
    }

    #[inline]
    pub fn node_global_mut(&mut self, coord: GridPos) -> &mut N {
        self.node_local_mut(coord - self.base_coord)
    }

    /// Мировая координата внутри ядра блока?
    #[inline]
    pub fn contains_global(&self, coord: GridPos) -> bool {
        coord.inside(self.base_coord, self.base_coord + GridPos::splat(self.size()))
    }

    /// Мировая координата внутри хранилища (с дилатацией)?
    #[inline]
    pub fn covers_global(&self, coord: GridPos) -> bool {
        self.layout.covers_local(coord - self.base_coord)
    }

    /// Ядро в мировых координатах
    #[inline]
    pub fn global_region(&self) -> Region3 {
        self.layout.interior().translated(self.base_coord)
    }

    /// Ядро в локальных координатах
    #[inline]
    pub fn local_region(&self) -> Region3 {
        self.layout.interior()
    }

    /// Всё хранилище в локальных координатах
    #[inline]
    pub fn storage_region(&self) -> Region3 {
        self.layout.storage()
    }

    /// Обнулить все узлы
    pub fn clear(&mut self) {
        self.nodes.fill(N::zeroed());
    }

    /// Запросить удаление. Применяется после завершения прохода.
    #[inline]
    pub fn kill(&mut self) {
        self.kill_requested = true;
    }

    #[inline]
    pub fn is_killed(&self) -> bool {
        self.kill_requested
    }

    #[inline]
    pub fn is_ghost(&self) -> bool {
        self.ghost_stamp.is_some()
    }

    #[inline]
    pub fn ghost_stamp(&self) -> Option<u64> {
        self.ghost_stamp
    }
}

impl<N> fmt::Debug for Block<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("base_coord", &self.base_coord)
            .field("layout", &self.layout)
            .field("kill_requested", &self.kill_requested)
            .field("ghost_stamp", &self.ghost_stamp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dilated_block_roundtrip() {
        let layout = Arc::new(BlockLayout::new(8, 1));
        let mut block: Block<i32> = Block::new(GridPos::splat(8), layout);
        assert_eq!(block.num_nodes(), 10 * 10 * 10);
        assert_eq!(block.linearize_global(GridPos::splat(7)), 0);

        let n = 8;
        for i in -1..=n {
            for j in -1..=n {
                for k in -1..=n {
                    *block.node_global_mut(GridPos::splat(8) + GridPos::new(i, j, k)) = i * j + k;
                }
            }
        }
        for i in -1..=n {
            for j in -1..=n {
                for k in -1..=n {
                    assert_eq!(*block.node_global(GridPos::splat(8) + GridPos::new(i, j, k)), i * j + k);
                }
            }
        }
    }

    #[test]
    fn test_block_at_origin() {
        let layout = Arc::new(BlockLayout::new(8, 0));
        let mut base: Block<f32> = Block::new(GridPos::ZERO, layout);
        for p in base.global_region() {
            *base.node_global_mut(p) = (p.x + p.y * p.z) as f32;
        }
        for p in base.global_region() {
            assert_eq!(*base.node_global(p), (p.x + p.y * p.z) as f32);
        }
        assert!(base.contains_global(GridPos::new(7, 0, 3)));
        assert!(!base.contains_global(GridPos::new(8, 0, 3)));
    }

    #[test]
    #[should_panic]
    fn test_global_access_outside_panics() {
        let layout = Arc::new(BlockLayout::new(8, 0));
        let block: Block<f32> = Block::new(GridPos::ZERO, layout);
        block.node_global(GridPos::new(-1, 0, 0));
    }

    #[test]
    #[should_panic]
    fn test_unaligned_base_panics() {
        let layout = Arc::new(BlockLayout::new(8, 0));
        let _block: Block<f32> = Block::new(GridPos::new(4, 0, 0), layout);
    }

    #[test]
    fn test_kill_is_flag_only() {
        let layout = Arc::new(BlockLayout::new(4, 0));
        let mut block: Block<u32> = Block::new(GridPos::new(-4, 0, 4), layout);
        *block.node_local_mut(GridPos::new(1, 2, 3)) = 5;
        block.kill();
        assert!(block.is_killed());
        assert_eq!(*block.node_local(GridPos::new(1, 2, 3)), 5);
        block.clear();
        assert!(block.nodes().iter().all(|&v| v == 0));
    }
}
