// ============================================
// Block Index - Двухуровневый разреженный индекс
// ============================================
//
// Уровень 1: HashMap<Morton-ключ корня, RootNode>
// Уровень 2: плоский массив R³ слотов внутри корня
//
// Все координаты здесь - координаты ячеек блоков (мировая / L).

use std::collections::HashMap;
use std::sync::Arc;

use ndshape::{RuntimeShape, Shape};

use crate::grid::block::{Block, BlockLayout, Node};
use crate::grid::coord::{BlockKey, GridPos};

use super::root::RootNode;

#[derive(Clone)]
pub(crate) struct BlockIndex<N> {
    layout: Arc<BlockLayout>,
    root_blocks: i32,
    root_shape: Arc<RuntimeShape<u32, 3>>,
    roots: HashMap<BlockKey, RootNode<N>>,
}

impl<N: Node> BlockIndex<N> {
    pub fn new(layout: Arc<BlockLayout>, root_blocks: u32) -> Self {
        Self {
            layout,
            root_blocks: root_blocks as i32,
            root_shape: Arc::new(RuntimeShape::<u32, 3>::new([root_blocks; 3])),
            roots: HashMap::new(),
        }
    }

    #[inline]
    pub fn layout(&self) -> &Arc<BlockLayout> {
        &self.layout
    }

    /// (ключ корня, слот) для ячейки блока
    #[inline]
    fn locate(&self, cell: GridPos) -> (BlockKey, usize) {
        let root = cell.div_floor(self.root_blocks);
        let local = cell - root * self.root_blocks;
        let slot = self.root_shape.linearize([local.x as u32, local.y as u32, local.z as u32]);
        (BlockKey::from_cell(root), slot as usize)
    }

    #[inline]
    pub fn cell_of(&self, coord: GridPos) -> GridPos {
        coord.div_floor(self.layout.size())
    }

    #[inline]
    pub fn base_of_cell(&self, cell: GridPos) -> GridPos {
        cell * self.layout.size()
    }

    pub fn get_cell(&self, cell: GridPos) -> Option<&Block<N>> {
        let (key, slot) = self.locate(cell);
        self.roots.get(&key)?.get(slot)
    }

    pub fn get_cell_mut(&mut self, cell: GridPos) -> Option<&mut Block<N>> {
        let (key, slot) = self.locate(cell);
        self.roots.get_mut(&key)?.get_mut(slot)
    }

    /// Получить или создать блок ячейки (нулевые узлы)
    pub fn touch_cell(&mut self, cell: GridPos) -> &mut Block<N> {
        let (key, slot) = self.locate(cell);
        let volume = (self.root_blocks as usize).pow(3);
        let base = self.base_of_cell(cell);
        let layout = &self.layout;
        self.roots
            .entry(key)
            .or_insert_with(|| RootNode::new(volume))
            .get_or_insert_with(slot, || Block::new(base, layout.clone()))
    }

    /// Вставить готовый блок (призрак), вернув прежний
    pub fn insert(&mut self, block: Block<N>) -> Option<Box<Block<N>>> {
        let cell = self.cell_of(block.base_coord());
        let (key, slot) = self.locate(cell);
        let volume = (self.root_blocks as usize).pow(3);
        self.roots.entry(key).or_insert_with(|| RootNode::new(volume)).insert(slot, block)
    }

    /// Удалить блоки, для которых `keep` = false; пустые корни тоже уходят
    pub fn retain(&mut self, mut keep: impl FnMut(&Block<N>) -> bool) -> usize {
        let mut removed = 0;
        for root in self.roots.values_mut() {
            removed += root.retain(&mut keep);
        }
        self.roots.retain(|_, root| !root.is_empty());
        removed
    }

    pub fn len(&self) -> usize {
        self.roots.values().map(|r| r.block_count()).sum()
    }

    pub fn num_roots(&self) -> usize {
        self.roots.len()
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block<N>> {
        self.roots.values().flat_map(|r| r.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block<N>> {
        self.roots.values_mut().flat_map(|r| r.iter_mut())
    }

    /// Собственные (не призрачные) блоки
    pub fn owned(&self) -> Vec<&Block<N>> {
        self.iter().filter(|b| !b.is_ghost()).collect()
    }

    pub fn owned_mut(&mut self) -> Vec<&mut Block<N>> {
        self.iter_mut().filter(|b| !b.is_ghost()).collect()
    }

    pub fn owned_cells(&self) -> Vec<GridPos> {
        let size = self.layout.size();
        let mut cells: Vec<_> = self
            .iter()
            .filter(|b| !b.is_ghost())
            .map(|b| b.base_coord().div_floor(size))
            .collect();
        cells.sort_unstable();
        cells
    }
}
