// ============================================
// Root Node - Корневой регион индекса
// ============================================
//
// Плоский массив слотов R³ вместо HashMap внутри региона:
// index = z * R² + y * R + x, O(1) доступ без хеширования.
// Пустой слот = блок не активен.

use crate::grid::block::{Block, Node};

#[derive(Clone)]
pub(crate) struct RootNode<N> {
    /// None = блока нет
    slots: Vec<Option<Box<Block<N>>>>,
    /// Количество занятых слотов (для быстрой проверки is_empty)
    block_count: usize,
}

impl<N: Node> RootNode<N> {
    pub fn new(volume: usize) -> Self {
        Self {
            slots: (0..volume).map(|_| None).collect(),
            block_count: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block_count == 0
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&Block<N>> {
        self.slots[slot].as_deref()
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Block<N>> {
        self.slots[slot].as_deref_mut()
    }

    /// Получить или создать блок в слоте
    pub fn get_or_insert_with(&mut self, slot: usize, create: impl FnOnce() -> Block<N>) -> &mut Block<N> {
        let entry = &mut self.slots[slot];
        if entry.is_none() {
            *entry = Some(Box::new(create()));
            self.block_count += 1;
        }
        match entry.as_deref_mut() {
            Some(block) => block,
            None => unreachable!("slot filled above"),
        }
    }

    /// Положить блок, вернув прежний
    pub fn insert(&mut self, slot: usize, block: Block<N>) -> Option<Box<Block<N>>> {
        let previous = self.slots[slot].replace(Box::new(block));
        if previous.is_none() {
            self.block_count += 1;
        }
        previous
    }

    /// Оставить только блоки, для которых `keep` = true. Возвращает число удалённых.
    pub fn retain(&mut self, mut keep: impl FnMut(&Block<N>) -> bool) -> usize {
        let mut removed = 0;
        for slot in self.slots.iter_mut() {
            if let Some(block) = slot.as_deref() {
                if !keep(block) {
                    *slot = None;
                    removed += 1;
                }
            }
        }
        self.block_count -= removed;
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block<N>> {
        self.slots.iter().filter_map(|s| s.as_deref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block<N>> {
        self.slots.iter_mut().filter_map(|s| s.as_deref_mut())
    }
}
