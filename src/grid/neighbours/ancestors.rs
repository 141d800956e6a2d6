// ============================================
// Ancestors - Соседи блока на время прохода
// ============================================
//
// Как ChunkNeighbors, только в 3D и с 27 слотами (3x3x3 смещений).
// Ссылки указывают в неизменяемый снимок индекса до прохода,
// поэтому порядок обработки блоков не влияет на результат.

use serde::{Deserialize, Serialize};

use crate::grid::block::{Block, Node};
use crate::grid::coord::GridPos;
use crate::grid::store::BlockIndex;

/// Слотов в Ancestors (3³)
pub const NEIGHBOUR_SLOTS: usize = 27;
const CENTER_SLOT: usize = 13;

/// Какие смещения считаются соседними
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// 6 соседей по граням
    Face,
    /// 18: грани + рёбра
    Edge,
    /// 26: грани + рёбра + вершины
    Vertex,
}

impl Connectivity {
    #[inline]
    fn max_manhattan(self) -> i32 {
        match self {
            Connectivity::Face => 1,
            Connectivity::Edge => 2,
            Connectivity::Vertex => 3,
        }
    }

    /// Смещение из {-1,0,1}³ входит в окрестность (центр - нет)?
    #[inline]
    pub fn admits(self, offset: GridPos) -> bool {
        let m = offset.x.abs() + offset.y.abs() + offset.z.abs();
        offset.x.abs() <= 1 && offset.y.abs() <= 1 && offset.z.abs() <= 1 && m > 0 && m <= self.max_manhattan()
    }

    /// Все смещения окрестности
    pub fn offsets(self) -> impl Iterator<Item = GridPos> {
        (0..NEIGHBOUR_SLOTS)
            .map(slot_offset)
            .filter(move |&o| self.admits(o))
    }

    pub fn count(self) -> usize {
        match self {
            Connectivity::Face => 6,
            Connectivity::Edge => 18,
            Connectivity::Vertex => 26,
        }
    }
}

/// Слот для смещения из {-1,0,1}³ (x самый быстрый)
#[inline]
pub fn offset_slot(offset: GridPos) -> usize {
    assert!(
        offset.x.abs() <= 1 && offset.y.abs() <= 1 && offset.z.abs() <= 1,
        "neighbour offset {:?} outside 3x3x3",
        offset
    );
    ((offset.x + 1) + 3 * (offset.y + 1) + 9 * (offset.z + 1)) as usize
}

#[inline]
pub fn slot_offset(slot: usize) -> GridPos {
    let s = slot as i32;
    GridPos::new(s % 3 - 1, (s / 3) % 3 - 1, s / 9 - 1)
}

/// Проверка свежести призрака. Устаревший призрак - логическая ошибка.
#[inline]
pub(crate) fn assert_fresh<N: Node>(block: &Block<N>, now: u64) {
    if let Some(stamp) = block.ghost_stamp() {
        assert!(
            stamp == now,
            "stale ghost block at {:?}: fetched at step {}, grid is at step {}; call fetch_neighbours first",
            block.base_coord(),
            stamp,
            now
        );
    }
}

/// Соседи одного уровня
pub struct Ancestors<'a, N> {
    data: [Option<&'a Block<N>>; NEIGHBOUR_SLOTS],
    connectivity: Connectivity,
}

impl<'a, N: Node> Ancestors<'a, N> {
    /// Разрешить соседей `center` в снимке `index`
    pub(crate) fn resolve(
        index: &'a BlockIndex<N>,
        center: &'a Block<N>,
        connectivity: Connectivity,
        now: u64,
    ) -> Self {
        let mut data = [None; NEIGHBOUR_SLOTS];
        data[CENTER_SLOT] = Some(center);
        let cell = index.cell_of(center.base_coord());
        for offset in connectivity.offsets() {
            if let Some(block) = index.get_cell(cell + offset) {
                assert_fresh(block, now);
                data[offset_slot(offset)] = Some(block);
            }
        }
        Self { data, connectivity }
    }

    /// Сам блок в состоянии до прохода
    #[inline]
    pub fn center(&self) -> &'a Block<N> {
        match self.data[CENTER_SLOT] {
            Some(block) => block,
            None => unreachable!("center slot is always resolved"),
        }
    }

    /// Блок по смещению; (0,0,0) = центр
    #[inline]
    pub fn get(&self, offset: GridPos) -> Option<&'a Block<N>> {
        self.data[offset_slot(offset)]
    }

    #[inline]
    pub fn neighbour(&self, dx: i32, dy: i32, dz: i32) -> Option<&'a Block<N>> {
        self.get(GridPos::new(dx, dy, dz))
    }

    #[inline]
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    #[inline]
    pub fn block_size(&self) -> i32 {
        self.center().size()
    }

    /// Все 27 слотов
    pub fn data(&self) -> &[Option<&'a Block<N>>; NEIGHBOUR_SLOTS] {
        &self.data
    }

    /// Найденные соседи (без центра) со смещениями
    pub fn neighbours(&self) -> impl Iterator<Item = (GridPos, &'a Block<N>)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(slot, _)| *slot != CENTER_SLOT)
            .filter_map(|(slot, b)| b.map(|b| (slot_offset(slot), b)))
    }

    pub fn num_neighbours(&self) -> usize {
        self.neighbours().count()
    }

    /// Узел ядра по мировой координате из центра или соседа.
    /// None если координата вне 3x3x3 или сосед отсутствует.
    pub fn node_global(&self, coord: GridPos) -> Option<&'a N> {
        let size = self.block_size();
        let rel = (coord - self.center().base_coord()).div_floor(size);
        if rel.x.abs() > 1 || rel.y.abs() > 1 || rel.z.abs() > 1 {
            return None;
        }
        self.get(rel).map(|b| b.node_global(coord))
    }
}

/// Блоки более мелкого уровня под грубым блоком (до 8)
pub struct PyramidAncestors<'a, N> {
    data: [Option<&'a Block<N>>; 8],
    coarse_base: GridPos,
}

impl<'a, N: Node> PyramidAncestors<'a, N> {
    /// Мелкие блоки, покрывающие [2*base, 2*base + 2L)
    pub(crate) fn resolve(fine: &'a BlockIndex<N>, coarse_base: GridPos, now: u64) -> Self {
        let mut data = [None; 8];
        let fine_cell = fine.cell_of(coarse_base * 2);
        for (octant, slot) in data.iter_mut().enumerate() {
            let o = octant as i32;
            let offset = GridPos::new(o & 1, (o >> 1) & 1, (o >> 2) & 1);
            if let Some(block) = fine.get_cell(fine_cell + offset) {
                assert_fresh(block, now);
                // Призраки - копии чужих блоков, их вклад считает владелец
                if !block.is_ghost() {
                    *slot = Some(block);
                }
            }
        }
        Self { data, coarse_base }
    }

    #[inline]
    pub fn coarse_base(&self) -> GridPos {
        self.coarse_base
    }

    #[inline]
    pub fn get(&self, octant: usize) -> Option<&'a Block<N>> {
        self.data[octant]
    }

    pub fn data(&self) -> &[Option<&'a Block<N>>; 8] {
        &self.data
    }

    /// Только живые мелкие блоки
    pub fn iter(&self) -> impl Iterator<Item = &'a Block<N>> + '_ {
        self.data.iter().filter_map(|b| *b)
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_roundtrip() {
        for slot in 0..NEIGHBOUR_SLOTS {
            assert_eq!(offset_slot(slot_offset(slot)), slot);
        }
        assert_eq!(offset_slot(GridPos::ZERO), CENTER_SLOT);
    }

    #[test]
    fn test_connectivity_counts() {
        for c in [Connectivity::Face, Connectivity::Edge, Connectivity::Vertex] {
            assert_eq!(c.offsets().count(), c.count());
        }
        assert!(!Connectivity::Vertex.admits(GridPos::ZERO));
        assert!(Connectivity::Face.admits(GridPos::new(0, -1, 0)));
        assert!(!Connectivity::Face.admits(GridPos::new(1, -1, 0)));
        assert!(!Connectivity::Vertex.admits(GridPos::new(2, 0, 0)));
    }
}
