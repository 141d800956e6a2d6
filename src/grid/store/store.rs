// ============================================
// Block Store - Разреженное хранилище блоков
// ============================================
//
// Владеет индексом, счётчиком шагов, пулом потоков и контекстом ранга.
// Структурные изменения (touch, удаление) требуют &mut self и
// поэтому никогда не пересекаются с параллельным проходом.

use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::GridConfig;
use crate::error::GridResult;
use crate::grid::block::{Block, BlockLayout, Node};
use crate::grid::coord::GridPos;
use crate::grid::distributed::DistributedContext;
use crate::grid::neighbours::{assert_fresh, Connectivity};

use super::index::BlockIndex;

/// Выполнить `op` в собственном пуле или в глобальном
#[inline]
pub(crate) fn in_pool<R: Send>(pool: Option<&ThreadPool>, op: impl FnOnce() -> R + Send) -> R {
    match pool {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

pub struct BlockStore<N> {
    config: GridConfig,
    pub(crate) index: BlockIndex<N>,
    pub(crate) current_timestamp: u64,
    context: DistributedContext,
    pool: Option<Arc<ThreadPool>>,
}

impl<N: Node> BlockStore<N> {
    /// Однопроцессное хранилище (ранг 0 из 1)
    pub fn new(config: GridConfig) -> GridResult<Self> {
        let context = DistributedContext::solo(config.partition.clone());
        Self::with_context(config, context)
    }

    /// Хранилище одного ранга группы
    pub fn with_context(config: GridConfig, context: DistributedContext) -> GridResult<Self> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("blockgrid-worker-{}", i))
                    .build()?,
            )),
            None => None,
        };
        let layout = Arc::new(BlockLayout::new(config.block_size, config.dilation));
        log::debug!(
            "BlockStore: L={} D={} root={} rank {}/{} threads={:?}",
            config.block_size,
            config.dilation,
            config.root_blocks,
            context.rank(),
            context.world_size(),
            config.threads
        );
        Ok(Self {
            index: BlockIndex::new(layout, config.root_blocks),
            config,
            current_timestamp: 0,
            context,
            pool,
        })
    }

    /// Ранг и размер группы из окружения (BLOCKGRID_RANK / BLOCKGRID_WORLD_SIZE)
    pub fn from_env(config: GridConfig) -> GridResult<Self> {
        let context = DistributedContext::from_env(config.partition.clone())?;
        Self::with_context(config, context)
    }

    // ============================================
    // Свойства
    // ============================================

    #[inline]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    #[inline]
    pub fn layout(&self) -> &BlockLayout {
        self.index.layout().as_ref()
    }

    #[inline]
    pub fn block_size(&self) -> i32 {
        self.index.layout().size()
    }

    #[inline]
    pub fn context(&self) -> &DistributedContext {
        &self.context
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.context.rank()
    }

    #[inline]
    pub fn world_size(&self) -> usize {
        self.context.world_size()
    }

    /// Номер шага; растёт на 1 за каждый advance
    #[inline]
    pub fn current_timestamp(&self) -> u64 {
        self.current_timestamp
    }

    pub(crate) fn pool(&self) -> Option<Arc<ThreadPool>> {
        self.pool.clone()
    }

    // ============================================
    // Активация и доступ
    // ============================================

    /// Блок, содержащий `coord`; создаётся нулевым при отсутствии
    pub fn touch(&mut self, coord: GridPos) -> &mut Block<N> {
        let cell = self.index.cell_of(coord);
        self.index.touch_cell(cell)
    }

    /// Touch только если ячейка принадлежит этому рангу
    pub fn touch_if_inside(&mut self, coord: GridPos) -> bool {
        if self.owns(coord) {
            self.touch(coord);
            true
        } else {
            false
        }
    }

    /// Этот ранг владеет блоком с `coord`?
    #[inline]
    pub fn owns(&self, coord: GridPos) -> bool {
        self.context.owns_cell(self.index.cell_of(coord))
    }

    /// Блок с `coord`, если активен. Устаревший призрак - паника.
    pub fn get_block_if_exist(&self, coord: GridPos) -> Option<&Block<N>> {
        let block = self.index.get_cell(self.index.cell_of(coord))?;
        assert_fresh(block, self.current_timestamp);
        Some(block)
    }

    pub fn get_block_mut_if_exist(&mut self, coord: GridPos) -> Option<&mut Block<N>> {
        let now = self.current_timestamp;
        let cell = self.index.cell_of(coord);
        let block = self.index.get_cell_mut(cell)?;
        assert_fresh(block, now);
        Some(block)
    }

    /// Узел, если его блок активен
    pub fn node(&self, coord: GridPos) -> Option<&N> {
        self.get_block_if_exist(coord).map(|b| b.node_global(coord))
    }

    /// Значение узла; неактивный блок читается как ноль
    pub fn value(&self, coord: GridPos) -> N {
        self.node(coord).copied().unwrap_or_else(N::zeroed)
    }

    /// Узел для записи; блок активируется при необходимости
    pub fn node_mut(&mut self, coord: GridPos) -> &mut N {
        self.touch(coord).node_global_mut(coord)
    }

    // ============================================
    // Счётчики
    // ============================================

    /// Все активные блоки, включая призраки
    pub fn num_active_blocks(&self) -> usize {
        self.index.len()
    }

    pub fn num_owned_blocks(&self) -> usize {
        self.index.iter().filter(|b| !b.is_ghost()).count()
    }

    pub fn num_ghost_blocks(&self) -> usize {
        self.index.iter().filter(|b| b.is_ghost()).count()
    }

    /// Непустые корневые регионы
    pub fn num_root_nodes(&self) -> usize {
        self.index.num_roots()
    }

    /// base_coord собственных блоков, отсортированные
    pub fn block_coords(&self) -> Vec<GridPos> {
        let size = self.block_size();
        self.index.owned_cells().into_iter().map(|c| c * size).collect()
    }

    // ============================================
    // Обход
    // ============================================

    /// Параллельно по собственным блокам; kill применяется после обхода
    pub fn for_each_block<F>(&mut self, f: F)
    where
        F: Fn(&mut Block<N>) + Sync + Send,
    {
        let pool = self.pool();
        let blocks = self.index.owned_mut();
        in_pool(pool.as_deref(), || blocks.into_par_iter().for_each(|b| f(b)));
        self.sweep_killed();
    }

    /// Параллельно по узлам ядра собственных блоков
    pub fn for_each_node<F>(&mut self, f: F)
    where
        F: Fn(GridPos, &mut N) + Sync + Send,
    {
        self.for_each_block(|block| {
            for p in block.global_region() {
                f(p, block.node_global_mut(p));
            }
        });
    }

    /// Удалить блоки с kill_requested
    pub(crate) fn sweep_killed(&mut self) -> usize {
        let removed = self.index.retain(|b| !b.is_killed());
        if removed > 0 {
            log::debug!("BlockStore: removed {} killed blocks", removed);
        }
        removed
    }

    // ============================================
    // Обслуживание
    // ============================================

    /// Активировать отсутствующих соседей всех собственных блоков.
    /// Трогаются только ячейки этого ранга. Возвращает число новых блоков.
    pub fn activate_neighbours(&mut self, connectivity: Connectivity) -> usize {
        let mut fresh = BTreeSet::new();
        for cell in self.index.owned_cells() {
            for offset in connectivity.offsets() {
                let neighbour = cell + offset;
                if self.index.get_cell(neighbour).is_none() && self.context.owns_cell(neighbour) {
                    fresh.insert(neighbour);
                }
            }
        }
        for &cell in &fresh {
            self.index.touch_cell(cell);
        }
        fresh.len()
    }

    /// Убрать все призраки
    pub fn drop_ghosts(&mut self) -> usize {
        self.index.retain(|b| !b.is_ghost())
    }

    /// Удалить все блоки; счётчик шагов сохраняется
    pub fn clear(&mut self) {
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::coord::Region3;

    fn store(root_blocks: u32) -> BlockStore<f32> {
        BlockStore::new(GridConfig::default().with_root_blocks(root_blocks)).unwrap()
    }

    #[test]
    fn test_touch_is_idempotent() {
        let mut grid = store(16);
        grid.touch(GridPos::new(3, 4, 5));
        *grid.node_mut(GridPos::new(3, 4, 5)) = 2.5;
        grid.touch(GridPos::new(7, 7, 7));
        grid.touch(GridPos::ZERO);
        assert_eq!(grid.num_active_blocks(), 1);
        assert_eq!(grid.value(GridPos::new(3, 4, 5)), 2.5);
        grid.touch(GridPos::new(-1, 0, 0));
        assert_eq!(grid.num_active_blocks(), 2);
        assert_eq!(grid.block_coords(), vec![GridPos::new(-8, 0, 0), GridPos::ZERO]);
    }

    #[test]
    fn test_far_coordinates() {
        let mut grid = store(16);
        let far = [
            GridPos::new(1 << 28, 0, 0),
            GridPos::new(-(1 << 30), 5, (1 << 30) - 1),
            GridPos::new(i32::MIN, i32::MIN, i32::MIN),
        ];
        for (i, &p) in far.iter().enumerate() {
            *grid.node_mut(p) = i as f32 + 1.0;
        }
        assert_eq!(grid.num_active_blocks(), 3);
        assert_eq!(grid.num_root_nodes(), 3);
        for (i, &p) in far.iter().enumerate() {
            assert_eq!(grid.value(p), i as f32 + 1.0);
        }
        assert_eq!(grid.value(GridPos::new(1 << 28, 0, 8)), 0.0);
    }

    #[test]
    fn test_get_never_creates() {
        let mut grid = store(16);
        assert!(grid.get_block_if_exist(GridPos::ZERO).is_none());
        assert!(grid.get_block_mut_if_exist(GridPos::ZERO).is_none());
        assert!(grid.node(GridPos::new(1, 2, 3)).is_none());
        assert_eq!(grid.value(GridPos::new(1, 2, 3)), 0.0);
        assert_eq!(grid.num_active_blocks(), 0);
    }

    #[test]
    fn test_dense_touch_root_count() {
        // Корень = 2 блока по 8 = 16 узлов на ось
        let n = 24;
        let mut grid = store(2);
        for p in Region3::cube(0, n) {
            *grid.node_mut(p) = (p.x + p.y * p.z) as f32;
        }
        assert_eq!(grid.num_root_nodes(), 8);
        assert_eq!(grid.num_active_blocks(), 27);
        for p in Region3::cube(0, n) {
            assert_eq!(grid.value(p), (p.x + p.y * p.z) as f32);
        }
    }

    #[test]
    fn test_for_each_and_kill_sweep() {
        let mut grid = store(16);
        for x in -2..2 {
            grid.touch(GridPos::new(x * 8, 0, 0));
        }
        grid.for_each_node(|p, v| *v = p.x as f32);
        assert_eq!(grid.value(GridPos::new(-13, 2, 2)), -13.0);
        grid.for_each_block(|b| {
            if b.base_coord().x < 0 {
                b.kill();
            }
        });
        assert_eq!(grid.num_active_blocks(), 2);
        assert!(grid.get_block_if_exist(GridPos::new(-1, 0, 0)).is_none());
        assert_eq!(grid.value(GridPos::new(9, 0, 0)), 9.0);
    }

    #[test]
    fn test_activate_neighbours() {
        let mut grid = store(16);
        grid.touch(GridPos::ZERO);
        assert_eq!(grid.activate_neighbours(Connectivity::Face), 6);
        assert_eq!(grid.num_active_blocks(), 7);
        assert_eq!(grid.activate_neighbours(Connectivity::Face), 18);
        grid.clear();
        grid.touch(GridPos::ZERO);
        assert_eq!(grid.activate_neighbours(Connectivity::Vertex), 26);
        assert_eq!(grid.num_root_nodes(), 8);
    }

    #[test]
    fn test_dedicated_pool() {
        let mut grid: BlockStore<u32> =
            BlockStore::new(GridConfig::default().with_threads(2)).unwrap();
        grid.touch(GridPos::ZERO);
        grid.touch(GridPos::new(8, 0, 0));
        grid.for_each_node(|_, v| *v = 1);
        assert_eq!(grid.value(GridPos::new(15, 7, 7)), 1);
    }
}
