// ============================================
// Advance - Один параллельный проход по блокам
// ============================================
//
// 1. Снимок индекса до прохода (неизменяемый)
// 2. Для каждого собственного блока параллельно: Ancestors из снимка,
//    ScratchPad (по запросу), колбэк с &mut живого блока
// 3. Удаление убитых блоков, шаг += 1
//
// Все чтения идут из снимка, поэтому порядок блоков не важен.

use rayon::prelude::*;

use crate::grid::block::{Block, Node};
use crate::grid::neighbours::{Ancestors, Connectivity, ScratchPad};
use crate::grid::store::{in_pool, BlockStore};

impl<N: Node> BlockStore<N> {
    /// Проход со связностью из конфига
    pub fn advance<F>(&mut self, f: F)
    where
        F: Fn(&mut Block<N>, &Ancestors<'_, N>) + Sync + Send,
    {
        let connectivity = self.config().connectivity;
        self.run_pass(connectivity, false, |block, an, _| f(block, an));
    }

    pub fn advance_with<F>(&mut self, connectivity: Connectivity, f: F)
    where
        F: Fn(&mut Block<N>, &Ancestors<'_, N>) + Sync + Send,
    {
        self.run_pass(connectivity, false, |block, an, _| f(block, an));
    }

    /// Проход с готовым ScratchPad (гало 1 узел, отсутствующие соседи = 0)
    pub fn advance_scratch<F>(&mut self, f: F)
    where
        F: Fn(&mut Block<N>, &Ancestors<'_, N>, &ScratchPad<N>) + Sync + Send,
    {
        let connectivity = self.config().connectivity;
        self.run_pass(connectivity, true, f);
    }

    fn run_pass<F>(&mut self, connectivity: Connectivity, with_scratch: bool, f: F)
    where
        F: Fn(&mut Block<N>, &Ancestors<'_, N>, &ScratchPad<N>) + Sync + Send,
    {
        let now = self.current_timestamp;
        let size = self.block_size();
        let pool = self.pool();

        let snapshot = self.index.clone();
        let targets = self.index.owned_mut();
        let updated = targets.len();

        in_pool(pool.as_deref(), || {
            targets.into_par_iter().for_each_init(
                || ScratchPad::empty(size),
                |scratch, block| {
                    let cell = snapshot.cell_of(block.base_coord());
                    let center = match snapshot.get_cell(cell) {
                        Some(center) => center,
                        None => unreachable!("block {:?} missing from pass snapshot", block.base_coord()),
                    };
                    let an = Ancestors::resolve(&snapshot, center, connectivity, now);
                    if with_scratch {
                        scratch.rebuild(&an, N::zeroed());
                    }
                    f(block, &an, scratch);
                },
            );
        });
        drop(snapshot);

        let killed = self.sweep_killed();
        self.current_timestamp += 1;
        log::debug!(
            "advance: step {} -> {}, {} blocks updated, {} killed, {} active",
            now,
            self.current_timestamp,
            updated,
            killed,
            self.num_active_blocks()
        );
    }
}
