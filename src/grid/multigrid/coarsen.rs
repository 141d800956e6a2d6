// ============================================
// Coarsen - Построение грубого уровня
// ============================================
//
// Мелкий блок с base покрывается грубым блоком с base/2 (выровненным к L).
// Каждый грубый блок обнуляется и получает до 8 мелких блоков под собой.
// Вес ограничения задаёт вызывающий код.

use std::collections::BTreeSet;
use std::ops::{AddAssign, Mul};

use rayon::prelude::*;

use crate::error::{GridError, GridResult};
use crate::grid::block::{Block, Node};
use crate::grid::coord::GridPos;
use crate::grid::neighbours::PyramidAncestors;
use crate::grid::store::{in_pool, BlockStore};

impl<N: Node> BlockStore<N> {
    /// Заполнить `coarse` по этому уровню. Возвращает число грубых блоков.
    pub fn coarsen_to<F>(&self, coarse: &mut BlockStore<N>, f: F) -> GridResult<usize>
    where
        F: Fn(&mut Block<N>, &PyramidAncestors<'_, N>) + Sync + Send,
    {
        if !self.layout().same_geometry(coarse.layout()) {
            return Err(GridError::LayoutMismatch {
                expected: (self.layout().size(), self.layout().dilation()),
                found: (coarse.layout().size(), coarse.layout().dilation()),
            });
        }
        let size = self.block_size();
        let targets: BTreeSet<GridPos> = self
            .index
            .owned()
            .iter()
            .map(|b| b.base_coord().div_floor(2).align_down(size))
            .collect();

        // Каждая сборка с нуля: блоки без мелких под собой уходят
        let stale = coarse
            .index
            .retain(|b| b.is_ghost() || targets.contains(&b.base_coord()));
        for &base in &targets {
            coarse.touch(base).clear();
        }

        let now = self.current_timestamp;
        let fine = &self.index;
        let pool = coarse.pool();
        let blocks: Vec<&mut Block<N>> = coarse
            .index
            .iter_mut()
            .filter(|b| !b.is_ghost() && targets.contains(&b.base_coord()))
            .collect();

        in_pool(pool.as_deref(), || {
            blocks.into_par_iter().for_each(|block| {
                let an = PyramidAncestors::resolve(fine, block.base_coord(), now);
                f(block, &an);
            });
        });

        let killed = coarse.sweep_killed();
        log::debug!(
            "coarsen: {} fine blocks -> {} coarse blocks ({} stale, {} killed)",
            self.num_owned_blocks(),
            targets.len(),
            stale,
            killed
        );
        Ok(targets.len())
    }
}

/// Ограничение: coarse[floor(i/2)] += fine[i] * weight по ядрам живых мелких блоков
pub fn restrict<N, S>(block: &mut Block<N>, an: &PyramidAncestors<'_, N>, weight: S)
where
    N: Node + AddAssign + Mul<S, Output = N>,
    S: Copy,
{
    for fine in an.iter() {
        for p in fine.global_region() {
            *block.node_global_mut(p.div_floor(2)) += *fine.node_global(p) * weight;
        }
    }
}
