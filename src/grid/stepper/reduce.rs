// ============================================
// Reduce - Параллельная свёртка по блокам
// ============================================
// Призраки не участвуют: их значения учитывает владелец.
// Для ассоциативной и коммутативной операции результат не зависит
// от числа потоков и порядка обхода.

use std::ops::Add;

use rayon::prelude::*;

use crate::grid::block::{Block, Node};
use crate::grid::store::{in_pool, BlockStore};

impl<N: Node> BlockStore<N> {
    pub fn reduce<R, P, C>(&self, per_block: P, combine: C, init: R) -> R
    where
        R: Send,
        P: Fn(&Block<N>) -> R + Sync + Send,
        C: Fn(R, R) -> R + Sync + Send,
    {
        let pool = self.pool();
        let blocks = self.index.owned();
        let partial = in_pool(pool.as_deref(), || {
            blocks
                .into_par_iter()
                .map(|block| per_block(block))
                .reduce_with(|a, b| combine(a, b))
        });
        match partial {
            Some(value) => combine(init, value),
            None => init,
        }
    }

    /// Начальное значение = Default
    pub fn reduce_with<R, P, C>(&self, per_block: P, combine: C) -> R
    where
        R: Send + Default,
        P: Fn(&Block<N>) -> R + Sync + Send,
        C: Fn(R, R) -> R + Sync + Send,
    {
        self.reduce(per_block, combine, R::default())
    }

    /// Сумма по блокам
    pub fn reduce_sum<R, P>(&self, per_block: P) -> R
    where
        R: Send + Default + Add<Output = R>,
        P: Fn(&Block<N>) -> R + Sync + Send,
    {
        self.reduce(per_block, |a, b| a + b, R::default())
    }
}
