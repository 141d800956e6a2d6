// ============================================
// Stitch - Сшивка перекрывающихся гало
// ============================================
//
// Блоки с дилатацией D хранят копии узлов соседей в своём гало.
// Значения, разбросанные в перекрытия, складываются по всем блокам,
// чьё хранилище покрывает узел; результат пишется в каждую копию.

use std::ops::AddAssign;

use crate::grid::block::{Block, Node};
use crate::grid::neighbours::{Ancestors, Connectivity};

/// Сумма по всем копиям узла. Вызывать из `advance` с Vertex-связностью.
pub fn stitch_dilated<N>(block: &mut Block<N>, an: &Ancestors<'_, N>)
where
    N: Node + AddAssign,
{
    stitch_dilated_with(block, an, |acc, value| *acc += value);
}

/// То же с произвольной ассоциативной операцией
pub fn stitch_dilated_with<N, C>(block: &mut Block<N>, an: &Ancestors<'_, N>, combine: C)
where
    N: Node,
    C: Fn(&mut N, N),
{
    assert_eq!(
        an.connectivity(),
        Connectivity::Vertex,
        "stitching needs all 26 neighbours"
    );
    let size = block.size();
    let center = an.center();
    let neighbours: Vec<_> = an.neighbours().collect();

    for p in block.storage_region() {
        let mut acc = *center.node_local(p);
        for &(offset, neighbour) in &neighbours {
            let q = p - offset * size;
            if neighbour.layout().covers_local(q) {
                combine(&mut acc, *neighbour.node_local(q));
            }
        }
        *block.node_local_mut(p) = acc;
    }
}
