// ============================================
// Ghost Sync - Получение соседей с других рангов
// ============================================
//
// Два обмена all_to_all:
// 1. каждый ранг просит у владельцев ячейки соседей своих блоков
// 2. владельцы отвечают блоками, которые у них есть
// Полученные блоки становятся призраками с меткой шага.

use std::collections::BTreeSet;

use crate::error::{GridError, GridResult};
use crate::grid::block::{Block, Node};
use crate::grid::coord::GridPos;
use crate::grid::neighbours::Connectivity;
use crate::grid::store::BlockStore;

use super::comm::Communicator;
use super::payload::{decode_reply, encode_reply, GhostReply, GhostRequest};

impl<N: Node> BlockStore<N> {
    /// Коллективная операция: все ранги группы должны вызвать её с тем же
    /// `timestamp`. Старые призраки удаляются, новые действительны пока
    /// `current_timestamp() == timestamp`. Возвращает число полученных блоков.
    pub fn fetch_neighbours<C>(&mut self, comm: &mut C, timestamp: u64) -> GridResult<usize>
    where
        C: Communicator + ?Sized,
    {
        if comm.rank() != self.rank() {
            return Err(GridError::RankMismatch { expected: self.rank(), found: comm.rank() });
        }
        if comm.world_size() != self.world_size() {
            return Err(GridError::Config(format!(
                "communicator world size {} differs from store world size {}",
                comm.world_size(),
                self.world_size()
            )));
        }
        let world_size = self.world_size();
        let rank = self.rank();
        let evicted = self.drop_ghosts();

        // 1. Запросы: соседние ячейки, которыми владеют другие ранги
        let mut wanted: Vec<BTreeSet<GridPos>> = vec![BTreeSet::new(); world_size];
        for cell in self.index.owned_cells() {
            for offset in Connectivity::Vertex.offsets() {
                let neighbour = cell + offset;
                let owner = self.context().owner_of_cell(neighbour);
                if owner != rank {
                    wanted[owner].insert(neighbour);
                }
            }
        }
        let requests = wanted
            .into_iter()
            .map(|cells| GhostRequest { cells: cells.into_iter().collect() }.encode())
            .collect::<GridResult<Vec<_>>>()?;
        let incoming = comm.all_to_all(requests)?;

        // 2. Ответы: собственные блоки из запроса
        let mut replies = Vec::with_capacity(world_size);
        for (source, bytes) in incoming.iter().enumerate() {
            let request = GhostRequest::decode(bytes)?;
            let blocks: Vec<&Block<N>> = request
                .cells
                .iter()
                .filter_map(|&cell| self.index.get_cell(cell))
                .filter(|b| !b.is_ghost())
                .collect();
            log::trace!(
                "rank {}: rank {} asked for {} cells, sending {}",
                rank,
                source,
                request.cells.len(),
                blocks.len()
            );
            replies.push(encode_reply(self.index.layout(), timestamp, &blocks)?);
        }
        let answers = comm.all_to_all(replies)?;

        // 3. Призраки
        let layout = self.index.layout().clone();
        let mut received = 0;
        for (source, bytes) in answers.iter().enumerate() {
            let reply: GhostReply<N> = decode_reply(bytes, &layout)?;
            if reply.timestamp != timestamp {
                return Err(GridError::TimestampMismatch { expected: timestamp, found: reply.timestamp });
            }
            for (base, nodes) in reply.blocks {
                let cell = self.index.cell_of(base);
                if self.context().owns_cell(cell) || self.index.get_cell(cell).is_some() {
                    log::warn!(
                        "rank {}: ignoring block {:?} from rank {}, cell is already local",
                        rank,
                        base,
                        source
                    );
                    continue;
                }
                self.index.insert(Block::ghost(base, layout.clone(), nodes, timestamp));
                received += 1;
            }
        }

        log::info!(
            "rank {}/{}: fetched {} ghost blocks at step {} (evicted {})",
            rank,
            world_size,
            received,
            timestamp,
            evicted
        );
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::config::GridConfig;
    use crate::grid::block::BlockLayout;
    use crate::grid::distributed::{DistributedContext, LocalCluster, LocalEndpoint, Partition, SoloCommunicator};

    /// Запустить по потоку на ранг, вернуть результаты по рангам
    fn run_ranks<R, F>(world_size: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(BlockStore<f32>, LocalEndpoint) -> R + Sync,
    {
        let _ = env_logger::builder().is_test(true).try_init();
        let endpoints = LocalCluster::new(world_size);
        thread::scope(|s| {
            let handles: Vec<_> = endpoints
                .into_iter()
                .map(|comm| {
                    let f = &f;
                    s.spawn(move || {
                        let context =
                            DistributedContext::new(comm.rank(), world_size, Partition::Octant).unwrap();
                        let store = BlockStore::with_context(GridConfig::default(), context).unwrap();
                        f(store, comm)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn test_two_ranks_fetch() {
        let counts = run_ranks(2, |mut grid, mut comm| {
            if grid.rank() == 0 {
                grid.touch(GridPos::new(-8, 0, 0));
                *grid.node_mut(GridPos::new(-1, 0, 0)) = 5.0;
            } else {
                grid.touch(GridPos::new(0, 0, 0));
                *grid.node_mut(GridPos::new(0, 0, 0)) = 7.0;
            }
            assert_eq!(grid.num_active_blocks(), 1);
            let now = grid.current_timestamp();
            let fetched = grid.fetch_neighbours(&mut comm, now).unwrap();
            assert_eq!(fetched, 1);
            // Узел соседа виден через призрак
            let seen = if grid.rank() == 0 {
                grid.value(GridPos::new(0, 0, 0))
            } else {
                grid.value(GridPos::new(-1, 0, 0))
            };
            assert_eq!(seen, if grid.rank() == 0 { 7.0 } else { 5.0 });
            (grid.num_active_blocks(), grid.num_owned_blocks(), grid.num_ghost_blocks())
        });
        assert_eq!(counts, vec![(2, 1, 1); 2]);
    }

    #[test]
    fn test_four_ranks_fetch() {
        let counts = run_ranks(4, |mut grid, mut comm| {
            let mut touched = 0;
            for p in [
                GridPos::new(-8, 0, 0),
                GridPos::new(-8, 0, -8),
                GridPos::new(0, 0, 0),
                GridPos::new(0, 0, -8),
            ] {
                if grid.touch_if_inside(p) {
                    touched += 1;
                }
            }
            assert_eq!(touched, 1);
            assert_eq!(grid.num_active_blocks(), 1);
            let now = grid.current_timestamp();
            grid.fetch_neighbours(&mut comm, now).unwrap();
            // Повторный обмен заменяет призраков, а не копит их
            grid.fetch_neighbours(&mut comm, now).unwrap();
            grid.num_active_blocks()
        });
        assert_eq!(counts, vec![4; 4]);
    }

    #[test]
    fn test_ghosts_are_read_only_for_passes() {
        let sums = run_ranks(2, |mut grid, mut comm| {
            let base = if grid.rank() == 0 { GridPos::new(-8, 0, 0) } else { GridPos::ZERO };
            grid.touch(base);
            grid.for_each_node(|_, v| *v = 1.0);
            let now = grid.current_timestamp();
            grid.fetch_neighbours(&mut comm, now).unwrap();
            // Соседний блок (в т.ч. призрак) виден в Ancestors
            grid.advance(|block, an| {
                let neighbours = an.num_neighbours() as f32;
                for v in block.nodes_mut() {
                    *v += neighbours;
                }
            });
            grid.reduce_sum(|b| b.nodes().iter().sum::<f32>())
        });
        assert_eq!(sums, vec![1024.0; 2]);
    }

    #[test]
    fn test_refetch_each_step_sees_new_values() {
        let seen = run_ranks(2, |mut grid, mut comm| {
            let rank = grid.rank();
            let other = 1 - rank;
            // Ранг 0 владеет x < 0, ранг 1 - x >= 0
            let (base, across, halo) = if rank == 0 {
                (GridPos::new(-8, 0, 0), GridPos::new(0, 0, 0), GridPos::new(8, 0, 0))
            } else {
                (GridPos::ZERO, GridPos::new(-1, 0, 0), GridPos::new(-1, 0, 0))
            };
            grid.touch(base);
            let value_of = |step: u64, r: usize| (step * 10 + r as u64 + 1) as f32;

            let mut seen = Vec::new();
            for step in 0..3u64 {
                // Владелец меняет данные между шагами; старые призраки уже устарели
                grid.for_each_node(|_, v| *v = value_of(step, rank));
                let now = grid.current_timestamp();
                assert_eq!(now, step);
                assert_eq!(grid.fetch_neighbours(&mut comm, now).unwrap(), 1);
                assert_eq!(grid.num_ghost_blocks(), 1);
                assert_eq!(grid.value(across), value_of(step, other));

                // Шаблон читает свежий призрак через гало
                grid.advance_scratch(|block, _, scratch| {
                    let from_ghost = scratch.at(halo);
                    for p in block.local_region() {
                        *block.node_local_mut(p) = from_ghost;
                    }
                });
                seen.push(grid.value(base));
            }
            seen
        });
        assert_eq!(seen, vec![vec![2.0, 12.0, 22.0], vec![1.0, 11.0, 21.0]]);
    }

    #[test]
    fn test_solo_fetch_is_noop() {
        let mut grid: BlockStore<f32> = BlockStore::new(GridConfig::default()).unwrap();
        grid.touch(GridPos::ZERO);
        assert_eq!(grid.fetch_neighbours(&mut SoloCommunicator, 0).unwrap(), 0);
        assert_eq!(grid.num_active_blocks(), 1);
    }

    #[test]
    fn test_rank_mismatch() {
        let mut grid: BlockStore<f32> = BlockStore::new(GridConfig::default()).unwrap();
        let mut endpoints = LocalCluster::new(2);
        let mut comm = endpoints.pop().unwrap();
        assert!(matches!(
            grid.fetch_neighbours(&mut comm, 0),
            Err(GridError::RankMismatch { expected: 0, found: 1 })
        ));
    }

    fn store_with_ghost() -> BlockStore<f32> {
        let mut grid: BlockStore<f32> = BlockStore::new(GridConfig::default()).unwrap();
        grid.touch(GridPos::ZERO);
        let layout: Arc<BlockLayout> = grid.index.layout().clone();
        let nodes = vec![3.0; layout.num_nodes()];
        let stamp = grid.current_timestamp();
        grid.index.insert(Block::ghost(GridPos::new(8, 0, 0), layout, nodes, stamp));
        grid
    }

    #[test]
    fn test_fresh_ghost_is_readable() {
        let grid = store_with_ghost();
        assert_eq!(grid.value(GridPos::new(9, 1, 1)), 3.0);
        assert_eq!(grid.num_active_blocks(), 2);
        assert_eq!(grid.block_coords(), vec![GridPos::ZERO]);
    }

    #[test]
    #[should_panic(expected = "stale ghost")]
    fn test_stale_ghost_lookup_panics() {
        let mut grid = store_with_ghost();
        grid.advance(|_, _| {});
        grid.value(GridPos::new(9, 1, 1));
    }

    #[test]
    #[should_panic(expected = "stale ghost")]
    fn test_stale_ghost_resolution_panics() {
        let mut grid = store_with_ghost();
        grid.advance(|_, _| {});
        grid.advance(|_, _| {});
    }
}
