// ============================================
// Partition - Владение блоками между рангами
// ============================================
//
// Чистая функция (ячейка блока, размер группы) -> ранг.
// Все ранги вычисляют одно и то же без обмена сообщениями.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::grid::coord::{BlockKey, GridPos};

/// Переменная окружения с рангом процесса
pub const RANK_ENV: &str = "BLOCKGRID_RANK";
/// Переменная окружения с размером группы
pub const WORLD_SIZE_ENV: &str = "BLOCKGRID_WORLD_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Знаки координат: бит 0 = x >= 0, бит 1 = z >= 0, бит 2 = y >= 0.
    /// Размер группы 1, 2, 4 или 8.
    Octant,
    /// Слои толщиной `width` блоков вдоль оси, по кругу
    Slab { axis: usize, width: i32 },
    /// Morton-ключ ячейки по модулю размера группы
    Morton,
}

impl Default for Partition {
    fn default() -> Self {
        Partition::Octant
    }
}

impl Partition {
    /// Поддерживается ли размер группы
    pub fn supports(&self, world_size: usize) -> bool {
        match self {
            Partition::Octant => matches!(world_size, 1 | 2 | 4 | 8),
            Partition::Slab { axis, width } => world_size >= 1 && *axis < 3 && *width > 0,
            Partition::Morton => world_size >= 1,
        }
    }

    /// Ранг-владелец ячейки блока
    pub fn owner(&self, cell: GridPos, world_size: usize) -> usize {
        if world_size <= 1 {
            return 0;
        }
        match self {
            Partition::Octant => {
                let bits = (cell.x >= 0) as usize
                    | ((cell.z >= 0) as usize) << 1
                    | ((cell.y >= 0) as usize) << 2;
                bits % world_size
            }
            Partition::Slab { axis, width } => {
                cell.axis(*axis).div_euclid(*width).rem_euclid(world_size as i32) as usize
            }
            Partition::Morton => (BlockKey::from_cell(cell).raw() % world_size as u128) as usize,
        }
    }
}

/// Ранг процесса внутри группы; живёт в хранилище, не в глобалах
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributedContext {
    rank: usize,
    world_size: usize,
    partition: Partition,
}

impl DistributedContext {
    /// Один процесс
    pub fn solo(partition: Partition) -> Self {
        Self { rank: 0, world_size: 1, partition }
    }

    pub fn new(rank: usize, world_size: usize, partition: Partition) -> GridResult<Self> {
        if world_size == 0 || rank >= world_size {
            return Err(GridError::Config(format!(
                "rank {} is outside world of size {}",
                rank, world_size
            )));
        }
        if !partition.supports(world_size) {
            return Err(GridError::Config(format!(
                "partition {:?} does not support world size {}",
                partition, world_size
            )));
        }
        Ok(Self { rank, world_size, partition })
    }

    /// Из BLOCKGRID_RANK / BLOCKGRID_WORLD_SIZE; без переменных - один процесс
    pub fn from_env(partition: Partition) -> GridResult<Self> {
        let read = |name: &str| -> GridResult<Option<usize>> {
            match env::var(name) {
                Ok(value) => value
                    .trim()
                    .parse::<usize>()
                    .map(Some)
                    .map_err(|e| GridError::Config(format!("{}={:?}: {}", name, value, e))),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(e) => Err(GridError::Config(format!("{}: {}", name, e))),
            }
        };
        let rank = read(RANK_ENV)?.unwrap_or(0);
        let world_size = read(WORLD_SIZE_ENV)?.unwrap_or(1);
        Self::new(rank, world_size, partition)
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn world_size(&self) -> usize {
        self.world_size
    }

    #[inline]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    #[inline]
    pub fn owner_of_cell(&self, cell: GridPos) -> usize {
        self.partition.owner(cell, self.world_size)
    }

    #[inline]
    pub fn owns_cell(&self, cell: GridPos) -> bool {
        self.owner_of_cell(cell) == self.rank
    }
}
