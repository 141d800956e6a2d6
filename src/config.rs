// ============================================
// Grid Config - Настройки сетки из JSON
// ============================================
// Все поля имеют значения по умолчанию, так что пустой объект `{}`
// даёт рабочую конфигурацию: блок 8³, без дилатации, корень 16³ блоков.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};
use crate::grid::coord::bits::is_power_of_two;
use crate::grid::distributed::Partition;
use crate::grid::neighbours::Connectivity;

/// Размер блока по умолчанию (узлов на ось)
pub const DEFAULT_BLOCK_SIZE: u32 = 8;
/// Блоков на ось в одном корневом регионе
pub const DEFAULT_ROOT_BLOCKS: u32 = 16;

/// Конфигурация сетки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Ребро блока L (степень двойки)
    pub block_size: u32,
    /// Слои дилатации D вокруг блока
    pub dilation: u32,
    /// Блоков на ось в корневом регионе (степень двойки)
    pub root_blocks: u32,
    /// Связность соседей для `advance`
    pub connectivity: Connectivity,
    /// Собственный пул потоков; None = глобальный пул rayon
    pub threads: Option<usize>,
    /// Разбиение владения между рангами
    pub partition: Partition,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            dilation: 0,
            root_blocks: DEFAULT_ROOT_BLOCKS,
            connectivity: Connectivity::Vertex,
            threads: None,
            partition: Partition::Octant,
        }
    }
}

impl GridConfig {
    pub fn new(block_size: u32, dilation: u32) -> Self {
        Self { block_size, dilation, ..Self::default() }
    }

    pub fn with_root_blocks(mut self, root_blocks: u32) -> Self {
        self.root_blocks = root_blocks;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Загрузить конфиг из JSON строки
    pub fn from_json(json: &str) -> GridResult<Self> {
        let config: GridConfig = serde_json::from_str(json)
            .map_err(|e| GridError::Config(format!("failed to parse JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Загрузить конфиг из файла
    pub fn load<P: AsRef<Path>>(path: P) -> GridResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> GridResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GridError::Serialize(e.to_string()))
    }

    /// Проверка инвариантов раскладки
    pub fn validate(&self) -> GridResult<()> {
        if !is_power_of_two(self.block_size as u64) {
            return Err(GridError::Config(format!(
                "block_size must be a power of two, got {}",
                self.block_size
            )));
        }
        if !is_power_of_two(self.root_blocks as u64) {
            return Err(GridError::Config(format!(
                "root_blocks must be a power of two, got {}",
                self.root_blocks
            )));
        }
        // Перекрываться могут только 26 соседних блоков
        if 2 * self.dilation > self.block_size {
            return Err(GridError::Config(format!(
                "dilation {} exceeds half of block_size {}",
                self.dilation, self.block_size
            )));
        }
        if self.threads == Some(0) {
            return Err(GridError::Config("threads must be at least 1".to_string()));
        }
        if let Partition::Slab { axis, width } = self.partition {
            if axis > 2 || width <= 0 {
                return Err(GridError::Config(format!(
                    "slab partition needs axis in 0..3 and width > 0, got axis {} width {}",
                    axis, width
                )));
            }
        }
        Ok(())
    }
}
