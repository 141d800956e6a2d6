// ============================================
// blockgrid - Разреженная блочная решётка
// ============================================
// Бесконечная целочисленная решётка, активная по блокам L³:
// параллельные проходы с соседями, сшивка гало, многосеточное
// огрубление и обмен призрачными блоками между рангами.

pub mod config;
pub mod error;
pub mod field;
pub mod grid;

pub use config::GridConfig;
pub use error::{GridError, GridResult};
pub use field::LerpField;
pub use grid::{
    restrict, stitch_dilated, stitch_dilated_with, Ancestors, Block, BlockKey, BlockLayout,
    BlockStore, Communicator, Connectivity, DistributedContext, GridPos, LocalCluster,
    LocalEndpoint, Node, Partition, PyramidAncestors, Region3, ScratchPad, SoloCommunicator,
};
