// ============================================
// Grid Module - Разреженная блочная решётка
// ============================================
//
// coord       - координаты, Morton-ключи, регионы
// block       - блок узлов и его раскладка
// store       - двухуровневый индекс и BlockStore
// neighbours  - Ancestors, PyramidAncestors, ScratchPad
// stepper     - advance, stitch, reduce
// multigrid   - coarsen_to, restrict
// distributed - владение, обмен, призраки

pub mod block;
pub mod coord;
pub mod distributed;
pub mod multigrid;
pub mod neighbours;
pub mod stepper;
pub mod store;

pub use block::{Block, BlockLayout, Node};
pub use coord::{BlockKey, GridPos, Region3};
pub use distributed::{Communicator, DistributedContext, LocalCluster, LocalEndpoint, Partition, SoloCommunicator};
pub use multigrid::restrict;
pub use neighbours::{Ancestors, Connectivity, PyramidAncestors, ScratchPad};
pub use stepper::{stitch_dilated, stitch_dilated_with};
pub use store::BlockStore;
