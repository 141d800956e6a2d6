// ============================================
// Distributed Module - Несколько рангов
// ============================================

mod comm;
mod partition;
mod payload;
mod sync;

pub use comm::{Communicator, LocalCluster, LocalEndpoint, SoloCommunicator};
pub use partition::{DistributedContext, Partition, RANK_ENV, WORLD_SIZE_ENV};
pub use payload::{GHOST_MAGIC, GHOST_VERSION};
