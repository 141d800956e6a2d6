// ============================================
// Store Module - Разреженное хранилище
// ============================================

mod index;
mod root;
mod store;

pub(crate) use index::BlockIndex;
pub(crate) use store::in_pool;
pub use store::BlockStore;
