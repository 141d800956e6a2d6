// ============================================
// Coord Module - Координаты и ключи
// ============================================

pub mod bits;
mod key;
mod pos;
mod region;

pub use key::BlockKey;
pub use pos::GridPos;
pub use region::{Region3, RegionIter};
