// ============================================
// Neighbours Module - Соседи и гало
// ============================================

mod ancestors;
mod scratch;

pub use ancestors::{offset_slot, slot_offset, Ancestors, Connectivity, PyramidAncestors, NEIGHBOUR_SLOTS};
pub(crate) use ancestors::assert_fresh;
pub use scratch::ScratchPad;
