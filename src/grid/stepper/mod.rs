// ============================================
// Stepper Module - Проходы по блокам
// ============================================

mod advance;
mod reduce;
mod stitch;

pub use stitch::{stitch_dilated, stitch_dilated_with};
