// ============================================
// Field Module - Плотные поля
// ============================================

mod lerp;

pub use lerp::LerpField;
