// ============================================
// Multigrid Module - Уровни разного разрешения
// ============================================

mod coarsen;

pub use coarsen::restrict;
