// ============================================
// Block Module - Блоки узлов
// ============================================

mod block;
mod layout;

pub use block::Block;
pub use layout::BlockLayout;

/// Значение в узле решётки.
/// Pod: нулевое значение через `zeroed()`, передача между рангами байтами.
pub trait Node: bytemuck::Pod + Send + Sync {}

impl<T: bytemuck::Pod + Send + Sync> Node for T {}
