// ============================================
// Grid Error - Ошибки сетки
// ============================================
// Нарушения контракта (адресация вне блока, устаревший призрак)
// остаются паникой. Здесь только то, что можно обработать.

use std::fmt;

/// Ошибки конфигурации, обмена и сериализации
#[derive(Debug)]
pub enum GridError {
    Io(std::io::Error),
    Config(String),
    Serialize(String),
    Deserialize(String),
    Compression(String),
    InvalidMagic,
    UnsupportedVersion(u32),
    /// Ожидаемая (size, dilation) против полученной
    LayoutMismatch { expected: (i32, i32), found: (i32, i32) },
    TimestampMismatch { expected: u64, found: u64 },
    RankMismatch { expected: usize, found: usize },
    /// Ранг отвалился посреди коллективной операции
    Disconnected(usize),
    ThreadPool(String),
}

pub type GridResult<T> = Result<T, GridError>;

impl From<std::io::Error> for GridError {
    fn from(e: std::io::Error) -> Self {
        GridError::Io(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for GridError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        GridError::ThreadPool(e.to_string())
    }
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Io(e) => write!(f, "io error: {}", e),
            GridError::Config(msg) => write!(f, "invalid config: {}", msg),
            GridError::Serialize(msg) => write!(f, "serialize failed: {}", msg),
            GridError::Deserialize(msg) => write!(f, "deserialize failed: {}", msg),
            GridError::Compression(msg) => write!(f, "compression failed: {}", msg),
            GridError::InvalidMagic => write!(f, "ghost payload has invalid magic"),
            GridError::UnsupportedVersion(v) => write!(f, "unsupported payload version {}", v),
            GridError::LayoutMismatch { expected, found } => write!(
                f,
                "block layout mismatch: expected size/dilation {:?}, found {:?}",
                expected, found
            ),
            GridError::TimestampMismatch { expected, found } => write!(
                f,
                "timestamp mismatch: expected {}, found {}",
                expected, found
            ),
            GridError::RankMismatch { expected, found } => write!(
                f,
                "rank mismatch: store is rank {}, communicator is rank {}",
                expected, found
            ),
            GridError::Disconnected(rank) => write!(f, "rank {} disconnected", rank),
            GridError::ThreadPool(msg) => write!(f, "thread pool: {}", msg),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GridError::Io(e) => Some(e),
            _ => None,
        }
    }
}
