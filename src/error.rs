use thiserror::Error;

/// Failures raised by the lattice engine.
///
/// All of them are signalled before any state is touched, except
/// `CounterOverflow`, which is detected once the avalanche has settled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OsloError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("site index {index} out of range for lattice of length {length}")]
    IndexOutOfRange { index: usize, length: usize },
    #[error("avalanche size counter overflow: {count} relaxations")]
    CounterOverflow { count: u64 },
}
