pub type PoolResult<T> = Result<T, PoolError>;

/// Construction-time misconfiguration. Nothing after construction reports
/// an error to the caller.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("channel capacity must be greater than zero")]
    ZeroCapacity,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
