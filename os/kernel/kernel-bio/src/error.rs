#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("buffer cache needs at least one buffer")]
    NoBuffers,
    #[error("buffer cache needs at least one hash bucket")]
    NoBuckets,
}
