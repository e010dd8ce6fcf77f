use crate::ConfigError;
use kernel_info::param::{NBUCKET, NBUF};

/// Sizing of a [`BufferCache`](crate::BufferCache).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BcacheConfig {
    /// Number of block buffers.
    pub buffers: usize,
    /// Number of hash buckets the buffers are sharded over.
    pub buckets: usize,
}

impl BcacheConfig {
    #[must_use]
    pub const fn new(buffers: usize, buckets: usize) -> Self {
        Self { buffers, buckets }
    }

    /// # Errors
    /// [`ConfigError`] if either count is zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.buffers == 0 {
            return Err(ConfigError::NoBuffers);
        }
        if self.buckets == 0 {
            return Err(ConfigError::NoBuckets);
        }
        Ok(())
    }
}

impl Default for BcacheConfig {
    fn default() -> Self {
        Self::new(NBUF, NBUCKET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_kernel_params() {
        let c = BcacheConfig::default();
        assert_eq!(c.buffers, NBUF);
        assert_eq!(c.buckets, NBUCKET);
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn zero_counts_are_rejected() {
        assert_eq!(BcacheConfig::new(0, 13).validate(), Err(ConfigError::NoBuffers));
        assert_eq!(BcacheConfig::new(2, 0).validate(), Err(ConfigError::NoBuckets));
    }
}
