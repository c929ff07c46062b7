//! Copier configuration.

/// Tuning knobs for a registry and the contexts it lends out.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct CopyConfig {
    /// Maximum number of idle contexts retained by a pool.
    pub pool_capacity: usize,
    /// Initial capacity of a fresh context's identity map.
    pub identity_map_capacity: usize,
}

impl CopyConfig {
    #[must_use]
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_identity_map_capacity(mut self, capacity: usize) -> Self {
        self.identity_map_capacity = capacity;
        self
    }
}

impl Default for CopyConfig {
    /// Two idle contexts per available core, small identity maps.
    fn default() -> Self {
        let cores = std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get);
        Self {
            pool_capacity: cores * 2,
            identity_map_capacity: 16,
        }
    }
}
