/// Diagnostics gathered from the GPU.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of caches allocated during a recent frame (at least one frame
    /// stale); present only when `read_cache_count` is enabled
    pub last_cache_count: Option<u32>,
}
