#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Upper bound on concurrently running backing loads. `None` = unbounded.
    pub max_concurrent_loads: Option<usize>,
    /// Signal the repaint hook when a load fails, so placeholders get drawn.
    pub repaint_on_failure: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: None,
            repaint_on_failure: true,
        }
    }
}

impl CacheConfig {
    pub fn with_max_concurrent_loads(mut self, limit: usize) -> Self {
        self.max_concurrent_loads = Some(limit.max(1));
        self
    }
}
