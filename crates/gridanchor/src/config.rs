use gridanchor_cache::CacheConfig;

#[derive(Debug, Clone)]
pub struct WorkbenchConfig {
    pub cache: CacheConfig,
    /// Register the auto-fit synthesizer for style and row-height commands.
    pub auto_fit: bool,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            auto_fit: true,
        }
    }
}

impl WorkbenchConfig {
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn without_auto_fit(mut self) -> Self {
        self.auto_fit = false;
        self
    }
}
