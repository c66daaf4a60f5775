//! Runtime configuration.

use bindery_core::ConversionPolicy;

/// Default number of queued finalizations processed per sweep in light mode.
pub const DEFAULT_LIGHT_GC_BATCH: usize = 64;

/// Knobs fixed when a [`Runtime`](crate::Runtime) is created.
///
/// ```
/// use bindery::{ConversionPolicy, RuntimeConfig};
///
/// let config = RuntimeConfig::default()
///     .with_default_policy(ConversionPolicy::Strict)
///     .with_light_gc(true);
/// assert!(config.light_gc);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Policy used when no parameter, function, class or type sets one.
    pub default_policy: ConversionPolicy,
    /// Queue finalizations instead of destroying objects as soon as their
    /// last owning proxy goes away.
    pub light_gc: bool,
    /// Queue length that triggers a sweep in light mode.
    pub light_gc_batch: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_policy: ConversionPolicy::Loose,
            light_gc: false,
            light_gc_batch: DEFAULT_LIGHT_GC_BATCH,
        }
    }
}

impl RuntimeConfig {
    pub fn with_default_policy(mut self, policy: ConversionPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_light_gc(mut self, enabled: bool) -> Self {
        self.light_gc = enabled;
        self
    }

    /// Batch size for light mode; zero is treated as one.
    pub fn with_light_gc_batch(mut self, batch: usize) -> Self {
        self.light_gc_batch = batch.max(1);
        self
    }
}
