//! The `GCConfig` configuration section.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::ConfigBuildError;

/// The garbage collector's default sweep interval (`GC_FREQUENCY`).
pub const GC_FREQUENCY: Duration = Duration::from_secs(3 * 60);
/// The garbage collector's default retention threshold (`GC_THRESHOLD`).
pub const GC_THRESHOLD: Duration = Duration::from_secs(5 * 60);
/// Whether GC runs in relative mode by default (`GC_RELATIVE`).
pub const GC_RELATIVE: bool = true;

/// Controls the background view garbage collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(build_fn(error = "ConfigBuildError"))]
#[builder(derive(Debug, Serialize, Deserialize))]
pub struct GcConfig {
    /// Whether the background GC loop runs at all.
    #[builder(default = "true")]
    #[serde(default = "default_enable")]
    pub enable: bool,

    /// Seconds between sweeps.
    #[builder(default = "GC_FREQUENCY.as_secs()")]
    #[serde(default = "default_frequency_secs")]
    pub frequency_secs: u64,

    /// Seconds an observation may age before it becomes eligible for
    /// removal.
    #[builder(default = "GC_THRESHOLD.as_secs()")]
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: u64,

    /// If true, `threshold_secs` is measured relative to each view's most
    /// recent observation (and that observation is always retained); if
    /// false, it's measured against wall-clock now.
    #[builder(default = "GC_RELATIVE")]
    #[serde(default = "default_relative")]
    pub relative: bool,
}

fn default_enable() -> bool {
    true
}
fn default_frequency_secs() -> u64 {
    GC_FREQUENCY.as_secs()
}
fn default_threshold_secs() -> u64 {
    GC_THRESHOLD.as_secs()
}
fn default_relative() -> bool {
    GC_RELATIVE
}

impl GcConfig {
    /// Returns a fresh builder seeded with the default constants above.
    pub fn builder() -> GcConfigBuilder {
        GcConfigBuilder::default()
    }

    /// The sweep interval as a [`Duration`].
    pub fn frequency(&self) -> Duration {
        Duration::from_secs(self.frequency_secs)
    }

    /// The retention threshold as a [`Duration`].
    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.threshold_secs)
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfigBuilder::default()
            .build()
            .expect("GcConfig defaults are always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_module_constants() {
        let cfg = GcConfig::default();
        assert!(cfg.enable);
        assert_eq!(cfg.frequency(), GC_FREQUENCY);
        assert_eq!(cfg.threshold(), GC_THRESHOLD);
        assert_eq!(cfg.relative, GC_RELATIVE);
    }

    #[test]
    fn builder_overrides_defaults() {
        let cfg = GcConfig::builder()
            .relative(false)
            .threshold_secs(30)
            .build()
            .unwrap();
        assert!(!cfg.relative);
        assert_eq!(cfg.threshold_secs, 30);
    }
}
