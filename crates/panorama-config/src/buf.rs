//! The `BufConfig` configuration section.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::ConfigBuildError;

/// The hold-buffer's default retention time (`HOLD_TIME`).
pub const HOLD_TIME: Duration = Duration::from_secs(3 * 60);
/// The hold-buffer's default per-subject capacity (`HOLD_LIST_LEN`).
pub const HOLD_LIST_LEN: usize = 60;

/// Controls the hold-buffer that parks reports rejected as off-watchlist
/// until their subject is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(build_fn(error = "ConfigBuildError"))]
#[builder(derive(Debug, Serialize, Deserialize))]
pub struct BufConfig {
    /// Seconds a held report survives before it is dropped unreplayed.
    #[builder(default = "HOLD_TIME.as_secs()")]
    #[serde(default = "default_hold_time_secs")]
    pub hold_time_secs: u64,

    /// The maximum number of held reports retained per subject.
    #[builder(default = "HOLD_LIST_LEN")]
    #[serde(default = "default_hold_list_len")]
    pub hold_list_len: usize,
}

fn default_hold_time_secs() -> u64 {
    HOLD_TIME.as_secs()
}
fn default_hold_list_len() -> usize {
    HOLD_LIST_LEN
}

impl BufConfig {
    /// Returns a fresh builder seeded with the default constants above.
    pub fn builder() -> BufConfigBuilder {
        BufConfigBuilder::default()
    }

    /// The hold time as a [`Duration`].
    pub fn hold_time(&self) -> Duration {
        Duration::from_secs(self.hold_time_secs)
    }
}

impl Default for BufConfig {
    fn default() -> Self {
        BufConfigBuilder::default()
            .build()
            .expect("BufConfig defaults are always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_module_constants() {
        let cfg = BufConfig::default();
        assert_eq!(cfg.hold_time(), HOLD_TIME);
        assert_eq!(cfg.hold_list_len, HOLD_LIST_LEN);
    }
}
