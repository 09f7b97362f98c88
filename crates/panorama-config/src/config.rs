//! The top-level `PanoramaConfig`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use derive_builder::Builder;
use panorama_types::{PeerId, SubjectId};
use serde::{Deserialize, Serialize};

use crate::{BufConfig, ConfigBuildError, GcConfig, LogLevel};

/// Structure holding every recognized configuration key for a running
/// panorama server.
///
/// Deserialized from a merged [`config::Config`] (defaults, then TOML
/// file(s), then environment, then command-line overrides — see
/// [`crate::ConfigSources`]) via [`PanoramaConfigBuilder`].
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(build_fn(error = "ConfigBuildError"))]
#[builder(derive(Debug, Serialize, Deserialize))]
pub struct PanoramaConfig {
    /// The address this server's RPC listener binds to.
    #[builder(setter(into), default = "\"127.0.0.1:6776\".to_string()")]
    #[serde(default = "default_addr")]
    pub addr: String,

    /// This server's own peer id, handed out in `GetId` responses and used
    /// as the source id on outgoing `Propagate`/`Ping` calls.
    #[builder(setter(into))]
    pub id: PeerId,

    /// Subjects this server is interested in from the moment it starts.
    #[builder(default)]
    #[serde(default)]
    pub subjects: Vec<SubjectId>,

    /// Known peers, by id, and the address to dial to reach them.
    #[builder(default)]
    #[serde(default)]
    pub peers: BTreeMap<PeerId, String>,

    /// Whether a filter (the watchlist) is applied to reports learned from
    /// peers (`LearnReport`). Never applied to locally submitted reports
    /// (`SubmitReport`) regardless of this setting.
    #[builder(default = "false")]
    #[serde(default)]
    pub filter_submission: bool,

    /// Minimum logged severity.
    #[builder(default)]
    #[serde(default)]
    pub log_level: LogLevel,

    /// Path to the append-only persistence file, or `None` to run without
    /// persistence.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub db_file: Option<PathBuf>,

    /// Background GC policy.
    #[builder(default)]
    #[serde(default)]
    pub gc: GcConfig,

    /// Hold-buffer policy.
    #[builder(default)]
    #[serde(default)]
    pub buf: BufConfig,
}

fn default_addr() -> String {
    "127.0.0.1:6776".to_string()
}

impl PanoramaConfig {
    /// Returns a fresh builder. `id` must still be supplied before
    /// `build()` is called; every other field has a spec-mandated default.
    pub fn builder() -> PanoramaConfigBuilder {
        PanoramaConfigBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_id() {
        let err = PanoramaConfigBuilder::default().build().unwrap_err();
        assert!(matches!(err, ConfigBuildError::MissingField(f) if f == "id"));
    }

    #[test]
    fn builder_applies_spec_defaults() {
        let cfg = PanoramaConfig::builder().id(PeerId::new("peer-a")).build().unwrap();
        assert_eq!(cfg.addr, "127.0.0.1:6776");
        assert!(cfg.subjects.is_empty());
        assert!(cfg.peers.is_empty());
        assert!(!cfg.filter_submission);
        assert_eq!(cfg.log_level, LogLevel::Info);
        assert_eq!(cfg.db_file, None);
    }
}
