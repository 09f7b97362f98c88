//! Bringing together defaults, a TOML file, the environment and command-line
//! overrides into one [`config::Config`].
//!
//! Grounded on `tor_config::sources::ConfigurationSources`: files are loaded
//! in the order added, environment variables are layered on top (prefixed
//! `PANORAMA_`, double-underscore as the nesting separator, e.g.
//! `PANORAMA_GC__THRESHOLD_SECS`), and `key=value` command-line overrides are
//! applied last so they always win.

use std::path::{Path, PathBuf};

use crate::{ConfigResolveError, PanoramaConfig, PanoramaConfigBuilder};

/// Whether a configuration file must exist for loading to succeed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum MustRead {
    /// Fine if the file is absent.
    TolerateAbsence,
    /// Loading fails if the file can't be read.
    MustRead,
}

/// A description of where to find panorama's configuration, mirroring the
/// teacher's `ConfigurationSources`: an ordered list of files, an
/// environment prefix, and a list of `key=value` command-line overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigSources {
    files: Vec<(PathBuf, MustRead)>,
    env_prefix: Option<String>,
    cmdline_overrides: Vec<String>,
}

impl ConfigSources {
    /// An empty source list: only defaults will apply.
    pub fn new_empty() -> Self {
        ConfigSources::default()
    }

    /// Add a file that must be present and parseable.
    pub fn push_file(&mut self, p: impl Into<PathBuf>) {
        self.files.push((p.into(), MustRead::MustRead));
    }

    /// Add a file that's read if present and otherwise silently skipped.
    pub fn push_optional_file(&mut self, p: impl Into<PathBuf>) {
        self.files.push((p.into(), MustRead::TolerateAbsence));
    }

    /// Enable pulling overrides from environment variables with the given
    /// prefix (commonly `"PANORAMA"`).
    pub fn set_env_prefix(&mut self, prefix: impl Into<String>) {
        self.env_prefix = Some(prefix.into());
    }

    /// Add a single `key=value` command-line override, applied after every
    /// file and environment variable.
    pub fn push_override(&mut self, kv: impl Into<String>) {
        self.cmdline_overrides.push(kv.into());
    }

    /// Merge every source into a single [`config::Config`], without
    /// deserializing it yet.
    pub fn load(&self) -> Result<config::Config, config::ConfigError> {
        let mut builder = config::Config::builder();

        for (path, must_read) in &self.files {
            builder = add_file(builder, path, *must_read)?;
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                config::Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        for kv in &self.cmdline_overrides {
            let (key, value) = kv
                .split_once('=')
                .ok_or_else(|| config::ConfigError::Message(format!("bad override {kv:?}, expected key=value")))?;
            builder = builder.set_override(key, value)?;
        }

        builder.build()
    }

    /// Merge every source and deserialize + validate into a
    /// [`PanoramaConfig`].
    pub fn resolve(&self) -> Result<PanoramaConfig, ConfigResolveError> {
        let merged = self.load()?;
        let builder: PanoramaConfigBuilder = merged.try_deserialize()?;
        let built = builder.build()?;
        Ok(built)
    }
}

fn add_file(
    mut builder: config::ConfigBuilder<config::builder::DefaultState>,
    path: &Path,
    must_read: MustRead,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    let required = must_read == MustRead::MustRead;
    if !required && !path.exists() {
        return Ok(builder);
    }
    let source = config::File::from(path)
        .format(config::FileFormat::Toml)
        .required(required);
    builder = builder.add_source(source);
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_then_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panorama.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "id = \"peer-a\"").unwrap();
        writeln!(f, "addr = \"0.0.0.0:7000\"").unwrap();

        let mut sources = ConfigSources::new_empty();
        sources.push_file(&path);
        sources.push_override("addr=0.0.0.0:9999");

        let cfg = sources.resolve().unwrap();
        assert_eq!(cfg.id.as_str(), "peer-a");
        assert_eq!(cfg.addr, "0.0.0.0:9999");
    }

    #[test]
    fn optional_file_absent_is_fine_given_overrides() {
        let mut sources = ConfigSources::new_empty();
        sources.push_optional_file("/nonexistent/panorama.toml");
        sources.push_override("id=peer-b");

        let cfg = sources.resolve().unwrap();
        assert_eq!(cfg.id.as_str(), "peer-b");
        assert_eq!(cfg.addr, "127.0.0.1:6776");
    }

    #[test]
    fn required_file_missing_is_an_error() {
        let mut sources = ConfigSources::new_empty();
        sources.push_file("/nonexistent/panorama.toml");
        assert!(sources.load().is_err());
    }
}
