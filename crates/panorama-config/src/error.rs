//! Errors raised while building or resolving a [`crate::PanoramaConfig`].

use panorama_error::{ErrorKind, HasKind};

/// An error produced while validating configuration field values.
///
/// A missing field, an invalid single field, or a set of fields that are
/// jointly inconsistent.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigBuildError {
    /// A mandatory field was never given a value.
    #[error("field was not provided: {0}")]
    MissingField(String),
    /// A single field had a value that doesn't make sense.
    #[error("value of {0} was incorrect: {1}")]
    Invalid(String, String),
    /// Several fields are individually fine but jointly inconsistent.
    #[error("fields {0:?} are inconsistent: {1}")]
    Inconsistent(Vec<String>, String),
}

impl From<derive_builder::UninitializedFieldError> for ConfigBuildError {
    fn from(val: derive_builder::UninitializedFieldError) -> Self {
        ConfigBuildError::MissingField(val.field_name().to_string())
    }
}

impl HasKind for ConfigBuildError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

/// An error produced while loading configuration from its sources (files,
/// environment, command line) or deserializing it into a builder.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigResolveError {
    /// The `config` crate failed to merge or deserialize a source.
    #[error("config contents not as expected: {0}")]
    Deserialize(#[from] config::ConfigError),
    /// The deserialized builder failed validation.
    #[error("config semantically incorrect: {0}")]
    Build(#[from] ConfigBuildError),
}

impl HasKind for ConfigResolveError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Fatal
    }
}
