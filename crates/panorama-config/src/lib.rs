//! Layered configuration for the panorama server.
//!
//! Defaults are baked into [`PanoramaConfigBuilder`]; [`ConfigSources`] then
//! layers a TOML file, the environment, and command-line overrides on top,
//! the same ordering `tor_config::sources::ConfigurationSources` uses for
//! Arti.

mod buf;
mod config;
mod error;
mod gc;
mod log_level;
mod sources;

pub use buf::{BufConfig, BufConfigBuilder, HOLD_LIST_LEN, HOLD_TIME};
pub use config::{PanoramaConfig, PanoramaConfigBuilder};
pub use error::{ConfigBuildError, ConfigResolveError};
pub use gc::{GcConfig, GcConfigBuilder, GC_FREQUENCY, GC_RELATIVE, GC_THRESHOLD};
pub use log_level::LogLevel;
pub use sources::ConfigSources;

/// The maximum number of observations retained per [`panorama_types::View`]
/// (`MaxReportPerView`).
pub const MAX_REPORT_PER_VIEW: usize = panorama_types::DEFAULT_MAX_REPORTS_PER_VIEW;

/// How many of a view's most recent metric summaries the inference worker's
/// per-observer workbook entry keeps around (`VIEW_METRIC_HISTORY_SIZE`) —
/// enough to resolve a `PENDING` status against the summary immediately
/// before it without rescanning the whole view.
pub const VIEW_METRIC_HISTORY_SIZE: usize = 2;

/// The first handle value `Register` ever hands out (`HANDLE_START`).
pub const HANDLE_START: panorama_types::Handle = panorama_types::HANDLE_START;
