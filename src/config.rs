use std::path::PathBuf;
use std::time::Duration;

use crate::parser::source::DEFAULT_DIRECTIVE;

/// Deadline applied to every dispatched message
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Only documents whose path ends with this suffix are tracked
pub const DEFAULT_SOURCE_SUFFIX: &str = ".go";

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

const APP_DIR: &str = "embed-lsp";
const LOG_FILE: &str = "embed-lsp.log";

/// Runtime settings of the language server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub source_suffix: String,
    pub directive: String,
    pub request_timeout: Duration,
    /// JSON log destination; stdout is reserved for the protocol
    pub log_file: PathBuf,
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            source_suffix: DEFAULT_SOURCE_SUFFIX.to_string(),
            directive: DEFAULT_DIRECTIVE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            log_file: default_log_file(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ServerConfig {
    /// Returns true if documents at `path` should be kept in the store
    pub fn tracks(&self, path: &str) -> bool {
        path.ends_with(&self.source_suffix)
    }
}

/// `embed-lsp.log` under the XDG data directory
pub fn default_log_file() -> PathBuf {
    log_file_in(std::env::var_os("XDG_DATA_HOME").map(PathBuf::from), dirs::home_dir())
}

/// Resolves the log file from `$XDG_DATA_HOME`, then `~/.local/share`, then
/// the working directory.
fn log_file_in(xdg_data_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> PathBuf {
    xdg_data_home
        .filter(|dir| dir.is_absolute())
        .or_else(|| home_dir.map(|home| home.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(LOG_FILE)
}
