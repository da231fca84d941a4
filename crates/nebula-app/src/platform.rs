//! Platform directory resolution.
//!
//! The explorer keeps `config.ron` in the platform config directory and
//! writes rolling log files under the platform data directory.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during platform operations.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The OS did not provide a data directory.
    #[error("could not determine OS data directory")]
    NoDataDir,
    /// Directory creation failed.
    #[error("platform I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// OS-specific directory paths for the explorer.
///
/// Follows OS conventions (XDG on Linux, Known Folders on Windows, Library on
/// macOS).
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformDirs {
    /// `config.ron` and user shaders.
    pub config_dir: PathBuf,
    /// Log files.
    pub log_dir: PathBuf,
}

const APP_NAME: &str = "nebula-explorer";

impl PlatformDirs {
    /// Resolve directories without creating them. `config_override` replaces
    /// the platform config directory (the `--config` flag).
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoDataDir`] if the OS does not expose a data
    /// directory.
    pub fn resolve(config_override: Option<&Path>) -> Result<Self, PlatformError> {
        let data = dirs::data_local_dir().ok_or(PlatformError::NoDataDir)?;
        Ok(Self {
            config_dir: config_override
                .map(Path::to_path_buf)
                .unwrap_or_else(nebula_config::Config::default_dir),
            log_dir: data.join(APP_NAME).join("logs"),
        })
    }

    /// Resolve directories rooted under a custom base path.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Create all directories on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Io`] if any directory cannot be created.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}
