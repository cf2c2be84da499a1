//! Implementation of the `init` command.
//!
//! Creates the `.ripple/` directory with a default configuration, an empty
//! graph snapshot and a `.gitignore` for temporary files.

use crate::config::{CONFIG_FILE_NAME, DATA_FILE_NAME, RIPPLE_DIR_NAME, RippleConfig};
use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Name of the gitignore file within .ripple
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created workspace directory
    pub ripple_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created snapshot file
    pub data_file: PathBuf,
}

/// Initialize a ripple workspace in `base_dir`.
///
/// # Errors
///
/// Returns `ConfigError::AlreadyInitialized` if `.ripple/` exists, or an I/O
/// error if any file cannot be written.
pub async fn init(base_dir: &Path) -> Result<InitResult> {
    let ripple_dir = base_dir.join(RIPPLE_DIR_NAME);
    if ripple_dir.exists() {
        return Err(ConfigError::AlreadyInitialized(ripple_dir.display().to_string()).into());
    }

    fs::create_dir_all(&ripple_dir).await?;

    let config_file = ripple_dir.join(CONFIG_FILE_NAME);
    RippleConfig::default().save(&config_file).await?;

    let data_file = ripple_dir.join(DATA_FILE_NAME);
    fs::write(&data_file, "").await?;

    fs::write(
        ripple_dir.join(GITIGNORE_FILE_NAME),
        "# Interrupted snapshot saves\n*.tmp\n",
    )
    .await?;

    info!(path = %ripple_dir.display(), "Initialized ripple workspace");
    Ok(InitResult {
        ripple_dir,
        config_file,
        data_file,
    })
}
