//! Application context for CLI command execution.
//!
//! [`App`] locates the workspace, loads its configuration and snapshot, and
//! owns the [`Engine`] the commands run against.
//!
//! # Example
//!
//! ```no_run
//! use ripple::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     println!("{} entities", app.engine().stats().entities);
//!     Ok(())
//! }
//! ```

use crate::config::{RippleConfig, config_path, find_ripple_root};
use crate::dispatch::Registry;
use crate::engine::Engine;
use crate::error::{ConfigError, Result};
use crate::persistence::{self, LoadWarning};
use std::path::{Path, PathBuf};

/// Loaded workspace plus its engine.
#[derive(Debug)]
pub struct App {
    engine: Engine,
    config: RippleConfig,
    root: PathBuf,
    warnings: Vec<LoadWarning>,
}

impl App {
    /// Find the workspace above `working_dir` and load it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotInitialized` if there is no workspace, or an
    /// error if the configuration or snapshot cannot be read.
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root = find_ripple_root(working_dir).ok_or(ConfigError::NotInitialized)?;
        let config = RippleConfig::load(&config_path(&root)).await?;
        let (state, warnings) = persistence::load(&config.data_path(&root)).await?;

        Ok(Self {
            engine: Engine::new(state, config.risk.clone()),
            config,
            root,
            warnings,
        })
    }

    /// The engine.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The workspace configuration.
    #[must_use]
    pub fn config(&self) -> &RippleConfig {
        &self.config
    }

    /// Directory containing `.ripple/`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Problems found while loading the snapshot.
    #[must_use]
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    /// Operation registry using the configured default depth.
    #[must_use]
    pub fn registry(&self) -> Registry {
        Registry::standard(self.config.default_depth)
    }

    /// Write the snapshot. Call after every mutating command.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub async fn save(&self) -> Result<()> {
        persistence::save(&self.engine, &self.config.data_path(&self.root)).await
    }
}
