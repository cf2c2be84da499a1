//! Workspace context management for the MCP server.
//!
//! This module handles:
//! - Workspace detection (walking up to find `.ripple/`)
//! - Path canonicalization
//! - Per-workspace engine management
//!
//! # Lock Ordering
//!
//! Tools take the `Context` lock first, clone the [`Workspace`] handle and
//! release it. Mutations then take the workspace's write lock, which covers
//! the engine call and the snapshot save. The engine's own lock is never
//! held across an `.await`.

use crate::error::{Error, Result};
use ripple::app::App;
use ripple::config::RIPPLE_DIR_NAME;
use ripple::engine::Engine;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Maximum number of cached workspaces.
///
/// When this limit is reached, the oldest workspace is evicted from cache.
const MAX_CACHED_WORKSPACES: usize = 32;

/// A loaded workspace shared between tool calls.
#[derive(Debug)]
pub struct Workspace {
    app: App,
    writes: Mutex<()>,
}

impl Workspace {
    fn new(app: App) -> Self {
        Self {
            app,
            writes: Mutex::new(()),
        }
    }

    /// The engine for this workspace.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        self.app.engine()
    }

    /// Depth used when a tool call gives none.
    #[must_use]
    pub fn default_depth(&self) -> usize {
        self.app.config().default_depth
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.app.config().data_path(self.app.root())
    }

    /// Problems found while loading the snapshot.
    #[must_use]
    pub fn load_warnings(&self) -> Vec<String> {
        self.app.warnings().iter().map(ToString::to_string).collect()
    }

    /// Apply a mutation and save the snapshot.
    ///
    /// Mutations on the same workspace are serialized so saves never
    /// interleave. Nothing is written if `f` fails.
    ///
    /// # Errors
    ///
    /// Returns the engine error from `f`, or the error from saving.
    pub async fn mutate<T>(&self, f: impl FnOnce(&Engine) -> ripple::error::Result<T>) -> Result<T> {
        let _guard = self.writes.lock().await;
        let value = f(self.app.engine())?;
        self.app.save().await?;
        Ok(value)
    }
}

/// Global context state for the MCP server.
///
/// Manages loaded workspaces for multi-workspace support.
#[derive(Debug)]
pub struct Context {
    /// The current active workspace root.
    current_workspace: Option<PathBuf>,

    /// Loaded workspaces (limited to [`MAX_CACHED_WORKSPACES`]).
    workspaces: HashMap<PathBuf, Arc<Workspace>>,

    /// Insertion order for FIFO cache eviction.
    cache_order: VecDeque<PathBuf>,
}

impl Context {
    /// Create a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current_workspace: None,
            workspaces: HashMap::new(),
            cache_order: VecDeque::new(),
        }
    }

    /// Set the current workspace root.
    ///
    /// Canonicalizes the path, checks for a `.ripple/` directory and loads
    /// the workspace unless it is already cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the path doesn't exist, has no `.ripple/`
    /// directory, or its configuration or snapshot cannot be read.
    pub async fn set_workspace(&mut self, workspace_root: &Path) -> Result<WorkspaceInfo> {
        debug!(path = %workspace_root.display(), "Setting workspace");

        let canonical = workspace_root
            .canonicalize()
            .map_err(|e| Error::WorkspaceNotFound {
                path: workspace_root.display().to_string(),
                source: Some(e),
            })?;
        validate_path(&canonical)?;

        let ripple_dir = canonical.join(RIPPLE_DIR_NAME);
        if !ripple_dir.is_dir() {
            debug!(path = %ripple_dir.display(), "No .ripple directory found");
            return Err(Error::NoRippleDirectory(canonical.display().to_string()));
        }

        let workspace = if let Some(cached) = self.workspaces.get(&canonical) {
            debug!("Using cached workspace");
            Arc::clone(cached)
        } else {
            while self.workspaces.len() >= MAX_CACHED_WORKSPACES {
                self.evict_oldest();
            }

            let app = App::from_directory(&canonical).await?;
            for warning in app.warnings() {
                warn!(workspace = %canonical.display(), %warning, "Snapshot line skipped");
            }
            let workspace = Arc::new(Workspace::new(app));
            self.workspaces
                .insert(canonical.clone(), Arc::clone(&workspace));
            self.cache_order.push_back(canonical.clone());
            workspace
        };

        self.current_workspace = Some(canonical.clone());

        Ok(WorkspaceInfo {
            workspace_root: canonical,
            database_path: workspace.data_path(),
            load_warnings: workspace.load_warnings(),
        })
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self.cache_order.pop_front() {
            self.workspaces.remove(&oldest);
            if self.current_workspace.as_ref() == Some(&oldest) {
                self.current_workspace = None;
            }
            debug!(workspace = %oldest.display(), "Evicted workspace from cache");
        }
    }

    /// Get the current workspace root.
    #[must_use]
    pub fn current_workspace(&self) -> Option<&PathBuf> {
        self.current_workspace.as_ref()
    }

    /// Get the snapshot path for the current workspace.
    #[must_use]
    pub fn current_database_path(&self) -> Option<PathBuf> {
        self.current_workspace
            .as_ref()
            .and_then(|ws| self.workspaces.get(ws))
            .map(|ws| ws.data_path())
    }

    /// Get a specific workspace, or the current one if not specified.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No context is set and no workspace path is provided
    /// - The workspace path doesn't exist
    /// - The workspace exists but wasn't loaded via `set_workspace()`
    pub fn workspace_for(&self, workspace_root: Option<&Path>) -> Result<Arc<Workspace>> {
        let root = match workspace_root {
            Some(path) => path.canonicalize().map_err(|e| Error::WorkspaceNotFound {
                path: path.display().to_string(),
                source: Some(e),
            })?,
            None => self.current_workspace.clone().ok_or(Error::NoContext)?,
        };

        self.workspaces
            .get(&root)
            .cloned()
            .ok_or_else(|| Error::WorkspaceNotInitialized(root.display().to_string()))
    }

    /// Discover and set the workspace by walking up from the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no `.ripple/` directory is found in the path
    /// hierarchy, or if loading fails.
    pub async fn discover_and_set_workspace(&mut self, start: &Path) -> Result<WorkspaceInfo> {
        let workspace_root = discover_workspace(start)?;
        self.set_workspace(&workspace_root).await
    }

    #[cfg(test)]
    fn cache_size(&self) -> usize {
        self.workspaces.len()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a loaded workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceInfo {
    /// The canonical path to the workspace root.
    pub workspace_root: PathBuf,

    /// The path to the snapshot file.
    pub database_path: PathBuf,

    /// Snapshot lines skipped while loading.
    pub load_warnings: Vec<String>,
}

/// Validate that a path is safe to use as a workspace.
///
/// The path must be absolute, free of null bytes and free of `..`
/// components.
fn validate_path(path: &Path) -> Result<()> {
    let invalid = |message: &str| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            message.to_string(),
        ))
    };

    if !path.is_absolute() {
        return Err(invalid("Workspace path must be absolute"));
    }
    if path.to_string_lossy().contains('\0') {
        return Err(invalid("Workspace path contains invalid characters"));
    }
    if path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(invalid(
            "Workspace path contains parent directory references",
        ));
    }

    Ok(())
}

/// Discover a ripple workspace by walking up from the given directory.
///
/// Returns the canonicalized workspace root (directory containing `.ripple/`).
///
/// # Errors
///
/// Returns `Error::NoRippleDirectory` if no `.ripple/` directory is found,
/// or `Error::WorkspaceNotFound` if the path cannot be canonicalized.
pub fn discover_workspace(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(RIPPLE_DIR_NAME).is_dir() {
            // Canonicalize to resolve symlinks (e.g., /var -> /private/var on macOS)
            return current
                .canonicalize()
                .map_err(|e| Error::WorkspaceNotFound {
                    path: current.display().to_string(),
                    source: Some(e),
                });
        }

        if !current.pop() {
            break;
        }
    }

    Err(Error::NoRippleDirectory(start.display().to_string()))
}
