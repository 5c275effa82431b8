//! Workspace Manager
//!
//! Each execution owns one directory under the shared scratch directory,
//! named by a random UUID. Every path the execution touches (source,
//! compiled binary, class files) lives inside that directory, so releasing
//! the workspace is a single recursive removal.
//!
//! A workspace is released exactly once: [`WorkspaceManager::release`]
//! consumes it, and a workspace dropped without being released (cancelled
//! request, panic) is removed by its `Drop` impl instead.

use crate::toolchain::ToolchainSpec;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Attempts before giving up on finding an unused workspace id
const MAX_ALLOCATION_ATTEMPTS: usize = 3;

/// Transient files backing one execution
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    root: PathBuf,
    source_path: PathBuf,
    binary_path: Option<PathBuf>,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn binary_path(&self) -> Option<&Path> {
        self.binary_path.as_deref()
    }

    /// Write the submission verbatim
    pub async fn write_source(&self, code: &str) -> io::Result<()> {
        fs::write(&self.source_path, code).await
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        // Blocking removal; only reached on cancellation or panic paths
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => debug!(workspace_id = %self.id, "Removed unreleased workspace"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                workspace_id = %self.id,
                path = %self.root.display(),
                error = %e,
                "Failed to remove unreleased workspace"
            ),
        }
    }
}

/// Allocates and releases workspaces under one scratch directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    scratch_dir: PathBuf,
}

impl WorkspaceManager {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Reserve a fresh workspace for `toolchain`
    ///
    /// Creates the scratch directory if absent. The workspace directory is
    /// created with `create_dir`, never `create_dir_all`, so an id collision
    /// is detected instead of silently sharing files.
    pub async fn acquire(&self, toolchain: &ToolchainSpec) -> io::Result<Workspace> {
        fs::create_dir_all(&self.scratch_dir).await?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            let id = Uuid::new_v4();
            let root = self.scratch_dir.join(id.to_string());

            match fs::create_dir(&root).await {
                Ok(()) => {
                    debug!(
                        workspace_id = %id,
                        language = %toolchain.language,
                        "Workspace acquired"
                    );
                    return Ok(Workspace {
                        id,
                        source_path: root.join(&toolchain.source_file),
                        binary_path: toolchain.binary_file.as_ref().map(|name| root.join(name)),
                        root,
                        released: false,
                    });
                }
                Err(e)
                    if e.kind() == io::ErrorKind::AlreadyExists
                        && attempts < MAX_ALLOCATION_ATTEMPTS =>
                {
                    warn!(workspace_id = %id, "Workspace id collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Delete everything the workspace reserved
    ///
    /// Safe when some or none of the paths were created. Failures are
    /// logged and swallowed so they can never replace the execution's real
    /// outcome.
    pub async fn release(&self, mut workspace: Workspace) {
        workspace.released = true;
        match fs::remove_dir_all(&workspace.root).await {
            Ok(()) => debug!(workspace_id = %workspace.id, "Workspace released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(workspace_id = %workspace.id, "Workspace already gone");
            }
            Err(e) => warn!(
                workspace_id = %workspace.id,
                path = %workspace.root.display(),
                error = %e,
                "Failed to clean up workspace"
            ),
        }
    }
}
