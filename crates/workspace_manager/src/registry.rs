//! Published artifact registry
//!
//! Stable names at the workspace root pointing at artifacts inside `proc/`.
//! Links use targets relative to the root so a moved workspace stays valid.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use contracts::{ContractError, PublishMode, Stage};
use tracing::{debug, warn};

/// Root-level publication of artifacts
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    root: PathBuf,
    mode: PublishMode,
}

impl ArtifactRegistry {
    pub fn new(root: impl Into<PathBuf>, mode: PublishMode) -> Self {
        Self {
            root: root.into(),
            mode,
        }
    }

    pub fn mode(&self) -> PublishMode {
        self.mode
    }

    /// Publish `name` for `target`, replacing an earlier publication
    ///
    /// # Errors
    /// `WorkspaceState` if `target` does not exist or `name` is a directory.
    pub fn publish(&self, stage: Stage, name: &str, target: &Path) -> Result<PathBuf, ContractError> {
        if !target.exists() {
            return Err(ContractError::workspace_state(
                stage,
                target,
                format!("cannot publish {name}: artifact missing"),
            ));
        }

        let published = self.root.join(name);
        match fs::symlink_metadata(&published) {
            Ok(meta) if meta.is_dir() => {
                return Err(ContractError::workspace_state(
                    stage,
                    &published,
                    "published name is occupied by a directory",
                ));
            }
            Ok(_) => fs::remove_file(&published)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        self.place(&published, target)?;
        debug!(name, target = %target.display(), mode = ?self.mode, "artifact published");
        Ok(published)
    }

    /// Reference link to an input
    ///
    /// An existing reference to the same input is left untouched; one that
    /// points at a different file is replaced. Returns the link path when
    /// one was created or replaced.
    ///
    /// # Errors
    /// `WorkspaceState` if `name` is occupied by a directory.
    pub fn reference(&self, name: &str, target: &Path) -> Result<Option<PathBuf>, ContractError> {
        let link = self.root.join(name);
        match fs::symlink_metadata(&link) {
            Ok(meta) if meta.is_dir() => {
                return Err(ContractError::workspace_state(
                    Stage::Workspace,
                    &link,
                    "input reference name is occupied by a directory",
                ));
            }
            Ok(_) if self.references(&link, target)? => return Ok(None),
            Ok(_) => {
                warn!(
                    link = %link.display(),
                    input = %target.display(),
                    "input reference points elsewhere, replacing"
                );
                fs::remove_file(&link)?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.place(&link, target)?;
        Ok(Some(link))
    }

    /// Whether the existing entry at `link` already stands for `target`
    fn references(&self, link: &Path, target: &Path) -> io::Result<bool> {
        match fs::read_link(link) {
            Ok(current) => {
                let current = if current.is_relative() {
                    self.root.join(current)
                } else {
                    current
                };
                Ok(same_file(&current, target))
            }
            // A copy stands for the input while the bytes are equal
            Err(_) => Ok(fs::read(link)? == fs::read(target)?),
        }
    }

    /// Artifact a published name currently resolves to
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let published = self.root.join(name);
        match fs::read_link(&published) {
            Ok(target) if target.is_relative() => Some(self.root.join(target)),
            Ok(target) => Some(target),
            Err(_) => published.exists().then_some(published),
        }
    }

    fn place(&self, at: &Path, target: &Path) -> io::Result<()> {
        match self.mode {
            PublishMode::Symlink => symlink(&link_target(&self.root, target), at, target),
            PublishMode::Copy => fs::copy(target, at).map(|_| ()),
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Relative target for artifacts inside the root, absolute otherwise
fn link_target(root: &Path, target: &Path) -> PathBuf {
    target
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| target.to_path_buf())
}

#[cfg(unix)]
fn symlink(link_target: &Path, at: &Path, _target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link_target, at)
}

#[cfg(not(unix))]
fn symlink(_link_target: &Path, at: &Path, target: &Path) -> io::Result<()> {
    fs::copy(target, at).map(|_| ())
}
