//! Workspace layout
//!
//! ```text
//! <root>/
//!   proc/orig/           raw-oriented intermediates
//!   proc/pre/            FLAIR.nii.gz, T1.nii.gz, 3DT1.nii.gz
//!   proc/seg/<Backend>/  one work directory per backend
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use contracts::layout;
use contracts::{Backend, ContractError, PublishMode, VolumeName};
use tracing::{debug, info, instrument};

use crate::ArtifactRegistry;

/// Resolved workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    t1_input: PathBuf,
    flair_input: PathBuf,
    registry: ArtifactRegistry,
}

impl Workspace {
    /// Resolve inputs and root against `base` without touching the disk
    ///
    /// # Errors
    /// `InputNotFound` if an input is not a regular file.
    pub fn resolve(
        base: &Path,
        output_root: &Path,
        t1: &Path,
        flair: &Path,
        mode: PublishMode,
    ) -> Result<Self, ContractError> {
        let t1_input = resolve_input(base, t1)?;
        let flair_input = resolve_input(base, flair)?;
        let root = absolute(base, output_root);

        Ok(Self {
            registry: ArtifactRegistry::new(&root, mode),
            root,
            t1_input,
            flair_input,
        })
    }

    /// Resolve, then create the layout and reference links
    #[instrument(name = "workspace_prepare", skip_all, fields(root = %output_root.display()))]
    pub fn prepare(
        base: &Path,
        output_root: &Path,
        t1: &Path,
        flair: &Path,
        mode: PublishMode,
    ) -> Result<Self, ContractError> {
        let workspace = Self::resolve(base, output_root, t1, flair, mode)?;
        workspace.ensure()?;
        Ok(workspace)
    }

    /// Create missing directories and input reference links
    ///
    /// Idempotent: existing directories and up-to-date links are left as they are.
    pub fn ensure(&self) -> Result<(), ContractError> {
        for dir in [self.orig_dir(), self.pre_dir(), self.seg_dir()] {
            fs::create_dir_all(&dir)?;
        }

        for (input, name) in self.reference_names() {
            if self.contains(input) {
                continue;
            }
            if let Some(link) = self.registry.reference(&name, input)? {
                debug!(link = %link.display(), "input reference created");
            }
        }

        info!(root = %self.root.display(), "workspace ready");
        Ok(())
    }

    /// Root-level reference name per input
    ///
    /// The input file name, prefixed with the modality when T1 and FLAIR
    /// share a file name.
    pub fn reference_names(&self) -> [(&Path, String); 2] {
        let t1 = file_name(&self.t1_input);
        let flair = file_name(&self.flair_input);
        if t1 == flair {
            [
                (self.t1_input.as_path(), format!("T1_{t1}")),
                (self.flair_input.as_path(), format!("FLAIR_{flair}")),
            ]
        } else {
            [(self.t1_input.as_path(), t1), (self.flair_input.as_path(), flair)]
        }
    }

    fn contains(&self, path: &Path) -> bool {
        if path.starts_with(&self.root) {
            return true;
        }
        match (fs::canonicalize(path), fs::canonicalize(&self.root)) {
            (Ok(path), Ok(root)) => path.starts_with(root),
            _ => false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Original T1 input (absolute)
    pub fn t1_input(&self) -> &Path {
        &self.t1_input
    }

    /// Original FLAIR input (absolute)
    pub fn flair_input(&self) -> &Path {
        &self.flair_input
    }

    // ===== proc/ =====

    pub fn proc_dir(&self) -> PathBuf {
        self.root.join(layout::PROC_DIR)
    }

    pub fn orig_dir(&self) -> PathBuf {
        self.proc_dir().join(layout::ORIG_DIR)
    }

    pub fn pre_dir(&self) -> PathBuf {
        self.proc_dir().join(layout::PRE_DIR)
    }

    pub fn seg_dir(&self) -> PathBuf {
        self.proc_dir().join(layout::SEG_DIR)
    }

    /// `proc/orig/<name>`
    pub fn orig_file(&self, name: &str) -> PathBuf {
        self.orig_dir().join(name)
    }

    /// `proc/orig/T1_LPI.nii.gz`
    pub fn orig_t1(&self) -> PathBuf {
        self.orig_file(layout::ORIG_T1)
    }

    /// `proc/orig/FLAIR_RPI.nii.gz`
    pub fn orig_flair(&self) -> PathBuf {
        self.orig_file(layout::ORIG_FLAIR)
    }

    /// `proc/pre/<FLAIR|T1|3DT1>.nii.gz`
    pub fn pre_volume(&self, name: VolumeName) -> PathBuf {
        self.pre_dir().join(name.file_name())
    }

    /// Idempotency flag of the preprocessing stage
    pub fn pre_flair(&self) -> PathBuf {
        self.pre_volume(VolumeName::Flair)
    }

    pub fn pre_t1(&self) -> PathBuf {
        self.pre_volume(VolumeName::T1)
    }

    pub fn pre_t1_native(&self) -> PathBuf {
        self.pre_volume(VolumeName::T1Native)
    }

    /// Whether a previous run completed preprocessing
    pub fn is_preprocessed(&self) -> bool {
        self.pre_flair().is_file()
    }

    // ===== root-level artifacts =====

    pub fn root_file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn flair_synth_t1(&self) -> PathBuf {
        self.root_file(layout::FLAIR_SYNTH_T1)
    }

    pub fn reg_flair_to_t1(&self) -> PathBuf {
        self.root_file(layout::REG_FLAIR_TO_T1)
    }

    pub fn reg_t1_to_flair(&self) -> PathBuf {
        self.root_file(layout::REG_T1_TO_FLAIR)
    }

    pub fn flair_to_t1(&self) -> PathBuf {
        self.root_file(layout::FLAIR_TO_T1)
    }

    pub fn published_flair(&self) -> PathBuf {
        self.root_file(layout::FLAIR_PREPROCESSED)
    }

    pub fn published_t1(&self) -> PathBuf {
        self.root_file(layout::T1_ALIGNED)
    }

    // ===== per backend =====

    /// `proc/seg/<Backend>`
    pub fn backend_dir(&self, backend: Backend) -> PathBuf {
        self.seg_dir().join(backend.name())
    }

    /// `proc/seg/<Backend>/WMH_<Backend>_bin.nii`
    pub fn binary_mask(&self, backend: Backend) -> PathBuf {
        self.backend_dir(backend).join(layout::binary_mask(backend))
    }

    /// `proc/seg/<Backend>/WMHvolume.txt`
    pub fn backend_volume_file(&self, backend: Backend) -> PathBuf {
        self.backend_dir(backend).join(layout::VOLUME_FILE)
    }

    /// `<root>/WMH_<Backend>.nii`
    pub fn published_mask(&self, backend: Backend) -> PathBuf {
        self.root_file(&layout::published_mask(backend))
    }

    /// `<root>/WMH_<Backend>.txt`
    pub fn result_file(&self, backend: Backend) -> PathBuf {
        self.root_file(&layout::result_file(backend))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn resolve_input(base: &Path, input: &Path) -> Result<PathBuf, ContractError> {
    let path = absolute(base, input);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ContractError::InputNotFound { path })
    }
}

/// `path` made absolute against `base`, with `.` and `..` folded lexically
fn absolute(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
