//! Selective merge of staged files into the live installation.
//!
//! Only whitelisted top-level subtrees are copied. Within them, any entry
//! whose name is on the exclusion list is skipped entirely: it is neither
//! descended into nor overwritten, so local databases and installed
//! dependencies survive every update byte-for-byte.
//!
//! Symbolic links in the staged tree are never followed or copied. A link
//! could point back up the tree or outside staging entirely.
//!
//! There is no rollback. An I/O error aborts the walk and leaves files
//! copied so far in place.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::stage::StagingManifest;
use crate::error::{Result, StagehandError};

/// Which subtrees to merge and which names to protect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyPlan {
    subtrees_to_merge: Vec<String>,
    excluded_names: HashSet<String>,
}

impl ApplyPlan {
    /// Create a plan.
    pub fn new<S, E>(subtrees: S, excluded: E) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            subtrees_to_merge: subtrees.into_iter().map(Into::into).collect(),
            excluded_names: excluded.into_iter().map(Into::into).collect(),
        }
    }

    /// Top-level directories to merge, in order.
    pub fn subtrees_to_merge(&self) -> &[String] {
        &self.subtrees_to_merge
    }

    /// Protected names.
    pub fn excluded_names(&self) -> &HashSet<String> {
        &self.excluded_names
    }

    /// Whether an entry with this file name must be left alone.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_names.contains(name)
    }
}

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Subtrees found in the release and merged.
    pub subtrees_applied: Vec<String>,
    /// Whitelisted subtrees absent from the release.
    pub subtrees_missing: Vec<String>,
    /// Files written into the installation.
    pub files_copied: usize,
    /// Directories created in the installation.
    pub directories_created: usize,
    /// Staged entries skipped because their name is protected.
    pub skipped: Vec<PathBuf>,
    /// Staged symbolic links left out of the merge.
    pub links_skipped: Vec<PathBuf>,
}

/// Copies staged subtrees into an installation root.
#[derive(Debug, Clone)]
pub struct MergeApplier {
    plan: ApplyPlan,
}

impl MergeApplier {
    /// Create an applier for `plan`.
    pub fn new(plan: ApplyPlan) -> Self {
        Self { plan }
    }

    /// Get the plan.
    pub fn plan(&self) -> &ApplyPlan {
        &self.plan
    }

    /// Merge the staged release into `install_root`.
    ///
    /// # Errors
    ///
    /// Returns `ApplyFailed` naming the path at which the walk stopped.
    pub fn apply(&self, manifest: &StagingManifest, install_root: &Path) -> Result<ApplyReport> {
        let staged_root = manifest.root_path();
        let mut report = ApplyReport::default();

        for subtree in self.plan.subtrees_to_merge() {
            let source = staged_root.join(subtree);
            let target = install_root.join(subtree);

            if self.plan.is_excluded(subtree) {
                tracing::debug!("Subtree '{}' is protected, skipping", subtree);
                report.skipped.push(source);
                continue;
            }

            let file_type = match fs::symlink_metadata(&source) {
                Ok(meta) => meta.file_type(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!("Release has no '{}' directory, skipping", subtree);
                    report.subtrees_missing.push(subtree.clone());
                    continue;
                }
                Err(e) => return Err(apply_error(&source, e)),
            };

            if file_type.is_symlink() {
                tracing::warn!("Subtree '{}' is a symbolic link, skipping", subtree);
                report.links_skipped.push(source);
                continue;
            }

            tracing::info!("Merging {} into {}", subtree, target.display());
            if file_type.is_dir() {
                self.copy_tree(&source, &target, &mut report)?;
            } else {
                copy_file(&source, &target)?;
                report.files_copied += 1;
            }
            report.subtrees_applied.push(subtree.clone());
        }

        tracing::info!(
            "Applied {} file(s), skipped {} protected entr{}",
            report.files_copied,
            report.skipped.len(),
            if report.skipped.len() == 1 { "y" } else { "ies" }
        );
        Ok(report)
    }

    /// Explicit-stack walk; excluded names and links are checked before any
    /// descent or copy.
    fn copy_tree(&self, source: &Path, target: &Path, report: &mut ApplyReport) -> Result<()> {
        let mut pending = vec![(source.to_path_buf(), target.to_path_buf())];

        while let Some((src_dir, dst_dir)) = pending.pop() {
            if !dst_dir.is_dir() {
                fs::create_dir_all(&dst_dir).map_err(|e| apply_error(&dst_dir, e))?;
                report.directories_created += 1;
            }

            let mut entries = fs::read_dir(&src_dir)
                .map_err(|e| apply_error(&src_dir, e))?
                .collect::<std::io::Result<Vec<_>>>()
                .map_err(|e| apply_error(&src_dir, e))?;
            entries.sort_by_key(|entry| entry.file_name());

            for entry in entries {
                let name = entry.file_name();
                let src_path = entry.path();

                if self.plan.is_excluded(&name.to_string_lossy()) {
                    tracing::debug!("Protected entry {}, skipping", src_path.display());
                    report.skipped.push(src_path);
                    continue;
                }

                let file_type = entry.file_type().map_err(|e| apply_error(&src_path, e))?;
                if file_type.is_symlink() {
                    tracing::warn!("Symbolic link {}, skipping", src_path.display());
                    report.links_skipped.push(src_path);
                    continue;
                }

                let dst_path = dst_dir.join(&name);
                if file_type.is_dir() {
                    pending.push((src_path, dst_path));
                } else {
                    copy_file(&src_path, &dst_path)?;
                    report.files_copied += 1;
                }
            }
        }

        Ok(())
    }
}

fn copy_file(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target).map_err(|e| apply_error(target, e))?;
    Ok(())
}

fn apply_error(path: &Path, err: std::io::Error) -> StagehandError {
    StagehandError::ApplyFailed {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
