//! Archive extraction into an isolated staging directory.
//!
//! Release archives wrap their content in a single generated directory
//! (for GitHub zipballs, `<owner>-<repo>-<sha>`), so the root is discovered
//! after extraction instead of being predicted.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use super::cleanup::remove_dir_if_exists;
use crate::error::{Result, StagehandError};

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingManifest {
    /// Directory the archive was extracted into.
    pub staging_dir: PathBuf,
    /// Name of the single top-level directory in the archive.
    pub root_entry_name: String,
}

impl StagingManifest {
    /// Full path of the staged release root.
    pub fn root_path(&self) -> PathBuf {
        self.staging_dir.join(&self.root_entry_name)
    }
}

/// Extracts downloaded archives into a staging directory.
#[derive(Debug, Clone)]
pub struct ArchiveStager {
    staging_dir: PathBuf,
}

impl ArchiveStager {
    /// Create a stager targeting `staging_dir`.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    /// Get the staging directory.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Extract `archive` and locate its root directory.
    ///
    /// Any staging directory left by a previous run is removed first. The
    /// archive file is deleted once extraction succeeds, and also when it
    /// is not a readable zip, so the next run downloads it afresh instead
    /// of resuming onto a bad file.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionFailed` if the archive cannot be read, or if the
    /// extracted tree does not contain exactly one top-level directory.
    pub fn stage(&self, archive: &Path) -> Result<StagingManifest> {
        if remove_dir_if_exists(&self.staging_dir).map_err(|e| {
            extraction_error(format!(
                "cannot reset staging directory {}: {}",
                self.staging_dir.display(),
                e
            ))
        })? {
            tracing::debug!("Removed stale staging directory {}", self.staging_dir.display());
        }
        fs::create_dir_all(&self.staging_dir)?;

        tracing::info!(
            "Extracting {} into {}",
            archive.display(),
            self.staging_dir.display()
        );
        self.extract(archive)?;

        if let Err(e) = fs::remove_file(archive) {
            tracing::warn!(
                "Could not delete extracted archive {}: {}",
                archive.display(),
                e
            );
        }

        let root_entry_name = discover_root(&self.staging_dir)?;
        tracing::debug!("Discovered release root '{}'", root_entry_name);

        Ok(StagingManifest {
            staging_dir: self.staging_dir.clone(),
            root_entry_name,
        })
    }

    fn extract(&self, archive: &Path) -> Result<()> {
        let file = File::open(archive).map_err(|e| {
            extraction_error(format!("cannot open archive {}: {}", archive.display(), e))
        })?;

        let mut zip = match ZipArchive::new(file) {
            Ok(zip) => zip,
            Err(e) => {
                discard_archive(archive);
                return Err(extraction_error(format!(
                    "{} is not a readable zip archive: {}",
                    archive.display(),
                    e
                )));
            }
        };

        tracing::debug!("Archive holds {} entries", zip.len());

        zip.extract(&self.staging_dir).map_err(|e| {
            extraction_error(format!("failed to extract {}: {}", archive.display(), e))
        })
    }
}

/// Find the single top-level directory under `staging_dir`.
///
/// Loose top-level files are ignored.
pub fn discover_root(staging_dir: &Path) -> Result<String> {
    let mut dirs = Vec::new();

    for entry in fs::read_dir(staging_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().into_string().map_err(|name| {
            extraction_error(format!(
                "top-level directory {:?} is not valid UTF-8",
                name
            ))
        })?;
        dirs.push(name);
    }

    dirs.sort();
    match dirs.len() {
        0 => Err(extraction_error(format!(
            "no top-level directory found in {}",
            staging_dir.display()
        ))),
        1 => Ok(dirs.remove(0)),
        _ => Err(extraction_error(format!(
            "expected one top-level directory in {}, found {}: {}",
            staging_dir.display(),
            dirs.len(),
            dirs.join(", ")
        ))),
    }
}

fn discard_archive(archive: &Path) {
    match fs::remove_file(archive) {
        Ok(()) => tracing::warn!("Deleted unreadable archive {}", archive.display()),
        Err(e) => tracing::warn!(
            "Could not delete unreadable archive {}: {}",
            archive.display(),
            e
        ),
    }
}

fn extraction_error(message: String) -> StagehandError {
    StagehandError::ExtractionFailed { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Write a zip at `path`; entries ending in `/` are directories.
    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn stage_discovers_generated_root() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("update_temp.zip");
        write_zip(
            &archive,
            &[
                ("Org-Repo-abc123/", ""),
                ("Org-Repo-abc123/dist/index.html", "<html>"),
                ("Org-Repo-abc123/server/index.js", "console.log(1)"),
            ],
        );

        let stager = ArchiveStager::new(temp.path().join("staging"));
        let manifest = stager.stage(&archive).unwrap();

        assert_eq!(manifest.root_entry_name, "Org-Repo-abc123");
        assert_eq!(
            fs::read_to_string(manifest.root_path().join("dist/index.html")).unwrap(),
            "<html>"
        );
    }

    #[test]
    fn stage_deletes_consumed_archive() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("update_temp.zip");
        write_zip(&archive, &[("root/file.txt", "x")]);

        ArchiveStager::new(temp.path().join("staging"))
            .stage(&archive)
            .unwrap();

        assert!(!archive.exists());
    }

    #[test]
    fn stage_resets_stale_staging_directory() {
        let temp = TempDir::new().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(staging.join("Old-Root-000")).unwrap();
        fs::write(staging.join("Old-Root-000/leftover.txt"), "old").unwrap();

        let archive = temp.path().join("update_temp.zip");
        write_zip(&archive, &[("New-Root-111/file.txt", "new")]);

        let manifest = ArchiveStager::new(&staging).stage(&archive).unwrap();

        assert_eq!(manifest.root_entry_name, "New-Root-111");
        assert!(!staging.join("Old-Root-000").exists());
    }

    #[test]
    fn stage_without_directory_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("update_temp.zip");
        write_zip(&archive, &[("README.md", "flat"), ("index.js", "flat")]);

        let err = ArchiveStager::new(temp.path().join("staging"))
            .stage(&archive)
            .unwrap_err();

        assert!(matches!(err, StagehandError::ExtractionFailed { .. }));
        assert!(err.to_string().contains("no top-level directory"));
    }

    #[test]
    fn stage_with_two_roots_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("update_temp.zip");
        write_zip(&archive, &[("a/file.txt", "1"), ("b/file.txt", "2")]);

        let err = ArchiveStager::new(temp.path().join("staging"))
            .stage(&archive)
            .unwrap_err();

        assert!(err.to_string().contains("found 2: a, b"));
    }

    #[test]
    fn stage_corrupt_archive_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("update_temp.zip");
        fs::write(&archive, b"this is not a zip file").unwrap();

        let err = ArchiveStager::new(temp.path().join("staging"))
            .stage(&archive)
            .unwrap_err();

        assert!(matches!(err, StagehandError::ExtractionFailed { .. }));
        assert!(err.to_string().contains("not a readable zip archive"));
        assert!(!archive.exists());
    }

    #[test]
    fn stage_missing_archive_fails() {
        let temp = TempDir::new().unwrap();
        let err = ArchiveStager::new(temp.path().join("staging"))
            .stage(&temp.path().join("missing.zip"))
            .unwrap_err();

        assert!(matches!(err, StagehandError::ExtractionFailed { .. }));
    }

    #[test]
    fn discover_root_ignores_loose_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("pax_global_header"), "").unwrap();
        fs::create_dir(temp.path().join("root")).unwrap();

        assert_eq!(discover_root(temp.path()).unwrap(), "root");
    }
}
