//! Archive installation: unpack, stage binaries, merge data directories.
//!
//! A downloaded archive is unpacked into a scratch directory next to it
//! (the archive path minus its extension). Binaries that replace an
//! installed component move to the staging directory, where the host picks
//! them up on its next restart. Top-level directories named after an
//! installed component are merged one level deep into that component's live
//! directory: new entries move in, entries that already exist are discarded.
//! Live files are never overwritten.
//!
//! ```text
//! Idle → Extracting → RelocatingBinaries → MergingDataDirectories → CleaningUp → Done
//!            └──────────────┴───────────────────────┴──────────→ CleaningUp → Failed
//! ```
//!
//! Clean-up runs on both paths: the scratch tree and the archive are removed
//! whether or not installation succeeded.

use crate::config::{StagingPaths, UpdaterConfig};
use crate::download::copy_chunked;
use crate::error::{Result, UpdateError};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Stage of an archive installation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstallState {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// Unpacking archive entries into the scratch directory.
    Extracting,
    /// Moving matching binaries into the staging directory.
    RelocatingBinaries,
    /// Merging component data directories into the install root.
    MergingDataDirectories,
    /// Removing the scratch tree and the archive.
    CleaningUp,
    /// Installation finished.
    Done,
    /// Installation aborted; clean-up was still attempted.
    Failed,
}

impl std::fmt::Display for InstallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Extracting => write!(f, "extracting"),
            Self::RelocatingBinaries => write!(f, "relocating binaries"),
            Self::MergingDataDirectories => write!(f, "merging data directories"),
            Self::CleaningUp => write!(f, "cleaning up"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// What an installation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Archive-relative paths of every extracted file.
    pub extracted_files: Vec<PathBuf>,
    /// Binaries moved into the staging directory (destination paths).
    pub relocated_binaries: Vec<PathBuf>,
    /// Entries moved into the install root (destination paths).
    pub merged_entries: Vec<PathBuf>,
    /// Incoming entries dropped because the live tree already had them.
    pub discarded_entries: Vec<PathBuf>,
    /// Final state of the installation.
    pub state: InstallState,
}

/// Unpacks downloaded archives into a live installation.
#[derive(Debug, Clone)]
pub struct ArchiveInstaller {
    paths: StagingPaths,
    archive_extension: String,
    binary_extension: String,
    chunk_size: usize,
}

impl ArchiveInstaller {
    /// Installer for the given directories and file extensions.
    pub fn new(
        paths: StagingPaths,
        archive_extension: impl Into<String>,
        binary_extension: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            paths,
            archive_extension: archive_extension.into(),
            binary_extension: binary_extension.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Installer configured from an [`UpdaterConfig`].
    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self::new(
            config.paths.clone(),
            config.archive_extension.clone(),
            config.binary_extension.clone(),
            config.chunk_size,
        )
    }

    /// Whether `path` names an archive this installer unpacks.
    pub fn is_archive(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&self.archive_extension))
    }

    /// Scratch directory an archive is unpacked into: its path minus the extension.
    pub fn scratch_dir(&self, archive: &Path) -> Option<PathBuf> {
        let name = archive.file_name()?.to_str()?;
        let stem = name.strip_suffix(&self.archive_extension)?;
        if stem.is_empty() {
            return None;
        }
        Some(archive.with_file_name(stem))
    }

    /// Install `archive`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Install`] if `archive` is not an archive, or if
    /// any extraction, relocation or merge step fails. The scratch tree and
    /// the archive are removed in either case.
    pub fn install(&self, archive: &Path) -> Result<InstallReport> {
        let scratch = self.scratch_dir(archive).ok_or_else(|| {
            UpdateError::Install(format!(
                "{} is not a {} archive",
                archive.display(),
                self.archive_extension
            ))
        })?;

        let mut run = InstallRun::default();
        let outcome = self.run_stages(archive, &scratch, &mut run);

        run.transition(InstallState::CleaningUp);
        clean_up(archive, &scratch);

        match outcome {
            Ok(()) => {
                run.transition(InstallState::Done);
                tracing::info!(
                    relocated = run.report.relocated_binaries.len(),
                    merged = run.report.merged_entries.len(),
                    discarded = run.report.discarded_entries.len(),
                    "archive installed"
                );
                Ok(run.report)
            }
            Err(e) => {
                run.transition(InstallState::Failed);
                tracing::warn!("The updater tried to unpack a new update file, but was unsuccessful: {e}");
                Err(e)
            }
        }
    }

    fn run_stages(&self, archive: &Path, scratch: &Path, run: &mut InstallRun) -> Result<()> {
        run.transition(InstallState::Extracting);
        self.extract(archive, scratch, &mut run.report)
            .map_err(|e| stage_error(InstallState::Extracting, e))?;

        let installed = installed_components(&self.paths.install_root)
            .map_err(|e| stage_error(InstallState::RelocatingBinaries, e))?;

        run.transition(InstallState::RelocatingBinaries);
        self.relocate_binaries(scratch, &installed, &mut run.report)
            .map_err(|e| stage_error(InstallState::RelocatingBinaries, e))?;

        run.transition(InstallState::MergingDataDirectories);
        self.merge_data_directories(scratch, &installed, &mut run.report)
            .map_err(|e| stage_error(InstallState::MergingDataDirectories, e))?;

        Ok(())
    }

    fn extract(&self, archive: &Path, scratch: &Path, report: &mut InstallReport) -> Result<()> {
        if scratch.exists() {
            tracing::debug!(dir = %scratch.display(), "removing leftover scratch directory");
            fs::remove_dir_all(scratch)?;
        }
        fs::create_dir_all(scratch)?;

        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(BufReader::new(file))
            .map_err(|e| UpdateError::Install(format!("cannot open {}: {e}", archive.display())))?;

        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|e| UpdateError::Install(format!("cannot read entry {index}: {e}")))?;
            if entry.is_dir() {
                continue;
            }
            let Some(relative) = entry.enclosed_name() else {
                tracing::warn!(entry = entry.name(), "skipping archive entry outside the extraction root");
                continue;
            };

            let target = scratch.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = BufWriter::with_capacity(self.chunk_size, File::create(&target)?);
            let bytes = copy_chunked(&mut entry, &mut out, self.chunk_size)?;
            tracing::trace!(path = %target.display(), bytes, "extracted");
            report.extracted_files.push(relative.to_path_buf());
        }
        Ok(())
    }

    fn relocate_binaries(
        &self,
        scratch: &Path,
        installed: &HashSet<String>,
        report: &mut InstallReport,
    ) -> Result<()> {
        for relative in &report.extracted_files {
            let Some(name) = relative.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(&self.binary_extension) || !installed.contains(name) {
                continue;
            }

            let source = scratch.join(relative);
            if !source.is_file() {
                // An earlier entry with the same name was already moved.
                continue;
            }
            fs::create_dir_all(&self.paths.download_directory)?;
            let destination = self.paths.download_directory.join(name);
            if destination.is_file() {
                fs::remove_file(&destination)?;
            }
            move_path(&source, &destination)?;
            tracing::info!(binary = name, "staged for next restart");
            report.relocated_binaries.push(destination);
        }
        Ok(())
    }

    fn merge_data_directories(
        &self,
        scratch: &Path,
        installed: &HashSet<String>,
        report: &mut InstallReport,
    ) -> Result<()> {
        for entry in fs::read_dir(scratch)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !installed.contains(name) {
                tracing::debug!(dir = name, "no installed component of this name; not merging");
                continue;
            }
            let live = self.paths.install_root.join(name);
            if !live.is_dir() {
                tracing::debug!(dir = name, "installed entry is not a directory; not merging");
                continue;
            }

            merge_one_level(&entry.path(), &live, report)?;

            if let Err(e) = fs::remove_dir(entry.path()) {
                tracing::debug!(dir = name, "merged scratch directory not removed: {e}");
            }
        }
        Ok(())
    }
}

/// Move every entry of `incoming` into `live` unless `live` already has one
/// of that name, in which case the incoming copy is deleted.
fn merge_one_level(incoming: &Path, live: &Path, report: &mut InstallReport) -> Result<()> {
    for child in fs::read_dir(incoming)? {
        let child = child?;
        let source = child.path();
        let target = live.join(child.file_name());

        if target.symlink_metadata().is_ok() {
            if child.file_type()?.is_dir() {
                fs::remove_dir_all(&source)?;
            } else {
                fs::remove_file(&source)?;
            }
            tracing::debug!(path = %target.display(), "kept existing entry");
            report.discarded_entries.push(source);
        } else {
            move_path(&source, &target)?;
            tracing::debug!(path = %target.display(), "merged new entry");
            report.merged_entries.push(target);
        }
    }
    Ok(())
}

/// Names of the entries directly inside the install root.
pub fn installed_components(install_root: &Path) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in fs::read_dir(install_root)? {
        if let Some(name) = entry?.file_name().to_str() {
            names.insert(name.to_owned());
        }
    }
    Ok(names)
}

/// Rename `from` to `to`, copying across filesystems when a rename is refused.
fn move_path(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(from = %from.display(), "rename failed ({rename_err}); copying");
            if from.is_dir() {
                copy_dir(from, to)?;
                fs::remove_dir_all(from)
            } else {
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
        }
    }
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Remove the scratch tree and the archive. Failures are logged only.
fn clean_up(archive: &Path, scratch: &Path) {
    if scratch.exists() {
        if let Err(e) = fs::remove_dir_all(scratch) {
            tracing::warn!(dir = %scratch.display(), "cannot remove scratch directory: {e}");
        }
    }
    if archive.exists() {
        if let Err(e) = fs::remove_file(archive) {
            tracing::warn!(path = %archive.display(), "cannot remove archive: {e}");
        }
    }
}

fn stage_error(state: InstallState, err: UpdateError) -> UpdateError {
    match err {
        UpdateError::Install(msg) => UpdateError::Install(format!("{state}: {msg}")),
        other => UpdateError::Install(format!("{state}: {other}")),
    }
}

#[derive(Debug, Default)]
struct InstallRun {
    report: InstallReport,
}

impl InstallRun {
    fn transition(&mut self, next: InstallState) {
        tracing::debug!(from = %self.report.state, to = %next, "install state");
        self.report.state = next;
    }
}
