//! Artifact download into the staging directory.
//!
//! Streams the remote file to disk in fixed-size chunks. Stale archives from
//! an earlier, interrupted run are purged before the new file is written, and
//! a partially written file never survives a failed download.

use crate::error::{Result, UpdateError};
use release_feed::HttpClient;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Default copy buffer size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Streams remote artifacts to local files.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: HttpClient,
    chunk_size: usize,
    archive_extension: String,
}

impl Downloader {
    /// Downloader using `client`, copying `chunk_size` bytes at a time.
    ///
    /// Files ending in `archive_extension` found in the destination directory
    /// are treated as leftovers of a previous run and purged.
    pub fn new(client: HttpClient, chunk_size: usize, archive_extension: impl Into<String>) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
            archive_extension: archive_extension.into(),
        }
    }

    /// Download `url` to `destination_directory/file_name`.
    ///
    /// Creates the directory if absent and returns the written file's path.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Download`] if the directory cannot be created,
    /// the name is not a plain file name, the request fails or writing fails.
    pub fn fetch(&self, url: &str, destination_directory: &Path, file_name: &str) -> Result<PathBuf> {
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name == "."
            || file_name == ".."
        {
            return Err(UpdateError::Download(format!(
                "'{file_name}' is not a plain file name"
            )));
        }

        fs::create_dir_all(destination_directory).map_err(|e| {
            UpdateError::Download(format!(
                "cannot create {}: {e}",
                destination_directory.display()
            ))
        })?;

        self.purge_stale_archives(destination_directory);

        let destination = destination_directory.join(file_name);
        tracing::info!(url, destination = %destination.display(), "downloading update");

        let bytes = self.stream_to(url, &destination)?;
        tracing::debug!(bytes, "download complete");
        Ok(destination)
    }

    /// Stream `url` into `destination`.
    ///
    /// The file is only created once the server has answered; a write
    /// failure after that removes it again. A file already at `destination`
    /// is left untouched when the request itself fails.
    fn stream_to(&self, url: &str, destination: &Path) -> Result<u64> {
        let body = self
            .client
            .open(url)
            .map_err(|e| UpdateError::Download(e.to_string()))?;
        let file = File::create(destination).map_err(|e| {
            UpdateError::Download(format!("cannot create {}: {e}", destination.display()))
        })?;

        let mut reader = BufReader::new(body);
        let mut writer = BufWriter::new(file);
        match copy_chunked(&mut reader, &mut writer, self.chunk_size) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                drop(writer);
                if let Err(rm) = fs::remove_file(destination) {
                    tracing::warn!(
                        path = %destination.display(),
                        "cannot remove partial download: {rm}"
                    );
                }
                Err(UpdateError::Download(format!("download write failed: {e}")))
            }
        }
    }

    /// Remove archive leftovers of an earlier run from `directory`.
    ///
    /// Best effort: failures are logged and otherwise ignored.
    fn purge_stale_archives(&self, directory: &Path) {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %directory.display(), "cannot list staging directory: {e}");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let is_archive = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(&self.archive_extension));
            if is_archive && path.is_file() {
                tracing::debug!(path = %path.display(), "purging stale archive");
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), "cannot purge stale archive: {e}");
                }
            }
        }
    }
}

/// Copy `reader` into `writer` through a `chunk_size` buffer and flush.
pub(crate) fn copy_chunked<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
) -> io::Result<u64> {
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let count = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..count])?;
        total += count as u64;
    }
    writer.flush()?;
    Ok(total)
}

/// Local file name for a downloaded artifact.
///
/// Archives keep the last path segment of their link; anything else is
/// saved under the installed component's own file name so that it replaces
/// that component on the next restart. When the link names its archive only
/// in the query (`get?id=1&f=a.zip`), the whole tail after the last `/` is
/// kept with unsafe characters replaced, so the name still ends in the
/// archive extension.
pub fn artifact_file_name(link: &str, installed_file_name: &str, archive_extension: &str) -> String {
    if !link.ends_with(archive_extension) {
        return installed_file_name.to_owned();
    }

    let last_segment = url::Url::parse(link).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_owned))
    });
    if let Some(name) = last_segment.filter(|name| name.ends_with(archive_extension)) {
        return name;
    }

    let tail = link.rsplit('/').next().unwrap_or(link);
    tail.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
