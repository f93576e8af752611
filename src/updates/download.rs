//! Resumable archive download.
//!
//! A download resumes from whatever is already on disk: the size of the
//! existing file is the offset sent in a `Range: bytes=N-` header. Nothing
//! else is persisted between runs. The partial file is never deleted on
//! failure, so an interrupted transfer picks up where it stopped next time.
//!
//! Server replies are reconciled as follows:
//!
//! | status | action |
//! |--------|--------|
//! | `206`  | append; total is offset + `Content-Length` |
//! | `200`  | range ignored; truncate and restart from zero |
//! | `416`  | file already complete; leave it untouched |
//! | other 2xx | append when resuming, otherwise truncate |

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::cancel::CancellationToken;
use crate::error::{Result, StagehandError};
use crate::events::{EventSink, LifecycleEvent};

/// Bytes between two progress events.
pub const PROGRESS_INTERVAL_BYTES: u64 = 1024 * 1024;

const CHUNK_SIZE: usize = 64 * 1024;

/// Progress of a single download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadState {
    /// File being written.
    pub destination_path: PathBuf,
    /// Bytes present in the destination file.
    pub bytes_written: u64,
    /// Expected final size, or 0 when the server did not say.
    pub total_bytes: u64,
    /// Whether the run continues a previous partial transfer.
    pub is_resuming: bool,
}

impl DownloadState {
    /// Reconstruct the state from the destination file, if any.
    pub fn inspect(destination: &Path) -> io::Result<Self> {
        let (bytes_written, is_resuming) = match fs::metadata(destination) {
            Ok(meta) if meta.is_file() => (meta.len(), true),
            Ok(_) => {
                return Err(io::Error::other(format!(
                    "{} exists and is not a file",
                    destination.display()
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => (0, false),
            Err(e) => return Err(e),
        };

        Ok(Self {
            destination_path: destination.to_path_buf(),
            bytes_written,
            total_bytes: 0,
            is_resuming,
        })
    }

    /// Completion percentage, 0 when the total is unknown.
    pub fn percent(&self) -> u8 {
        match self.progress_event() {
            LifecycleEvent::Downloading { percent, .. } => percent,
            _ => 0,
        }
    }

    /// Whether every expected byte is on disk.
    pub fn is_complete(&self) -> bool {
        self.total_bytes == 0 || self.bytes_written >= self.total_bytes
    }

    fn progress_event(&self) -> LifecycleEvent {
        LifecycleEvent::downloading(self.bytes_written, self.total_bytes)
    }
}

/// Decides when a progress event is due.
///
/// Fires each time the transfer crosses a whole interval boundary rather
/// than on every chunk.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: u64,
    next_threshold: u64,
    last_reported: Option<u64>,
}

impl ProgressThrottle {
    /// Start throttling from `start` bytes.
    pub fn new(interval: u64, start: u64) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            next_threshold: (start / interval + 1) * interval,
            last_reported: None,
        }
    }

    /// Record `bytes` written; returns true when an event should be emitted.
    pub fn update(&mut self, bytes: u64) -> bool {
        if bytes < self.next_threshold {
            return false;
        }
        self.next_threshold = (bytes / self.interval + 1) * self.interval;
        self.last_reported = Some(bytes);
        true
    }

    /// Whether the final byte count still needs reporting.
    pub fn needs_final(&self, bytes: u64) -> bool {
        self.last_reported != Some(bytes)
    }
}

/// How the destination file is opened for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Append,
    Truncate,
}

/// Streams a remote archive to disk, resuming partial transfers.
pub struct ResumableDownloader {
    client: Client,
    cancel: CancellationToken,
    progress_interval: u64,
}

impl ResumableDownloader {
    /// Create a downloader.
    ///
    /// The client carries no overall timeout: a slow transfer just takes
    /// longer, and an interrupted one is resumed on the next run.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| StagehandError::Other(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cancel: CancellationToken::new(),
            progress_interval: PROGRESS_INTERVAL_BYTES,
        })
    }

    /// Observe the given cancellation token between chunks.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Override the progress interval.
    pub fn with_progress_interval(mut self, bytes: u64) -> Self {
        self.progress_interval = bytes.max(1);
        self
    }

    /// Download `url` to `destination`, resuming if a partial file exists.
    ///
    /// # Errors
    ///
    /// Returns `DownloadFailed` for network, HTTP or stream errors and
    /// `Cancelled` when the token fires. The destination file is kept in
    /// both cases.
    pub fn download(
        &self,
        url: &str,
        destination: &Path,
        sink: &mut dyn EventSink,
    ) -> Result<DownloadState> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut state = DownloadState::inspect(destination)?;
        self.cancel.check("download")?;

        let mut request = self.client.get(url);
        if state.is_resuming {
            tracing::info!(
                "Resuming download of {} at byte {}",
                url,
                state.bytes_written
            );
            request = request.header(RANGE, format!("bytes={}-", state.bytes_written));
        } else {
            tracing::info!("Downloading {}", url);
        }

        let response = request.send().map_err(|e| failed(url, e))?;
        let status = response.status();
        let content_length = response.content_length().unwrap_or(0);

        let mode = match status {
            StatusCode::RANGE_NOT_SATISFIABLE if state.is_resuming => {
                tracing::info!(
                    "Server reports {} already complete ({} bytes)",
                    destination.display(),
                    state.bytes_written
                );
                state.total_bytes = state.bytes_written;
                sink.emit(state.progress_event());
                return Ok(state);
            }
            StatusCode::OK => {
                if state.is_resuming {
                    tracing::warn!("Server ignored range request, restarting download from zero");
                }
                state.is_resuming = false;
                state.bytes_written = 0;
                state.total_bytes = content_length;
                WriteMode::Truncate
            }
            StatusCode::PARTIAL_CONTENT => {
                verify_content_range(&response, state.bytes_written)
                    .map_err(|message| StagehandError::DownloadFailed {
                        url: url.to_string(),
                        message,
                    })?;
                state.total_bytes = state.bytes_written + content_length;
                WriteMode::Append
            }
            s if s.is_success() => {
                state.total_bytes = content_length;
                if state.is_resuming {
                    WriteMode::Append
                } else {
                    WriteMode::Truncate
                }
            }
            s => {
                return Err(StagehandError::DownloadFailed {
                    url: url.to_string(),
                    message: format!("HTTP {}", s),
                });
            }
        };

        tracing::debug!(
            "HTTP {} for {}: writing in {:?} mode, expecting {} bytes",
            status,
            url,
            mode,
            state.total_bytes
        );

        let file = open_destination(destination, mode)?;
        self.stream(url, response, file, &mut state, sink)?;
        Ok(state)
    }

    fn stream(
        &self,
        url: &str,
        mut response: Response,
        file: File,
        state: &mut DownloadState,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut throttle = ProgressThrottle::new(self.progress_interval, state.bytes_written);
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            if let Err(e) = self.cancel.check("download") {
                writer.flush()?;
                return Err(e);
            }

            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Keep what arrived so the next run resumes after it.
                    writer.flush()?;
                    return Err(failed(url, e));
                }
            };

            writer.write_all(&buf[..n])?;
            state.bytes_written += n as u64;

            if throttle.update(state.bytes_written) {
                sink.emit(state.progress_event());
            }
        }

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        if !state.is_complete() {
            return Err(StagehandError::DownloadFailed {
                url: url.to_string(),
                message: format!(
                    "connection closed after {} of {} bytes",
                    state.bytes_written, state.total_bytes
                ),
            });
        }

        if state.total_bytes == 0 {
            state.total_bytes = state.bytes_written;
        }
        if throttle.needs_final(state.bytes_written) {
            sink.emit(state.progress_event());
        }

        tracing::info!(
            "Downloaded {} bytes to {}",
            state.bytes_written,
            state.destination_path.display()
        );
        Ok(())
    }
}

fn open_destination(path: &Path, mode: WriteMode) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        WriteMode::Append => options.append(true),
        WriteMode::Truncate => options.write(true).truncate(true),
    };
    options.open(path)
}

/// Check that a `206` reply starts where the local file ends.
fn verify_content_range(response: &Response, offset: u64) -> std::result::Result<(), String> {
    let Some(value) = response.headers().get(CONTENT_RANGE) else {
        return Ok(());
    };
    let Some(start) = value.to_str().ok().and_then(content_range_start) else {
        return Ok(());
    };

    if start != offset {
        return Err(format!(
            "server resumed at byte {} but {} bytes are on disk",
            start, offset
        ));
    }
    Ok(())
}

/// Parse the first byte position of `bytes START-END/TOTAL`.
fn content_range_start(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes")?.trim_start();
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}

fn failed(url: &str, err: impl std::fmt::Display) -> StagehandError {
    StagehandError::DownloadFailed {
        url: url.to_string(),
        message: err.to_string(),
    }
}
