use crate::core::http::Transport;
use crate::core::progress::Tracker;
use crate::error::{GmError, Result};
use crate::utils::fs;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// A file on disk together with the digest observed while it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

impl Downloaded {
    /// Compares the streamed digest against `expected_hex`, deleting the file on mismatch.
    pub fn verify(&self, expected_hex: &str) -> Result<()> {
        check_digest(&self.path, expected_hex, &self.sha256)
    }
}

pub struct Downloader<'a, T: Transport + ?Sized> {
    transport: &'a T,
    tracker: &'a Tracker,
}

impl<'a, T: Transport + ?Sized> Downloader<'a, T> {
    pub fn new(transport: &'a T, tracker: &'a Tracker) -> Self {
        Self { transport, tracker }
    }

    /// Downloads `url` into a fresh temporary file named after `name`.
    ///
    /// The temporary file is removed automatically if anything fails before it is returned.
    pub fn fetch(&self, url: &str, name: &str) -> Result<Downloaded> {
        let mut temp = tempfile::Builder::new()
            .prefix("gm-up-")
            .suffix(&format!(".{name}"))
            .tempfile()?;

        let (size, sha256) = self.stream(url, temp.as_file_mut())?;
        let (_, path) = temp.keep().map_err(|e| GmError::Io(e.error))?;

        Ok(Downloaded { path, size, sha256 })
    }

    /// Downloads `url` to `dest`, removing `dest` again if the transfer fails.
    pub fn download_to(&self, url: &str, dest: &Path) -> Result<Downloaded> {
        if let Some(parent) = dest.parent() {
            fs::ensure_dir_exists(parent)?;
        }

        let mut file = File::create(dest)?;
        match self.stream(url, &mut file) {
            Ok((size, sha256)) => Ok(Downloaded {
                path: dest.to_path_buf(),
                size,
                sha256,
            }),
            Err(e) => {
                drop(file);
                discard(dest);
                Err(e)
            }
        }
    }

    fn stream(&self, url: &str, out: &mut File) -> Result<(u64, String)> {
        self.tracker.reset(&format!("Downloading {url} ..."));

        let mut body = self
            .transport
            .get(url)
            .map_err(|e| GmError::download_failed(url, e.to_string()))?;
        if !body.is_success() {
            return Err(GmError::download_failed(url, format!("HTTP {}", body.status)));
        }
        let total = match body.content_length {
            Some(len) if len > 0 => len,
            _ => return Err(GmError::UnknownSize { url: url.to_string() }),
        };
        self.tracker.set_size(total);

        let mut hasher = Sha256::new();
        let mut written = 0u64;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = body
                .reader
                .read(&mut buf)
                .map_err(|e| GmError::download_failed(url, e.to_string()))?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            hasher.update(&buf[..n]);
            self.tracker.advance(n as u64);
            written += n as u64;
        }
        out.flush()?;

        if written != total {
            return Err(GmError::download_failed(
                url,
                format!("copied {written} bytes; expected {total}"),
            ));
        }

        let sha256 = hex::encode(hasher.finalize());
        debug!(url, bytes = written, %sha256, "download complete");
        Ok((written, sha256))
    }

    /// Fetches a checksum companion and returns the digest for `name`.
    ///
    /// Accepts both a bare digest and `<digest>  <name>` lines; `404` means
    /// [`GmError::ChecksumNotFound`].
    pub fn fetch_checksum(&self, url: &str, name: &str) -> Result<String> {
        let body = self
            .transport
            .get(url)
            .map_err(|e| GmError::download_failed(url, e.to_string()))?;
        if body.status == 404 {
            return Err(GmError::ChecksumNotFound {
                name: name.to_string(),
            });
        }
        if !body.is_success() {
            return Err(GmError::download_failed(url, format!("HTTP {}", body.status)));
        }

        let text = body.into_string()?;
        let trimmed = text.trim();
        if !trimmed.is_empty() && !trimmed.contains(char::is_whitespace) {
            return Ok(trimmed.to_string());
        }
        checksum_for(&text, name).ok_or_else(|| GmError::ChecksumNotFound {
            name: name.to_string(),
        })
    }
}

/// Looks `name` up in a checksum list of `<hex digest><whitespace><file name>` lines.
pub fn checksum_for(checksums: &str, name: &str) -> Option<String> {
    checksums.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let digest = parts.next()?;
        let file = parts.next()?;
        (file.trim_start_matches('*') == name).then(|| digest.to_string())
    })
}

/// Hashes the file at `path` and compares against `expected_hex`, deleting it on mismatch.
pub fn verify_file(path: &Path, expected_hex: &str) -> Result<()> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    drop(file);

    let actual = hex::encode(hasher.finalize());
    check_digest(path, expected_hex, &actual)
}

fn check_digest(path: &Path, expected_hex: &str, actual: &str) -> Result<()> {
    if actual.eq_ignore_ascii_case(expected_hex.trim()) {
        return Ok(());
    }
    discard(path);
    Err(GmError::ChecksumMismatch {
        path: path.to_path_buf(),
        expected: expected_hex.trim().to_string(),
        actual: actual.to_string(),
    })
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file_if_exists(path) {
        warn!(path = %path.display(), error = %e, "failed to remove rejected download");
    }
}

/// Hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
