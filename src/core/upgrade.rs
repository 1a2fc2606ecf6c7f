//! Replacing the running `gm` executable with the newest published release.

use crate::core::archive;
use crate::core::download::Downloader;
use crate::core::github::{GitHubClient, Release};
use crate::core::http::Transport;
use crate::core::platform::Platform;
use crate::core::progress::Tracker;
use crate::core::version::normalize;
use crate::error::{GmError, Result};
use crate::utils::fs;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ceiling on resolving the newest release before an upgrade starts.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(15);

pub const BACKUP_SUFFIX: &str = ".bak";

pub fn current_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Splits a repository URL such as `https://github.com/x-dvr/gm` into owner and name.
pub fn repository_slug(repository: &str) -> Result<(String, String)> {
    let path = repository
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("github.com/")
        .trim_end_matches('/')
        .trim_end_matches(".git");

    match path.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(GmError::NoBuildInfo {
            message: format!("cannot derive a repository from {repository:?}"),
        }),
    }
}

/// Whether release `tag` is strictly newer than `current`.
///
/// An unparsable current version counts as older than any valid tag; an unparsable
/// tag is never an update.
pub fn is_newer(current: &str, tag: &str) -> bool {
    let current = semver::Version::parse(normalize::strip_tag_prefix(current));
    let candidate = semver::Version::parse(normalize::strip_tag_prefix(tag));
    match (current, candidate) {
        (Ok(current), Ok(candidate)) => candidate > current,
        (Err(_), Ok(_)) => true,
        (_, Err(e)) => {
            warn!(%tag, error = %e, "ignoring release with invalid version");
            false
        }
    }
}

/// Newest release of `gm` if it is newer than the running binary.
pub fn check_for_update<T: Transport + ?Sized>(transport: &T) -> Result<Option<Release>> {
    let (owner, repo) = repository_slug(env!("CARGO_PKG_REPOSITORY"))?;
    check_release(transport, &owner, &repo, current_version())
}

pub fn check_release<T: Transport + ?Sized>(
    transport: &T,
    owner: &str,
    repo: &str,
    current: &str,
) -> Result<Option<Release>> {
    let Some(release) = GitHubClient::new(transport).latest_release(owner, repo)? else {
        debug!(%owner, %repo, "repository has no releases");
        return Ok(None);
    };
    if !is_newer(current, &release.version) {
        debug!(%current, latest = %release.version, "already up to date");
        return Ok(None);
    }
    Ok(Some(release))
}

/// Runs `job` on a worker thread, giving up after `timeout`.
///
/// A timed-out worker is abandoned rather than interrupted; anything it already wrote
/// to disk stays there.
pub fn with_timeout<R, F>(timeout: Duration, job: F) -> Result<R>
where
    R: Send + 'static,
    F: FnOnce() -> Result<R> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let _ = tx.send(job());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(GmError::Timeout {
            seconds: timeout.as_secs(),
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(GmError::resolution_failed(
            "update check stopped unexpectedly",
        )),
    }
}

/// `<exe>.bak` next to the executable.
pub fn backup_path(exe: &Path) -> PathBuf {
    let mut name = OsString::from(exe.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

pub struct Upgrader<'a, T: Transport + ?Sized> {
    transport: &'a T,
    tracker: &'a Tracker,
    exe_path: PathBuf,
    install_dir: PathBuf,
}

impl<'a, T: Transport + ?Sized> Upgrader<'a, T> {
    /// Upgrades the executable at `exe_path`, extracting next to it.
    pub fn new(transport: &'a T, tracker: &'a Tracker, exe_path: PathBuf) -> Result<Self> {
        let install_dir = exe_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| GmError::config_error(format!("{} has no parent", exe_path.display())))?;
        Ok(Self {
            transport,
            tracker,
            exe_path,
            install_dir,
        })
    }

    pub fn for_current_exe(transport: &'a T, tracker: &'a Tracker) -> Result<Self> {
        Self::new(transport, tracker, std::env::current_exe()?)
    }

    /// Downloads the asset of `release` for `platform` and swaps it in.
    ///
    /// Returns the backup location of the previous executable. Once the executable has
    /// been renamed, a failed extraction is not rolled back.
    pub fn apply(&self, release: &Release, platform: &Platform) -> Result<PathBuf> {
        let asset = release.find_asset(&platform.os, &platform.arch)?;
        info!(version = %release.version, asset = %asset.name, "upgrading");

        let expected = match release.checksum(&asset.name) {
            Ok(sum) => Some(sum),
            Err(GmError::ChecksumNotFound { .. }) => {
                warn!(asset = %asset.name, "no checksum published, skipping verification");
                self.tracker.info("Checksum not published, skipping verification");
                None
            }
            Err(e) => return Err(e),
        };

        let downloaded = Downloader::new(self.transport, self.tracker).fetch(&asset.url, &asset.name)?;
        if let Some(expected) = &expected {
            downloaded.verify(expected)?;
        }

        let backup = backup_path(&self.exe_path);
        if let Err(source) = std::fs::rename(&self.exe_path, &backup) {
            discard(&downloaded.path);
            return Err(GmError::BackupFailed {
                path: self.exe_path.clone(),
                source,
            });
        }
        debug!(backup = %backup.display(), "previous executable backed up");

        archive::unpack(&downloaded.path, &self.install_dir, None, self.tracker)?;
        fs::remove_file_if_exists(&downloaded.path)?;

        self.tracker.info("Successfully updated!");
        info!(version = %release.version, "upgrade complete");
        Ok(backup)
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file_if_exists(path) {
        warn!(path = %path.display(), error = %e, "failed to remove downloaded update");
    }
}
