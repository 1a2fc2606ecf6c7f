//! Install pipeline for toolchain versions:
//! probe, download, size check, checksum, extract, mark success.

use crate::core::archive;
use crate::core::config::{Config, INSTALL_SUCCESS_MARKER};
use crate::core::download::{self, Downloader};
use crate::core::http::Transport;
use crate::core::platform::Platform;
use crate::core::progress::{format_size, Tracker};
use crate::core::version::validate_version;
use crate::error::{GmError, Result};
use crate::utils::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Root directory every toolchain archive wraps its contents in.
const ARCHIVE_ROOT: &str = "go/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    AlreadyInstalled(PathBuf),
    Installed(PathBuf),
}

impl InstallOutcome {
    pub fn path(&self) -> &Path {
        match self {
            InstallOutcome::AlreadyInstalled(path) | InstallOutcome::Installed(path) => path,
        }
    }
}

/// `<base>/<version>.<os>-<arch>.<ext>`
pub fn download_url(base_url: &str, version: &str, platform: &Platform) -> String {
    format!(
        "{}/{}.{}-{}.{}",
        base_url.trim_end_matches('/'),
        version,
        platform.os,
        platform.toolchain_arch(),
        platform.archive_ext()
    )
}

pub struct Installer<'a, T: Transport + ?Sized> {
    transport: &'a T,
    config: &'a Config,
    tracker: &'a Tracker,
    platform: Platform,
}

impl<'a, T: Transport + ?Sized> Installer<'a, T> {
    pub fn new(transport: &'a T, config: &'a Config, tracker: &'a Tracker) -> Self {
        Self {
            transport,
            config,
            tracker,
            platform: Platform::detect(),
        }
    }

    pub fn for_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Installs `version` (already normalized) into `versions/<version>/`.
    ///
    /// Names that could escape `versions/` are rejected before anything is created.
    ///
    /// A present success marker short-circuits without touching the network; the
    /// marker is written only after extraction succeeded.
    pub fn install(&self, version: &str) -> Result<InstallOutcome> {
        validate_version(version)?;
        let dest = self.config.version_dir(version);
        if self.config.is_installed(version) {
            info!(%version, path = %dest.display(), "toolchain already installed");
            return Ok(InstallOutcome::AlreadyInstalled(dest));
        }
        fs::ensure_dir_exists(&dest)?;

        let url = download_url(&self.config.download_base_url, version, &self.platform);
        let expected_size = self.probe(version, &url)?;

        let archive_name = url.rsplit('/').next().unwrap_or(version).to_string();
        let archive_file = dest.join(&archive_name);
        let downloader = Downloader::new(self.transport, self.tracker);

        if file_size(&archive_file)? != Some(expected_size) {
            info!(%version, platform = %self.platform, %url, "downloading toolchain");
            self.tracker
                .info(&format!("Downloading {archive_name} ({})", format_size(expected_size)));
            downloader.download_to(&url, &archive_file)?;
            let actual = file_size(&archive_file)?.unwrap_or(0);
            if actual != expected_size {
                discard(&archive_file);
                return Err(GmError::SizeMismatch {
                    path: archive_file,
                    expected: expected_size,
                    actual,
                });
            }
        } else {
            debug!(path = %archive_file.display(), "reusing downloaded archive");
        }

        self.tracker.info("Verifying checksum ...");
        let expected_sha = downloader.fetch_checksum(&format!("{url}.sha256"), &archive_name)?;
        download::verify_file(&archive_file, &expected_sha)?;

        info!(archive = %archive_file.display(), "unpacking");
        archive::unpack(&archive_file, &dest, Some(ARCHIVE_ROOT), self.tracker)?;
        discard(&archive_file);

        std::fs::write(dest.join(INSTALL_SUCCESS_MARKER), b"")?;
        info!(%version, "successfully installed toolchain");
        Ok(InstallOutcome::Installed(dest))
    }

    /// HEAD request distinguishing "no such release" from transport trouble; returns the size.
    fn probe(&self, version: &str, url: &str) -> Result<u64> {
        let probe = self
            .transport
            .head(url)
            .map_err(|e| GmError::download_failed(url, format!("check size: {e}")))?;

        match probe.status {
            404 => Err(GmError::NotFound {
                version: version.to_string(),
                os: self.platform.os.clone(),
                arch: self.platform.arch.clone(),
                url: url.to_string(),
            }),
            200 => match probe.content_length {
                Some(len) if len > 0 => Ok(len),
                _ => Err(GmError::UnknownSize {
                    url: url.to_string(),
                }),
            },
            status => Err(GmError::download_failed(
                url,
                format!("server returned HTTP {status} checking size"),
            )),
        }
    }
}

fn file_size(path: &Path) -> Result<Option<u64>> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file_if_exists(path) {
        warn!(path = %path.display(), error = %e, "failed to remove archive");
    }
}
