use crate::core::archive::strip_archive_suffix;
use crate::core::download::checksum_for;
use crate::core::http::{fetch_text, Transport};
use crate::error::{GmError, Result};
use serde::Deserialize;
use tracing::{debug, warn};

const API_BASE: &str = "https://api.github.com";

/// Suffix of the release asset listing `<digest>  <file>` for every other asset.
pub const CHECKSUMS_SUFFIX: &str = "_checksums.txt";

#[derive(Debug, Deserialize, Clone)]
struct ApiRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<ApiAsset>,
}

#[derive(Debug, Deserialize, Clone)]
struct ApiAsset {
    name: String,
    browser_download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub url: String,
}

/// An upstream release, fetched fresh for each operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub assets: Vec<Asset>,
    /// Raw contents of the checksum companion asset, when one was published and fetched.
    pub checksums: Option<String>,
}

impl Release {
    /// Finds the archive whose name carries an `_<os>.<arch>` platform segment.
    pub fn find_asset(&self, os: &str, arch: &str) -> Result<&Asset> {
        self.assets
            .iter()
            .find(|asset| asset_matches(&asset.name, os, arch))
            .ok_or_else(|| GmError::PlatformNotSupported {
                os: os.to_string(),
                arch: arch.to_string(),
            })
    }

    /// Expected digest of `asset_name`; [`GmError::ChecksumNotFound`] when the list is
    /// missing or has no line for it.
    pub fn checksum(&self, asset_name: &str) -> Result<String> {
        self.checksums
            .as_deref()
            .and_then(|list| checksum_for(list, asset_name))
            .ok_or_else(|| GmError::ChecksumNotFound {
                name: asset_name.to_string(),
            })
    }
}

fn asset_matches(name: &str, os: &str, arch: &str) -> bool {
    let Some(stem) = strip_archive_suffix(name) else {
        return false;
    };
    stem.split('_').skip(1).any(|segment| {
        segment
            .split_once('.')
            .is_some_and(|(asset_os, asset_arch)| asset_os == os && asset_arch == arch)
    })
}

pub struct GitHubClient<'a, T: Transport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: Transport + ?Sized> GitHubClient<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    pub fn releases_url(owner: &str, repo: &str) -> String {
        format!("{API_BASE}/repos/{owner}/{repo}/releases?per_page=1&page=1")
    }

    /// Newest release of `owner/repo`, or `None` if the repository has none.
    ///
    /// The checksum companion is downloaded eagerly; failing to fetch it only leaves
    /// [`Release::checksums`] empty.
    pub fn latest_release(&self, owner: &str, repo: &str) -> Result<Option<Release>> {
        let url = Self::releases_url(owner, repo);
        let body = self
            .transport
            .get(&url)
            .map_err(|e| GmError::resolution_failed(format!("list releases: {e}")))?;
        if !body.is_success() {
            return Err(GmError::resolution_failed(format!(
                "list releases of {owner}/{repo}: HTTP {}",
                body.status
            )));
        }

        let releases: Vec<ApiRelease> = serde_json::from_reader(body.reader)
            .map_err(|e| GmError::resolution_failed(format!("parse releases: {e}")))?;
        let Some(newest) = releases.into_iter().next() else {
            return Ok(None);
        };
        debug!(tag = %newest.tag_name, assets = newest.assets.len(), "newest release");

        Ok(Some(self.prepare(newest)))
    }

    fn prepare(&self, release: ApiRelease) -> Release {
        let mut checksums = None;
        let mut assets = Vec::with_capacity(release.assets.len());

        for asset in release.assets {
            if asset.name.ends_with(CHECKSUMS_SUFFIX) {
                match fetch_text(self.transport, &asset.browser_download_url) {
                    Ok(text) => checksums = Some(text),
                    Err(e) => warn!(asset = %asset.name, error = %e, "failed to fetch checksums"),
                }
            }
            assets.push(Asset {
                name: asset.name,
                url: asset.browser_download_url,
            });
        }

        Release {
            version: release.tag_name.trim().to_string(),
            assets,
            checksums,
        }
    }
}
