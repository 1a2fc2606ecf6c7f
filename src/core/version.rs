use crate::core::config::{self, Config, CURRENT_ALIAS};
use crate::core::http::Transport;
use crate::error::{GmError, Result};
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::debug;

pub const LATEST: &str = "latest";

/// Version normalization utilities
pub mod normalize {
    pub const TOOLCHAIN_PREFIX: &str = "go";

    /// Canonical toolchain directory name: trims whitespace and adds the `go` prefix.
    /// Examples: "1.22.0" -> "go1.22.0", " go1.22.0\n" -> "go1.22.0"
    pub fn to_toolchain_version(version: &str) -> String {
        let version = version.trim();
        if version.starts_with(TOOLCHAIN_PREFIX) {
            version.to_string()
        } else {
            format!("{TOOLCHAIN_PREFIX}{version}")
        }
    }

    /// Release tag without its `v` prefix, for semver parsing.
    /// Examples: "v0.4.0" -> "0.4.0", "0.4.0" -> "0.4.0"
    pub fn strip_tag_prefix(tag: &str) -> &str {
        let tag = tag.trim();
        tag.strip_prefix('v').unwrap_or(tag)
    }
}

/// Rejects names that cannot safely be used as a directory under `versions/`.
pub fn validate_version(version: &str) -> Result<()> {
    let invalid = version.is_empty()
        || version == CURRENT_ALIAS
        || version.contains("..")
        || version.contains('/')
        || version.contains('\\');

    if invalid {
        return Err(GmError::InvalidVersion {
            version: version.to_string(),
        });
    }
    Ok(())
}

/// Queries the plaintext "latest version" endpoint; its first line is the tag.
pub fn latest_toolchain_version<T: Transport + ?Sized>(transport: &T, url: &str) -> Result<String> {
    let body = transport
        .get(url)
        .map_err(|e| GmError::resolution_failed(format!("get latest Go version: {e}")))?;
    if !body.is_success() {
        return Err(GmError::resolution_failed(format!(
            "get latest Go version: HTTP code {}",
            body.status
        )));
    }

    let text = body
        .into_string()
        .map_err(|e| GmError::resolution_failed(format!("extract latest Go version: {e}")))?;
    let line = text.lines().next().map(str::trim).unwrap_or_default();
    if line.is_empty() {
        return Err(GmError::resolution_failed(
            "extract latest Go version: empty response",
        ));
    }

    let version = normalize::to_toolchain_version(line);
    debug!(%version, "resolved latest toolchain");
    Ok(version)
}

/// Turns user input (`latest`, `1.22`, `go1.22`) into a validated directory name.
pub fn resolve_requested<T: Transport + ?Sized>(
    transport: &T,
    config: &Config,
    requested: &str,
) -> Result<String> {
    let version = if requested.trim() == LATEST {
        latest_toolchain_version(transport, &config.latest_version_url)?
    } else {
        normalize::to_toolchain_version(requested)
    };
    validate_version(&version)?;
    Ok(version)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledToolchain {
    pub version: String,
    pub path: PathBuf,
    /// Whether the success marker is present; unmarked directories are leftovers of a failed install.
    pub complete: bool,
}

/// Enumerates `go*` directories under `versions/`, oldest first.
pub fn list_installed(config: &Config) -> Result<Vec<InstalledToolchain>> {
    let versions_dir = config.versions_dir();
    let entries = match std::fs::read_dir(&versions_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(e.into()),
    };

    let mut installed = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !name.starts_with(normalize::TOOLCHAIN_PREFIX) {
            continue;
        }
        let path = entry.path();
        installed.push(InstalledToolchain {
            complete: config::is_marked(&path),
            version: name,
            path,
        });
    }

    installed.sort_by(|a, b| version_compare(&a.version, &b.version));
    Ok(installed)
}

/// Orders `go1.9` before `go1.10` and `go1.21rc1` before `go1.21.0`.
pub fn version_compare(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches(normalize::TOOLCHAIN_PREFIX);
    let b = b.trim_start_matches(normalize::TOOLCHAIN_PREFIX);

    let a_parts: Vec<&str> = a.split('.').collect();
    let b_parts: Vec<&str> = b.split('.').collect();

    for (a_part, b_part) in a_parts.iter().zip(b_parts.iter()) {
        match (leading_number(a_part), leading_number(b_part)) {
            ((Some(a_num), a_rest), (Some(b_num), b_rest)) => match a_num.cmp(&b_num) {
                Ordering::Equal => match (a_rest.is_empty(), b_rest.is_empty()) {
                    (true, true) => continue,
                    // a pre-release suffix sorts before the final release
                    (false, true) => return Ordering::Less,
                    (true, false) => return Ordering::Greater,
                    (false, false) => match a_rest.cmp(b_rest) {
                        Ordering::Equal => continue,
                        other => return other,
                    },
                },
                other => return other,
            },
            _ => match a_part.cmp(b_part) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }

    a_parts.len().cmp(&b_parts.len())
}

fn leading_number(part: &str) -> (Option<u64>, &str) {
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    (part[..end].parse().ok(), &part[end..])
}
