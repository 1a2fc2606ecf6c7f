use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GmError>;

#[derive(Error, Debug)]
pub enum GmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to resolve latest version: {message}")]
    ResolutionFailed { message: String },

    #[error("No binary release of {version} for {os}/{arch} at {url}")]
    NotFound {
        version: String,
        os: String,
        arch: String,
        url: String,
    },

    #[error("Download of {url} failed: {message}")]
    DownloadFailed { url: String, message: String },

    #[error("Server did not declare a size for {url}")]
    UnknownSize { url: String },

    #[error("Downloaded file {path} size {actual} doesn't match server size {expected}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("{path} corrupt? expected SHA-256 {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Checksum for {name} not found")]
    ChecksumNotFound { name: String },

    #[error("Unsupported archive format: {name}")]
    UnsupportedFormat { name: String },

    #[error("Archive entry {name} has unsupported type")]
    UnsupportedEntryType { name: String },

    #[error("Archive contained invalid name {name:?}")]
    UnsafePath { name: String },

    #[error("Archive entry {path}: wrote {actual} bytes, expected {expected}")]
    EntrySizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Version '{version}' is not installed")]
    NotInstalled { version: String },

    #[error("Platform {os} {arch} is not supported")]
    PlatformNotSupported { os: String, arch: String },

    #[error("Failed to point {link} at {target}: {source}")]
    AliasUpdateFailed {
        link: PathBuf,
        target: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid version format: '{version}'")]
    InvalidVersion { version: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Home directory not found")]
    HomeDirectoryNotFound,

    #[error("Build info is not available: {message}")]
    NoBuildInfo { message: String },

    #[error("Failed to back up {path}: {source}")]
    BackupFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl GmError {
    pub fn resolution_failed<S: Into<String>>(message: S) -> Self {
        GmError::ResolutionFailed {
            message: message.into(),
        }
    }

    pub fn download_failed<U: Into<String>, S: Into<String>>(url: U, message: S) -> Self {
        GmError::DownloadFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn config_error<S: Into<String>>(message: S) -> Self {
        GmError::ConfigError {
            message: message.into(),
        }
    }
}
