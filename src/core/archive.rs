//! Unpacking of `.tar.gz` and `.zip` release archives.
//!
//! Every entry name is validated before anything is written for it, a single known
//! root directory (such as `go/`) can be stripped, and each regular file is streamed
//! through the [`Tracker`] so progress is reported per entry.

use crate::core::progress::Tracker;
use crate::error::{GmError, Result};
use flate2::read::GzDecoder;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Detects the format from the file name suffix only.
    pub fn from_name(name: &str) -> Result<Self> {
        if name.ends_with(".tar.gz") {
            Ok(ArchiveFormat::TarGz)
        } else if name.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else {
            Err(GmError::UnsupportedFormat {
                name: name.to_string(),
            })
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::Zip => ".zip",
        }
    }
}

/// Strips a recognized archive suffix from `name`, if any.
pub fn strip_archive_suffix(name: &str) -> Option<&str> {
    name.strip_suffix(ArchiveFormat::TarGz.suffix())
        .or_else(|| name.strip_suffix(ArchiveFormat::Zip.suffix()))
}

/// Rejects empty names, backslashes, absolute paths and `..` segments.
pub fn valid_rel_path(name: &str) -> bool {
    !(name.is_empty()
        || name.contains('\\')
        || name.starts_with('/')
        || name.split('/').any(|segment| segment == ".."))
}

/// Unpacks `archive_path` into `dest`, removing `strip_prefix` (e.g. `"go/"`) from entry names.
pub fn unpack(
    archive_path: &Path,
    dest: &Path,
    strip_prefix: Option<&str>,
    tracker: &Tracker,
) -> Result<()> {
    let name = archive_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let format = ArchiveFormat::from_name(name)?;

    debug!(archive = %archive_path.display(), dest = %dest.display(), ?format, "unpacking");
    std::fs::create_dir_all(dest)?;

    let mut unpacker = Unpacker {
        dest,
        strip_prefix,
        tracker,
        made_dirs: HashSet::new(),
    };
    match format {
        ArchiveFormat::TarGz => unpacker.tar_gz(archive_path),
        ArchiveFormat::Zip => unpacker.zip(archive_path),
    }
}

struct Unpacker<'a> {
    dest: &'a Path,
    strip_prefix: Option<&'a str>,
    tracker: &'a Tracker,
    made_dirs: HashSet<PathBuf>,
}

/// Metadata of a regular file entry, independent of the container format.
struct FileEntry<'a> {
    name: &'a str,
    size: u64,
    mode: Option<u32>,
    mtime: Option<SystemTime>,
}

impl Unpacker<'_> {
    fn tar_gz(&mut self, archive_path: &Path) -> Result<()> {
        let file = File::open(archive_path)?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));

        for entry in archive.entries()? {
            let mut entry = entry?;
            if entry.header().entry_type() == tar::EntryType::XGlobalHeader {
                continue;
            }
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            self.tracker.reset(&format!("Extracting {name} ..."));
            let target = self.target_path(&name)?;

            let header = entry.header();
            let entry_type = header.entry_type();
            if entry_type.is_dir() {
                self.make_dir(&target)?;
            } else if entry_type.is_file() {
                let meta = FileEntry {
                    name: &name,
                    size: header.size()?,
                    mode: header.mode().ok(),
                    mtime: header
                        .mtime()
                        .ok()
                        .filter(|secs| *secs > 0)
                        .map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
                };
                self.write_file(&target, &meta, &mut entry)?;
            } else {
                return Err(GmError::UnsupportedEntryType { name });
            }
        }
        Ok(())
    }

    fn zip(&mut self, archive_path: &Path) -> Result<()> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            self.tracker.reset(&format!("Extracting {name} ..."));
            let target = self.target_path(&name)?;

            if entry.is_dir() {
                self.make_dir(&target)?;
            } else if entry.is_file() {
                let meta = FileEntry {
                    name: &name,
                    size: entry.size(),
                    mode: entry.unix_mode(),
                    mtime: entry.last_modified().and_then(zip_time),
                };
                self.write_file(&target, &meta, &mut entry)?;
            } else {
                return Err(GmError::UnsupportedEntryType { name });
            }
        }
        Ok(())
    }

    /// Validates `name` and maps it under the destination directory.
    fn target_path(&self, name: &str) -> Result<PathBuf> {
        if !valid_rel_path(name) {
            return Err(GmError::UnsafePath {
                name: name.to_string(),
            });
        }

        let mut rel = name;
        if let Some(prefix) = self.strip_prefix {
            let bare = prefix.trim_end_matches('/');
            rel = rel.strip_prefix(prefix).unwrap_or(rel);
            if rel == bare {
                rel = "";
            }
        }

        let mut target = self.dest.to_path_buf();
        target.extend(rel.split('/').filter(|s| !s.is_empty() && *s != "."));
        Ok(target)
    }

    fn make_dir(&mut self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        self.made_dirs.insert(dir.to_path_buf());
        Ok(())
    }

    fn write_file(&mut self, target: &Path, meta: &FileEntry<'_>, reader: &mut dyn Read) -> Result<()> {
        if let Some(parent) = target.parent() {
            if !self.made_dirs.contains(parent) {
                self.make_dir(parent)?;
            }
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(meta.mode.map(|m| m & 0o777).unwrap_or(0o644));
        }
        let file = options.open(target)?;

        self.tracker.set_size(meta.size);
        let mut writer = self.tracker.writer(&file);
        let written = io::copy(reader, &mut writer)?;
        if written != meta.size {
            return Err(GmError::EntrySizeMismatch {
                path: target.to_path_buf(),
                expected: meta.size,
                actual: written,
            });
        }

        if let Some(mtime) = meta.mtime {
            if let Err(e) = file.set_modified(mtime) {
                warn!(entry = meta.name, error = %e, "error changing modtime");
            }
        }
        Ok(())
    }
}

fn zip_time(time: zip::DateTime) -> Option<SystemTime> {
    let naive = chrono::NaiveDate::from_ymd_opt(
        i32::from(time.year()),
        u32::from(time.month()),
        u32::from(time.day()),
    )?
    .and_hms_opt(
        u32::from(time.hour()),
        u32::from(time.minute()),
        u32::from(time.second()),
    )?;
    let secs = u64::try_from(naive.and_utc().timestamp()).ok()?;
    Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
}

#[cfg(test)]
pub(crate) mod testing {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::path::Path;
    use zip::write::SimpleFileOptions;

    /// Writes a `.tar.gz` holding `dirs` and `files`; names are stored verbatim.
    pub fn write_tar_gz(path: &Path, dirs: &[&str], files: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        for dir in dirs {
            let mut header = tar::Header::new_gnu();
            set_raw_name(&mut header, dir);
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            header.set_cksum();
            builder.append(&header, std::io::empty()).unwrap();
        }
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            set_raw_name(&mut header, name);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(data.len() as u64);
            header.set_mtime(1_700_000_000);
            header.set_cksum();
            builder.append(&header, *data).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap();
    }

    /// Appends a symlink entry to a fresh `.tar.gz`.
    pub fn write_tar_gz_with_symlink(path: &Path, name: &str, target: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut header = tar::Header::new_gnu();
        set_raw_name(&mut header, name);
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_link_name(target).unwrap();
        header.set_size(0);
        header.set_cksum();
        builder.append(&header, std::io::empty()).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    // bypasses the builder's own path sanitizing so hostile names can be produced
    fn set_raw_name(header: &mut tar::Header, name: &str) {
        let gnu = header.as_gnu_mut().unwrap();
        gnu.name = [0; 100];
        gnu.name[..name.len()].copy_from_slice(name.as_bytes());
    }

    pub fn write_zip(path: &Path, dirs: &[&str], files: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().unix_permissions(0o644);

        for dir in dirs {
            writer.add_directory(*dir, options).unwrap();
        }
        for (name, data) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
}
