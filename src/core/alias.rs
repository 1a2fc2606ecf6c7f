//! The `versions/current` alias selecting the active toolchain.

use crate::core::config::Config;
use crate::core::version::validate_version;
use crate::error::{GmError, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory-link primitive; one implementation per target OS.
pub trait DirLink {
    fn create(&self, target: &Path, link: &Path) -> io::Result<()>;
    fn remove(&self, link: &Path) -> io::Result<()>;
    fn read(&self, link: &Path) -> io::Result<PathBuf>;
}

#[cfg(unix)]
pub struct Symlink;

#[cfg(unix)]
impl DirLink for Symlink {
    fn create(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    fn remove(&self, link: &Path) -> io::Result<()> {
        std::fs::remove_file(link)
    }

    fn read(&self, link: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(link)
    }
}

/// Directory symlink, falling back to a junction when symlinks need privileges.
#[cfg(windows)]
pub struct SymlinkOrJunction;

#[cfg(windows)]
impl DirLink for SymlinkOrJunction {
    fn create(&self, target: &Path, link: &Path) -> io::Result<()> {
        match std::os::windows::fs::symlink_dir(target, link) {
            Ok(()) => Ok(()),
            Err(e) => {
                info!(error = %e, "symlink unavailable, creating junction");
                create_junction(target, link)
            }
        }
    }

    fn remove(&self, link: &Path) -> io::Result<()> {
        // directory symlinks and junctions are both removed as directories
        std::fs::remove_dir(link)
    }

    fn read(&self, link: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(link)
    }
}

#[cfg(windows)]
fn create_junction(target: &Path, link: &Path) -> io::Result<()> {
    let output = std::process::Command::new("cmd.exe")
        .arg("/C")
        .arg("mklink")
        .arg("/J")
        .arg(link)
        .arg(target)
        .output()?;

    if !output.status.success() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "create junction: {}",
                String::from_utf8_lossy(&output.stdout).trim()
            ),
        ));
    }
    Ok(())
}

/// Link primitive for the running OS.
pub fn platform_link() -> Box<dyn DirLink> {
    #[cfg(unix)]
    {
        Box::new(Symlink)
    }

    #[cfg(windows)]
    {
        Box::new(SymlinkOrJunction)
    }
}

pub struct AliasManager {
    config: Config,
    link: Box<dyn DirLink>,
}

impl AliasManager {
    pub fn new(config: Config) -> Self {
        Self::with_link(config, platform_link())
    }

    pub fn with_link(config: Config, link: Box<dyn DirLink>) -> Self {
        Self { config, link }
    }

    /// Points `versions/current` at `version`.
    ///
    /// The old alias is removed before the new one is created, so there is a short
    /// window with no current version. Concurrent activations are not serialized.
    pub fn activate(&self, version: &str) -> Result<PathBuf> {
        validate_version(version)?;
        let target = self.config.version_dir(version);
        let current = self.config.current_path();

        if let Err(e) = std::fs::metadata(&target) {
            if e.kind() == io::ErrorKind::NotFound {
                return Err(GmError::NotInstalled {
                    version: version.to_string(),
                });
            }
            return Err(e.into());
        }

        let alias_failed = |source: io::Error| GmError::AliasUpdateFailed {
            link: current.clone(),
            target: target.clone(),
            source,
        };

        match self.link.remove(&current) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(alias_failed(e)),
            _ => {}
        }
        self.link.create(&target, &current).map_err(alias_failed)?;

        info!(%version, link = %current.display(), "activated toolchain");
        Ok(target)
    }

    /// Version the alias points at, or `None` when there is no alias.
    pub fn current_version(&self) -> Result<Option<String>> {
        match self.link.read(&self.config.current_path()) {
            Ok(target) => Ok(target
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn installed(config: &Config, version: &str) {
        std::fs::create_dir_all(config.version_dir(version)).unwrap();
        std::fs::write(config.install_marker(version), b"").unwrap();
    }

    #[test]
    fn test_no_alias_means_no_current_version() {
        let temp = tempfile::tempdir().unwrap();
        let manager = AliasManager::new(Config::with_root(temp.path()));
        assert_eq!(manager.current_version().unwrap(), None);
    }

    #[test]
    fn test_activate_unknown_version() {
        let temp = tempfile::tempdir().unwrap();
        let manager = AliasManager::new(Config::with_root(temp.path()));
        assert!(matches!(
            manager.activate("go1.99.0"),
            Err(GmError::NotInstalled { .. })
        ));
    }

    #[test]
    fn test_activate_rejects_names_outside_versions() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::with_root(temp.path());
        std::fs::create_dir_all(config.versions_dir()).unwrap();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let manager = AliasManager::with_link(
            config.clone(),
            Box::new(RecordingLink {
                calls: Rc::clone(&calls),
                fail_create: false,
            }),
        );

        for name in ["..", "", "../outside", "current"] {
            assert!(matches!(
                manager.activate(name),
                Err(GmError::InvalidVersion { .. })
            ));
        }
        assert!(calls.borrow().is_empty());
        assert!(std::fs::symlink_metadata(config.current_path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_activate_switches_and_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::with_root(temp.path());
        installed(&config, "go1.21.0");
        installed(&config, "go1.22.0");
        let manager = AliasManager::new(config.clone());

        manager.activate("go1.21.0").unwrap();
        assert_eq!(manager.current_version().unwrap().as_deref(), Some("go1.21.0"));

        manager.activate("go1.22.0").unwrap();
        manager.activate("go1.22.0").unwrap();
        assert_eq!(manager.current_version().unwrap().as_deref(), Some("go1.22.0"));
        assert_eq!(
            std::fs::read_link(config.current_path()).unwrap(),
            config.version_dir("go1.22.0")
        );

        let aliases = std::fs::read_dir(config.versions_dir())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name() == "current")
            .count();
        assert_eq!(aliases, 1);
    }

    /// Records calls and can be told to fail creation.
    struct RecordingLink {
        calls: Rc<RefCell<Vec<String>>>,
        fail_create: bool,
    }

    impl DirLink for RecordingLink {
        fn create(&self, target: &Path, _link: &Path) -> io::Result<()> {
            self.calls
                .borrow_mut()
                .push(format!("create {}", target.file_name().unwrap().to_string_lossy()));
            if self.fail_create {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(())
        }

        fn remove(&self, _link: &Path) -> io::Result<()> {
            self.calls.borrow_mut().push("remove".to_string());
            Err(io::Error::new(io::ErrorKind::NotFound, "absent"))
        }

        fn read(&self, _link: &Path) -> io::Result<PathBuf> {
            Err(io::Error::new(io::ErrorKind::NotFound, "absent"))
        }
    }

    #[test]
    fn test_remove_happens_before_create() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::with_root(temp.path());
        installed(&config, "go1.22.0");
        let calls = Rc::new(RefCell::new(Vec::new()));
        let manager = AliasManager::with_link(
            config,
            Box::new(RecordingLink {
                calls: Rc::clone(&calls),
                fail_create: false,
            }),
        );

        manager.activate("go1.22.0").unwrap();
        assert_eq!(*calls.borrow(), vec!["remove", "create go1.22.0"]);
    }

    #[test]
    fn test_create_failure_is_alias_update_failed() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::with_root(temp.path());
        installed(&config, "go1.22.0");
        let manager = AliasManager::with_link(
            config,
            Box::new(RecordingLink {
                calls: Rc::new(RefCell::new(Vec::new())),
                fail_create: true,
            }),
        );

        assert!(matches!(
            manager.activate("go1.22.0"),
            Err(GmError::AliasUpdateFailed { .. })
        ));
    }
}
