use crate::core::config::Config;
use crate::error::{GmError, Result};
use crate::utils::shell::{self, Shell};
use std::path::PathBuf;

/// Paths a shell needs to use the current toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPaths {
    pub goroot: PathBuf,
    pub gopath: PathBuf,
    pub gobin: PathBuf,
    pub goroot_bin: PathBuf,
}

impl EnvPaths {
    pub fn from_config(config: &Config) -> Self {
        Self {
            goroot: config.current_path(),
            gopath: config.workspace_dir(),
            gobin: config.workspace_bin_dir(),
            goroot_bin: config.goroot_bin_dir(),
        }
    }

    /// Shell statements exporting the Go variables and the updated `PATH`.
    pub fn render(&self, shell: Shell, existing_path: &str) -> Vec<String> {
        let mut lines = vec![
            shell::export_line(shell, "GOPATH", &self.gopath.display().to_string()),
            shell::export_line(shell, "GOBIN", &self.gobin.display().to_string()),
            shell::export_line(shell, "GOROOT", &self.goroot.display().to_string()),
        ];

        let entries = [self.goroot_bin.clone(), self.gobin.clone()];
        lines.push(match shell {
            Shell::Posix => shell::export_line(
                shell,
                "PATH",
                &shell::prepend_path(existing_path, &entries, ':'),
            ),
            // fish keeps PATH as a list
            Shell::Fish => format!(
                "set -gx PATH {} {} $PATH",
                self.goroot_bin.display(),
                self.gobin.display()
            ),
            Shell::PowerShell => shell::export_line(
                shell,
                "PATH",
                &shell::prepend_path(existing_path, &entries, ';'),
            ),
        });
        lines
    }
}

/// Prints shell statements for `eval "$(gm env)"`.
pub fn print_env() -> Result<()> {
    let path = std::env::var("PATH").unwrap_or_default();
    if path.is_empty() {
        return Err(GmError::config_error("PATH is not set"));
    }

    let config = Config::load()?;
    for line in EnvPaths::from_config(&config).render(shell::detect_shell(), &path) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(unix)]
    #[test]
    fn test_render_posix() {
        let paths = EnvPaths::from_config(&Config::with_root("/home/dev/.gm"));

        assert_eq!(
            paths.render(Shell::Posix, "/usr/bin"),
            vec![
                "export GOPATH=\"/home/dev/.gm/workspace\"",
                "export GOBIN=\"/home/dev/.gm/workspace/bin\"",
                "export GOROOT=\"/home/dev/.gm/versions/current\"",
                "export PATH=\"/home/dev/.gm/versions/current/bin:/home/dev/.gm/workspace/bin:/usr/bin\"",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_render_is_stable_when_reapplied() {
        let paths = EnvPaths::from_config(&Config::with_root("/home/dev/.gm"));
        let existing = "/home/dev/.gm/versions/current/bin:/home/dev/.gm/workspace/bin:/usr/bin";

        assert_eq!(
            paths.render(Shell::Posix, existing)[3],
            format!("export PATH=\"{existing}\"")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_render_fish() {
        let paths = EnvPaths::from_config(&Config::with_root("/home/dev/.gm"));
        let lines = paths.render(Shell::Fish, "/usr/bin");

        assert_eq!(lines[0], "set -gx GOPATH \"/home/dev/.gm/workspace\"");
        assert_eq!(
            lines[3],
            "set -gx PATH /home/dev/.gm/versions/current/bin /home/dev/.gm/workspace/bin $PATH"
        );
    }
}
