use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Posix,
    Fish,
    PowerShell,
}

/// Picks the export syntax from `$SHELL`, defaulting to PowerShell on Windows.
pub fn detect_shell() -> Shell {
    shell_from(std::env::var("SHELL").ok().as_deref(), cfg!(windows))
}

fn shell_from(shell_var: Option<&str>, windows: bool) -> Shell {
    match shell_var {
        Some(shell) if shell.ends_with("/fish") || shell == "fish" => Shell::Fish,
        Some(shell) if !shell.is_empty() => Shell::Posix,
        _ if windows => Shell::PowerShell,
        _ => Shell::Posix,
    }
}

/// Prepends `entries` to a search path, skipping the ones it already contains.
pub fn prepend_path(existing: &str, entries: &[PathBuf], separator: char) -> String {
    let present = |entry: &Path| {
        existing
            .split(separator)
            .any(|part| Path::new(part.trim()) == entry)
    };

    let mut parts: Vec<String> = entries
        .iter()
        .filter(|entry| !present(entry.as_path()))
        .map(|entry| entry.display().to_string())
        .collect();
    if !existing.is_empty() {
        parts.push(existing.to_string());
    }
    parts.join(&separator.to_string())
}

/// One `name=value` assignment in the syntax of `shell`.
pub fn export_line(shell: Shell, name: &str, value: &str) -> String {
    match shell {
        Shell::Posix => format!("export {name}=\"{value}\""),
        Shell::Fish => format!("set -gx {name} \"{value}\""),
        Shell::PowerShell => format!("$env:{name} = \"{value}\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shell_from() {
        assert_eq!(shell_from(Some("/usr/bin/fish"), false), Shell::Fish);
        assert_eq!(shell_from(Some("/bin/zsh"), false), Shell::Posix);
        assert_eq!(shell_from(None, false), Shell::Posix);
        assert_eq!(shell_from(None, true), Shell::PowerShell);
        assert_eq!(shell_from(Some("/usr/bin/bash"), true), Shell::Posix);
    }

    #[test]
    fn test_prepend_path_skips_present_entries() {
        let entries = vec![PathBuf::from("/gm/versions/current/bin"), PathBuf::from("/gm/workspace/bin")];
        assert_eq!(
            prepend_path("/usr/bin:/gm/workspace/bin", &entries, ':'),
            "/gm/versions/current/bin:/usr/bin:/gm/workspace/bin"
        );
        assert_eq!(
            prepend_path("", &entries, ':'),
            "/gm/versions/current/bin:/gm/workspace/bin"
        );
    }

    #[test]
    fn test_export_line() {
        assert_eq!(export_line(Shell::Posix, "GOROOT", "/r"), "export GOROOT=\"/r\"");
        assert_eq!(export_line(Shell::Fish, "GOROOT", "/r"), "set -gx GOROOT \"/r\"");
        assert_eq!(export_line(Shell::PowerShell, "GOROOT", "C:\\r"), "$env:GOROOT = \"C:\\r\"");
    }
}
