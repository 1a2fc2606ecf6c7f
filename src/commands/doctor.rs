use crate::core::alias::AliasManager;
use crate::core::config::Config;
use crate::core::version;
use crate::error::Result;
use crate::utils::fs;
use std::path::Path;
use std::process::Command;

pub fn check_environment() -> Result<()> {
    println!("🔍 gm - Environment Check");
    println!();

    let config = Config::load()?;
    let mut issues_found = 0;

    println!("📁 Directory Structure:");
    for (label, dir) in [
        ("root directory", config.root_dir.clone()),
        ("versions directory", config.versions_dir()),
    ] {
        println!("  {label}: {}", dir.display());
        if dir.is_dir() {
            println!("    ✅ exists");
        } else {
            println!("    ❌ missing");
            issues_found += 1;
        }
    }
    println!();

    println!("📦 Installed Versions:");
    let installed = version::list_installed(&config)?;
    if installed.is_empty() {
        println!("  ⚠️  No versions installed");
    }
    for toolchain in &installed {
        if toolchain.complete {
            println!("  {} ✅", toolchain.version);
        } else {
            println!("  {} ❌ incomplete install, run 'gm install {}' again", toolchain.version, toolchain.version);
            issues_found += 1;
        }
    }
    println!();

    println!("🔗 Current Version:");
    let current = AliasManager::new(config.clone()).current_version()?;
    match &current {
        Some(current) => {
            println!("  current: {current}");
            if config.is_installed(current) {
                println!("    ✅ alias target is installed");
            } else {
                println!("    ❌ alias points at a missing or incomplete install");
                issues_found += 1;
            }
        }
        None => println!("  ⚠️  No current version set"),
    }
    println!();

    println!("🛣️  PATH Configuration:");
    match which::which("go") {
        Ok(go) => {
            println!("  go resolves to {}", go.display());
            if resolves_into(&go, &config.goroot_bin_dir()) {
                println!("    ✅ go comes from the current alias");
            } else {
                println!("    ❌ go does not come from {}", config.goroot_bin_dir().display());
                println!("    Add this to your shell config:");
                println!("    eval \"$(gm env)\"");
                issues_found += 1;
            }
        }
        Err(_) => {
            println!("  ❌ 'go' command not found on PATH");
            issues_found += 1;
        }
    }

    if current.is_some() {
        println!();
        println!("🧪 Command Test:");
        let go = config.goroot_bin_dir().join(if cfg!(windows) { "go.exe" } else { "go" });
        if !fs::is_executable(&go) {
            println!("  ❌ {} is not executable", go.display());
            issues_found += 1;
        } else {
            match Command::new(&go).arg("version").output() {
                Ok(output) if output.status.success() => {
                    println!(
                        "  ✅ 'go version' works: {}",
                        String::from_utf8_lossy(&output.stdout).trim()
                    );
                }
                _ => {
                    println!("  ❌ 'go version' failed");
                    issues_found += 1;
                }
            }
        }
    }

    println!();
    if issues_found == 0 {
        println!("🎉 Environment looks good! No issues found.");
    } else {
        println!("⚠️  Found {issues_found} issue(s) that need attention.");
        println!();
        println!("💡 To fix issues:");
        println!("  - Run 'gm install <version>' to install a version");
        println!("  - Run 'gm use <version>' to activate a version");
        println!("  - Run 'eval \"$(gm env)\"' in your shell profile");
    }

    Ok(())
}

/// Whether `binary` sits in `bin_dir`, comparing the alias path itself rather than its target.
fn resolves_into(binary: &Path, bin_dir: &Path) -> bool {
    binary.parent() == Some(bin_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_into() {
        let bin = Path::new("/gm/versions/current/bin");
        assert!(resolves_into(Path::new("/gm/versions/current/bin/go"), bin));
        assert!(!resolves_into(Path::new("/usr/local/go/bin/go"), bin));
    }
}
