use crate::core::alias::AliasManager;
use crate::core::config::Config;
use crate::core::version::{self, InstalledToolchain};
use crate::error::Result;

pub fn list_versions() -> Result<()> {
    let config = Config::load()?;
    let installed = version::list_installed(&config)?;

    if installed.is_empty() {
        println!("No Go versions installed.");
        println!();
        println!("To install a version, run:");
        println!("  gm install latest");
        return Ok(());
    }

    let current = AliasManager::new(config).current_version()?;

    println!("Installed versions of Go:");
    println!();
    for line in format_listing(&installed, current.as_deref()) {
        println!("{line}");
    }

    Ok(())
}

fn format_listing(installed: &[InstalledToolchain], current: Option<&str>) -> Vec<String> {
    let mut lines = Vec::with_capacity(installed.len() * 2);
    for toolchain in installed {
        let status = if current == Some(toolchain.version.as_str()) {
            " - current"
        } else if !toolchain.complete {
            " - incomplete"
        } else {
            ""
        };
        lines.push(format!("  {}{status}", toolchain.version));
        lines.push(format!("    {}", toolchain.path.display()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn toolchain(version: &str, complete: bool) -> InstalledToolchain {
        InstalledToolchain {
            version: version.to_string(),
            path: PathBuf::from(format!("/gm/versions/{version}")),
            complete,
        }
    }

    #[test]
    fn test_format_listing_marks_current_and_incomplete() {
        let installed = vec![
            toolchain("go1.21.0", true),
            toolchain("go1.22.0", true),
            toolchain("go1.23rc1", false),
        ];

        assert_eq!(
            format_listing(&installed, Some("go1.22.0")),
            vec![
                "  go1.21.0",
                "    /gm/versions/go1.21.0",
                "  go1.22.0 - current",
                "    /gm/versions/go1.22.0",
                "  go1.23rc1 - incomplete",
                "    /gm/versions/go1.23rc1",
            ]
        );
    }
}
