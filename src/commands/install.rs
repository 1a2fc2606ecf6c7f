use crate::commands::render;
use crate::core::alias::AliasManager;
use crate::core::config::Config;
use crate::core::http::HttpClient;
use crate::core::toolchain::{InstallOutcome, Installer};
use crate::core::version;
use crate::error::Result;

/// Installs a toolchain (`latest`, `1.22.0` or `go1.22.0`) and makes it current.
pub fn install_version(requested: &str) -> Result<()> {
    let config = Config::load()?;
    let client = HttpClient::new(config.github_api_token.clone())?;

    let version = version::resolve_requested(&client, &config, requested)?;
    println!("Installing Go {version}");

    let job_config = config.clone();
    let job_version = version.clone();
    let outcome = render::run_with_progress(&format!("Installing {version}"), move |tracker| {
        Installer::new(&client, &job_config, &tracker).install(&job_version)
    })?;

    match outcome {
        InstallOutcome::AlreadyInstalled(_) => {
            println!("✅ {version} is already installed at {}", outcome.path().display())
        }
        InstallOutcome::Installed(_) => {
            println!("✅ Installed {version} to {}", outcome.path().display())
        }
    }

    AliasManager::new(config).activate(&version)?;
    println!("Now using Go {version}");
    println!();
    println!("Make sure your shell loads the environment:");
    println!("  eval \"$(gm env)\"");

    Ok(())
}
