use crate::commands::render;
use crate::core::config::Config;
use crate::core::http::HttpClient;
use crate::core::platform::Platform;
use crate::core::upgrade::{self, Upgrader, RESOLVE_TIMEOUT};
use crate::error::Result;

/// Replaces the running `gm` with the newest release, if there is one.
pub fn upgrade_self() -> Result<()> {
    let config = Config::load()?;
    let client = HttpClient::new(config.github_api_token.clone())?;
    let exe_path = std::env::current_exe()?;

    println!("Checking for updates (current: v{})...", upgrade::current_version());
    let check_client = client.clone();
    let latest = upgrade::with_timeout(RESOLVE_TIMEOUT, move || {
        upgrade::check_for_update(&check_client)
    })?;

    let Some(release) = latest else {
        println!("No updates available");
        return Ok(());
    };

    let title = format!("Update available: {}", release.version);
    let backup = render::run_with_progress(&title, move |tracker| {
        Upgrader::new(&client, &tracker, exe_path)?.apply(&release, &Platform::detect())
    })?;

    println!("✅ Successfully updated!");
    println!("  previous executable kept at {}", backup.display());
    Ok(())
}
