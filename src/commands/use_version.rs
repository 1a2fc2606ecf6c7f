use crate::core::alias::AliasManager;
use crate::core::config::Config;
use crate::core::http::HttpClient;
use crate::core::version;
use crate::error::Result;

pub fn use_version(requested: &str) -> Result<()> {
    let config = Config::load()?;
    let client = HttpClient::new(config.github_api_token.clone())?;
    let version = version::resolve_requested(&client, &config, requested)?;

    let target = AliasManager::new(config).activate(&version)?;

    println!("Now using Go {version}");
    println!("  GOROOT -> {}", target.display());
    println!();
    println!("Verify with: go version");

    Ok(())
}
