pub mod alias;
pub mod archive;
pub mod config;
pub mod download;
pub mod github;
pub mod http;
pub mod platform;
pub mod progress;
pub mod toolchain;
pub mod upgrade;
pub mod version;
