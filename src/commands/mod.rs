pub mod doctor;
pub mod env;
pub mod install;
pub mod list;
pub mod render;
pub mod upgrade;
pub mod use_version;
