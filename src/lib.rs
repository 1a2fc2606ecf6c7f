//! gm - Go toolchain version manager library
//!
//! This library provides the install, activation and self-upgrade machinery behind the `gm` CLI.

pub mod commands;
pub mod core;
pub mod error;
pub mod utils;
