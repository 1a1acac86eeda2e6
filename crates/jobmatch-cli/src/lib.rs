#![doc = include_str!("../README.md")]

pub mod app;
pub mod cli;
pub mod config;
pub mod handlers;

pub use app::{JobmatchCli, exit_code};
pub use cli::{CliArgs, Command, ConfigAction};
pub use config::JobmatchConfig;
