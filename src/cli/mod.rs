//! CLI command implementations

pub mod commands;
pub mod error;

pub use commands::{Cli, Commands, CompressArgs, DownloadArgs, UploadArgs};
pub use error::CliError;
