//! One module per subcommand.

pub mod add;
pub mod benchmark;
pub mod completions;
pub mod delete;
pub mod derive_key;
pub mod init;
pub mod list;
pub mod show;
pub mod verify;
