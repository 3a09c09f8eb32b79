//! CLI subcommands

pub mod host;
pub mod hosts;
pub mod trigger;
pub mod watch;
