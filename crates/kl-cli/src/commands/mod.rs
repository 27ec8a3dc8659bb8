//! CLI subcommand implementations.

pub mod ask;
pub mod class;
pub mod replay;
pub mod sessions;
pub mod stats;
pub mod util;
