//! Command handlers: bridge CLI args -> core -> output formatting.

pub mod config_cmd;
pub mod devices;
pub mod serve;
