pub mod config;
pub mod remote_chain;
pub mod telemetry;
