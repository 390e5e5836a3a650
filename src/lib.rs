pub mod config;
pub mod constants;
pub mod error;
pub mod identifiers;
pub mod logging;
pub mod manifest;
pub mod parser;
pub mod pipeline;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;
