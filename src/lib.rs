pub mod analysis;
pub mod chart;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod notify;
pub mod pipeline;
pub mod presets;
