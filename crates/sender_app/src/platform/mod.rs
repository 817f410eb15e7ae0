//! Process wiring: CLI, config, logging, HTTP/WebSocket surface and effect execution.
mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod persistence;
mod server;
mod ui;
mod ws;

pub use app::run_app;
