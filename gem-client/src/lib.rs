//! Desktop shell for the Gem assistant: starts the backend, waits for it to
//! become healthy and surfaces its suggestions as popups.

pub mod app;
pub mod config;
pub mod health;
pub mod log_viewer;
pub mod logging;
pub mod mailbox;
pub mod paths;
pub mod popups;
pub mod process;
pub mod settings_store;
pub mod watcher;
