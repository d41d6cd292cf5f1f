//! scriptstore - an on-device package manager for small scripts and themes
//!
//! This crate provides:
//! - A remote catalog of scripts grouped by category, with a derived Updates category
//! - Install, update and delete of scripts against a persisted version map
//! - A four-button single-screen TUI and a batch CLI over the same operations

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod installer;
pub mod remote;
pub mod storage;
pub mod tui;
pub mod versions;

pub use app::App;
pub use config::Config;
