//! Core domain + application logic for the presence watcher.
//!
//! This crate is intentionally provider-agnostic. Slack / WhatsApp live behind
//! ports (traits) implemented in adapter crates.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod profile;
pub mod state;
pub mod timer;
pub mod watcher;

pub use errors::{Error, Result};
