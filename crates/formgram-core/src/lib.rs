//! Core of the form-submission → Telegram notification dispatcher.
//!
//! This crate is transport-agnostic. The Bot API HTTP client, the settings
//! storage and the result channel live behind ports (traits) implemented in
//! adapter crates or by the host.

pub mod config;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod feed;
pub mod formatting;
pub mod logging;
pub mod ports;
pub mod settings;
pub mod store;
pub mod utils;
pub mod verify;

pub use errors::{Error, Result};
