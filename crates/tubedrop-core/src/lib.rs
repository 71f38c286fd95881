//! Core domain + application logic for the tubedrop video bot.
//!
//! This crate is intentionally framework-agnostic. Telegram / yt-dlp / S3
//! live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod naming;
pub mod pipeline;
pub mod ports;
pub mod staging;

pub use errors::{Error, PipelineError, Result};

#[cfg(test)]
pub(crate) mod testing;
