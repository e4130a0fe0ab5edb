//! Core domain + application logic for the Twitter/X raid bot.
//!
//! This crate is framework-agnostic. Telegram lives behind ports (traits)
//! implemented in the adapter crate.

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod extractor;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod store;

pub use errors::{Error, Result};
