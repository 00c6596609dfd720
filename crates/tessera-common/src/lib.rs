//! Common utilities for tessera
//!
//! This crate provides shared functionality used across all tessera crates.

pub mod error;

pub use error::{Result, TesseraError};
