//! # Error Types
//!
//! This module defines error types used throughout the rotulo library.
//!
//! Only font-resolution failures surface as request-level errors; internal
//! heuristic misses and per-decoration drawing failures degrade gracefully
//! and never abort a page sequence once production has started.

use thiserror::Error;

/// Main error type for rotulo operations
#[derive(Debug, Error)]
pub enum RotuloError {
    /// A font file named by the request could not be loaded or parsed.
    /// The request cannot be fulfilled as specified.
    #[error("Font resolution error: {0}")]
    FontResolution(String),

    /// Document layout error
    #[error("Layout error: {0}")]
    Layout(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
