//! # Mangalib Common Library
//!
//! Shared code for the mangalib services:
//! - Error type shared across crates
//! - Configuration loading and root folder resolution
//! - Database initialization and row models (libraries, series, volumes,
//!   import history)

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
