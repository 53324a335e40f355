//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`cache`] - Cache management (stats, clear, evict)
//! - [`fetch`] - Single tile fetch and URL fingerprints
//! - [`init`] - Configuration initialization
//! - [`prefetch`] - Region download for offline use
//! - [`urls`] - Tile URL listing and counting

pub mod cache;
pub mod common;
pub mod fetch;
pub mod init;
pub mod prefetch;
pub mod urls;
