//! Docshift Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the docshift workspace.
//!
//! - **Logging**: subscriber setup with an explicit flush handle
//! - **Checksums**: digests of staged artifacts
//! - **Errors**: the low-level error type used by the helpers in this crate
//!
//! # Example
//!
//! ```no_run
//! use docshift_common::checksum::digest_file;
//!
//! fn report(path: &str) -> docshift_common::Result<()> {
//!     let digest = digest_file(path)?;
//!     tracing::info!(sha256 = %digest.sha256, bytes = digest.size, "Staged file digest");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
