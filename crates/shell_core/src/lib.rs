//! Demo Shell Core
//!
//! Shared building blocks for the shell's settings services:
//! - Change epochs for cache invalidation
//! - Math re-exports and small angle helpers

pub mod epoch;
pub mod math;

pub use epoch::Epoch;
pub use glam;

/// Shell version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
