//! zenbot core - shared functionality for the zenbot workspace
//!
//! Standard paths, the on-disk configuration and human-readable formatting
//! used by replies and logs.

pub mod config;
pub mod format;
pub mod paths;

pub use config::Config;
pub use paths::Paths;
