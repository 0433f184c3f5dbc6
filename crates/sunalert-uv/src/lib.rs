//! UV index service for SunAlert
//!
//! Fetches UV readings from the OpenUV API and classifies them into
//! exposure risk levels with protection advice.

pub mod provider;
pub mod types;

pub use provider::UvProvider;
pub use types::*;
