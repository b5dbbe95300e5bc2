//! mkvert - subtitle-preserving MKV to M4V conversion
//!
//! This library crate holds what the `mkvert` and `mp4maker` binaries share
//! and exposes it for integration testing.

pub mod config;
pub mod logging;
pub mod tools;
