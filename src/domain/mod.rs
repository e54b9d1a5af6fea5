//! # Domain Layer
//!
//! Core definitions, types, and traits shared by the rest of the bridge.

pub mod config;
pub mod traits;
pub mod types;
