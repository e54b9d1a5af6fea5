//! # Strings Module
//!
//! Centralizes log and console message texts.

pub mod logs;
