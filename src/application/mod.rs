//! # Application Layer
//!
//! Turns feed messages into change records: formatting removal, parsing, and dispatch to the
//! configured callbacks.

pub mod dispatcher;
pub mod formatting;
pub mod parsing;
