//! # IRC
//!
//! Feed-side transport: the listener that drives a session over `irc-proto` messages.

mod client;

pub use client::IrcListener;
