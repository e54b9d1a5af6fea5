//! # Infrastructure Layer
//!
//! Handles interactions with external systems: the IRC change feed and the Event Fabric API.
//! Implements the traits defined in the Domain layer (e.g., EventSink).

pub mod event_fabric;
pub mod irc;
