//! # Domain Types
//!
//! The change records produced from feed lines and handed to the event forwarder.

use serde::{Deserialize, Serialize};

/// A parsed feed notification.
///
/// Serializes as a flat JSON object whose `"type"` key is `"edit"` or `"action"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeRecord {
    Edit(EditChange),
    Action(ActionChange),
}

impl ChangeRecord {
    /// The discriminator as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeRecord::Edit(_) => "edit",
            ChangeRecord::Action(_) => "action",
        }
    }

    pub fn user(&self) -> &str {
        match self {
            ChangeRecord::Edit(edit) => &edit.user,
            ChangeRecord::Action(action) => &action.user,
        }
    }
}

/// A page edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditChange {
    pub page: String,
    pub patrolled: bool,
    pub new: bool,
    pub minor: bool,
    pub bot: bool,
    pub url: String,
    pub user: String,
    /// Size delta in bytes; `None` when the line carried no size figure.
    pub diff: Option<i64>,
    pub summary: String,
}

/// A log entry (account creation, protection change, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionChange {
    pub log: String,
    pub user: String,
    pub summary: String,
}
