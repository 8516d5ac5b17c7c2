//! Message types exchanged with a brain.

use serde::{Deserialize, Serialize};

/// A message received from a user, direct or in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender identifier (phone number or user ID).
    pub sender: String,
    /// Message text.
    pub text: String,
    /// Timestamp in milliseconds since the epoch.
    pub timestamp: u64,
    /// Group identifier, if the message was sent to a group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl InboundMessage {
    /// Create a direct (one-to-one) message.
    pub fn direct(sender: impl Into<String>, text: impl Into<String>, timestamp: u64) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp,
            group_id: None,
        }
    }

    /// Create a group message.
    pub fn group(
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: u64,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp,
            group_id: Some(group_id.into()),
        }
    }

    /// Whether this message was sent to a group.
    pub fn is_group(&self) -> bool {
        self.group_id.is_some()
    }
}

/// A response produced by a brain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Phone number for direct replies, group ID for group replies.
    pub recipient: String,
    /// Response text.
    pub text: String,
    /// Whether `recipient` is a group ID.
    pub is_group: bool,
}

impl OutboundMessage {
    /// Create a direct message to a recipient.
    pub fn direct(recipient: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            text: text.into(),
            is_group: false,
        }
    }

    /// Create a reply addressed to wherever `message` came from.
    ///
    /// Group messages are answered in the group, direct messages to the sender.
    pub fn reply_to(message: &InboundMessage, text: impl Into<String>) -> Self {
        match &message.group_id {
            Some(group_id) => Self {
                recipient: group_id.clone(),
                text: text.into(),
                is_group: true,
            },
            None => Self::direct(message.sender.clone(), text),
        }
    }
}
