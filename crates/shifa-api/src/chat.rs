// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Staff chat room with sealed message bodies.
//!
//! Bodies are sealed before they are stored and opened only when read back,
//! so the stored log never holds readable text.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shifa_config::MessageSealer;
use shifa_core::{Role, UserId};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Maximum body length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4_000;

const DEFAULT_CAPACITY: usize = 1_000;

/// A message as stored.
#[derive(Debug, Clone)]
struct StoredMessage {
    id: Uuid,
    sender: UserId,
    sender_role: Option<Role>,
    sealed_body: String,
    sent_at: DateTime<Utc>,
}

/// A message as returned to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message identifier.
    pub id: Uuid,
    /// Sender.
    pub sender: UserId,
    /// Sender's role when the message was sent.
    pub sender_role: Option<Role>,
    /// Opened body.
    pub body: String,
    /// Send time.
    pub sent_at: DateTime<Utc>,
}

/// In-memory chat log bounded to the newest `capacity` messages.
#[derive(Debug)]
pub struct ChatRoom {
    sealer: MessageSealer,
    messages: RwLock<Vec<StoredMessage>>,
    capacity: usize,
}

impl ChatRoom {
    /// Creates a room sealing with `sealer`.
    pub fn new(sealer: MessageSealer) -> Self {
        Self {
            sealer,
            messages: RwLock::new(Vec::new()),
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Sets how many messages are kept.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Seals and stores a message.
    pub fn post(
        &self,
        sender: UserId,
        sender_role: Option<Role>,
        body: &str,
    ) -> ApiResult<ChatMessage> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ApiError::validation("Message body must not be empty"));
        }
        if body.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ApiError::validation(format!(
                "Message body exceeds {MAX_MESSAGE_LENGTH} characters"
            )));
        }

        let sealed_body = self
            .sealer
            .seal(body)
            .map_err(|e| ApiError::internal(e.to_string()))?;

        let stored = StoredMessage {
            id: Uuid::now_v7(),
            sender,
            sender_role,
            sealed_body,
            sent_at: Utc::now(),
        };

        let message = ChatMessage {
            id: stored.id,
            sender: stored.sender.clone(),
            sender_role,
            body: body.to_string(),
            sent_at: stored.sent_at,
        };

        let mut messages = self.messages.write();
        messages.push(stored);
        if messages.len() > self.capacity {
            let excess = messages.len() - self.capacity;
            messages.drain(..excess);
        }

        Ok(message)
    }

    /// Opens the newest `limit` messages, oldest first.
    ///
    /// A message that fails to open is skipped and logged.
    pub fn recent(&self, limit: usize) -> Vec<ChatMessage> {
        let messages = self.messages.read();
        let start = messages.len().saturating_sub(limit);
        messages[start..]
            .iter()
            .filter_map(|m| match self.sealer.open(&m.sealed_body) {
                Ok(body) => Some(ChatMessage {
                    id: m.id,
                    sender: m.sender.clone(),
                    sender_role: m.sender_role,
                    body,
                    sent_at: m.sent_at,
                }),
                Err(e) => {
                    warn!(message_id = %m.id, error = %e, "Failed to open chat message");
                    None
                }
            })
            .collect()
    }

    /// Sealed bodies as stored, oldest first.
    pub fn sealed_bodies(&self) -> Vec<String> {
        self.messages
            .read()
            .iter()
            .map(|m| m.sealed_body.clone())
            .collect()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// Returns `true` if no messages are stored.
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shifa_config::generate_key;

    fn room() -> ChatRoom {
        ChatRoom::new(MessageSealer::new(generate_key()))
    }

    #[test]
    fn test_bodies_are_stored_sealed() {
        let room = room();
        room.post(UserId::new("u-1"), Some(Role::Therapist), "Room 3 is free")
            .unwrap();

        let sealed = room.sealed_bodies();
        assert_eq!(sealed.len(), 1);
        assert!(MessageSealer::is_sealed(&sealed[0]));
        assert!(!sealed[0].contains("Room 3"));

        let read = room.recent(10);
        assert_eq!(read[0].body, "Room 3 is free");
        assert_eq!(read[0].sender_role, Some(Role::Therapist));
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let room = room();
        assert!(room.post(UserId::new("u-1"), None, "   ").is_err());
        let long = "x".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(room.post(UserId::new("u-1"), None, &long).is_err());
        assert!(room.is_empty());
    }

    #[test]
    fn test_capacity_keeps_newest() {
        let room = room().with_capacity(2);
        for body in ["one", "two", "three"] {
            room.post(UserId::new("u-1"), None, body).unwrap();
        }
        let bodies: Vec<_> = room.recent(10).into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, vec!["two", "three"]);
        assert_eq!(room.recent(1)[0].body, "three");
    }
}
