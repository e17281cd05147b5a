//! Message persistence.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};
use switchboard_core::{Message, MessageId, MessageStatus, NewMessage, UserId};

/// Persistence of message rows
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a message and return it with its assigned id.
    async fn create_message(&self, message: NewMessage) -> SessionResult<Message>;

    /// Change the delivery status of a message.
    async fn update_status(&self, id: MessageId, status: MessageStatus) -> SessionResult<()>;
}

/// In-process message store.
#[derive(Debug)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<Message>>,
    next_id: AtomicI64,
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.messages.read().iter().find(|m| m.id == id).cloned()
    }

    /// Messages of one user in insertion order
    pub fn messages_for(&self, user_id: UserId) -> Vec<Message> {
        self.messages
            .read()
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create_message(&self, message: NewMessage) -> SessionResult<Message> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message = Message::from_new(id, message);
        self.messages.write().push(message.clone());
        Ok(message)
    }

    async fn update_status(&self, id: MessageId, status: MessageStatus) -> SessionResult<()> {
        let mut messages = self.messages.write();
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| SessionError::Persistence(format!("message {id} not found")))?;
        message.status = status;
        Ok(())
    }
}
