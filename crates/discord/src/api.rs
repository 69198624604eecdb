use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use motorpool_core::domain::vehicle::ActorId;

use crate::messages::MessageTemplate;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Address of a message the bot has posted and may later edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatApiError {
    /// The referenced message no longer exists (deleted out-of-band).
    #[error("message not found: {0}")]
    NotFound(String),
    #[error("chat transport failed: {0}")]
    Transport(String),
}

/// REST side of the chat platform: everything the bot sends, edits or sets,
/// behind one seam so tests and offline runs can swap the implementation.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(
        &self,
        channel: &ChannelId,
        template: &MessageTemplate,
    ) -> Result<MessageRef, ChatApiError>;

    async fn edit_message(
        &self,
        message: &MessageRef,
        template: &MessageTemplate,
    ) -> Result<(), ChatApiError>;

    /// Reply visible only to the requesting actor.
    async fn send_ephemeral(
        &self,
        channel: &ChannelId,
        actor: &ActorId,
        template: &MessageTemplate,
    ) -> Result<(), ChatApiError>;

    async fn set_presence(&self, text: &str) -> Result<(), ChatApiError>;
}

/// Accepts everything and hands out synthetic message ids.
#[derive(Default)]
pub struct NoopChatApi {
    next_id: AtomicU64,
}

#[async_trait]
impl ChatApi for NoopChatApi {
    async fn send_message(
        &self,
        channel: &ChannelId,
        _template: &MessageTemplate,
    ) -> Result<MessageRef, ChatApiError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(MessageRef {
            channel_id: channel.clone(),
            message_id: MessageId(format!("noop-{id}")),
        })
    }

    async fn edit_message(
        &self,
        _message: &MessageRef,
        _template: &MessageTemplate,
    ) -> Result<(), ChatApiError> {
        Ok(())
    }

    async fn send_ephemeral(
        &self,
        _channel: &ChannelId,
        _actor: &ActorId,
        _template: &MessageTemplate,
    ) -> Result<(), ChatApiError> {
        Ok(())
    }

    async fn set_presence(&self, _text: &str) -> Result<(), ChatApiError> {
        Ok(())
    }
}
