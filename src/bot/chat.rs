use async_trait::async_trait;
use serenity::{
    builder::EditMessage,
    http::Http,
    model::{
        channel::ReactionType,
        id::{ChannelId, MessageId, UserId},
    },
};
use std::sync::{Arc, OnceLock};
use tracing::warn;

use crate::error::{MusicError, MusicResult};

/// Operaciones de mensajería que usan el panel y los anuncios
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> MusicResult<MessageId>;

    async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        content: &str,
    ) -> MusicResult<()>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> MusicResult<()>;

    async fn add_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> MusicResult<()>;

    async fn remove_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> MusicResult<()>;
}

/// [`ChatPlatform`] over serenity's REST client.
///
/// Built before the serenity `Client` and attached to `client.http` once the
/// client exists, so chat calls share the gateway client's rate limiter.
#[derive(Default)]
pub struct SerenityChat {
    http: OnceLock<Arc<Http>>,
}

impl SerenityChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conecta el adaptador al cliente HTTP. Solo cuenta la primera llamada.
    pub fn attach(&self, http: Arc<Http>) {
        if self.http.set(http).is_err() {
            warn!("El chat ya estaba conectado a un cliente HTTP");
        }
    }

    fn http(&self) -> MusicResult<&Arc<Http>> {
        self.http.get().ok_or(MusicError::Discord(serenity::Error::Other(
            "chat used before the gateway client was attached",
        )))
    }
}

#[async_trait]
impl ChatPlatform for SerenityChat {
    async fn send_message(&self, channel_id: ChannelId, content: &str) -> MusicResult<MessageId> {
        let message = channel_id.say(self.http()?, content).await?;
        Ok(message.id)
    }

    async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        content: &str,
    ) -> MusicResult<()> {
        channel_id
            .edit_message(self.http()?, message_id, EditMessage::new().content(content))
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> MusicResult<()> {
        channel_id.delete_message(self.http()?, message_id).await?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> MusicResult<()> {
        channel_id
            .create_reaction(self.http()?, message_id, ReactionType::Unicode(emoji.to_string()))
            .await?;
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> MusicResult<()> {
        channel_id
            .delete_reaction(
                self.http()?,
                message_id,
                Some(user_id),
                ReactionType::Unicode(emoji.to_string()),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn calls_fail_until_attached() {
        let chat = SerenityChat::new();

        let err = chat
            .send_message(ChannelId::new(1), "hola")
            .await
            .unwrap_err();
        assert!(matches!(err, MusicError::Discord(_)));
    }

    #[test]
    fn first_attached_client_wins() {
        let chat = SerenityChat::new();
        let gateway = Arc::new(Http::new("token"));

        chat.attach(gateway.clone());
        chat.attach(Arc::new(Http::new("other")));

        assert!(Arc::ptr_eq(chat.http().unwrap(), &gateway));
    }
}
