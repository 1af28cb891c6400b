//! Backend AI chat facade
//!
//! Chat messages are not durable intents: a failed message is answered with
//! an apology and never queued.

use super::{AiChatService, Envelope, FallbackGuard};
use crate::mock::MockDataset;
use crate::store::ServiceName;
use fitness_coach_shared::{ChatReply, ChatRequest};
use std::sync::Arc;

const SERVICE: ServiceName = ServiceName::AiChat;

#[derive(Clone)]
pub struct AiChatFacade {
    live: Arc<dyn AiChatService>,
    mock: Arc<dyn AiChatService>,
    guard: FallbackGuard,
}

impl AiChatFacade {
    pub fn new(
        live: Arc<dyn AiChatService>,
        mock: Arc<dyn AiChatService>,
        guard: FallbackGuard,
    ) -> Self {
        Self { live, mock, guard }
    }

    pub async fn chat(&self, message: &str, user_id: i64) -> Envelope<ChatReply> {
        let request = ChatRequest {
            message: message.to_string(),
            user_id,
        };

        let live = self.live.chat(&request);
        match self.guard.attempt(SERVICE, "chat", live).await {
            Some(reply) => Envelope::live(reply),
            None => Envelope::mock(
                self.mock
                    .chat(&request)
                    .await
                    .unwrap_or_else(|_| MockDataset::apology()),
            ),
        }
    }
}
