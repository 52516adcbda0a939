use std::sync::Arc;

use teloxide::prelude::ChatId;

use crate::knowledge::KnowledgeBase;
use crate::provider::{ProviderError, ResponseProvider};
use crate::sessions::SessionStore;

pub const PROVIDER_FAILURE_REPLY: &str = "Произошла ошибка при обращении к API";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Routed {
    pub reply: String,
    pub session: Option<String>,
}

/// Answers from the FAQ when it can, otherwise asks the provider.
#[derive(Clone)]
pub struct ConversationRouter {
    knowledge: Arc<KnowledgeBase>,
    provider: Arc<dyn ResponseProvider>,
    sessions: Arc<dyn SessionStore>,
}

impl ConversationRouter {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        provider: Arc<dyn ResponseProvider>,
        sessions: Arc<dyn SessionStore>,
    ) -> ConversationRouter {
        ConversationRouter {
            knowledge,
            provider,
            sessions,
        }
    }

    /// A non-OK provider status yields [`PROVIDER_FAILURE_REPLY`] and hands
    /// `prior_session` back untouched. Only transport failures are `Err`.
    pub async fn route(
        &self,
        utterance: &str,
        prior_session: Option<String>,
    ) -> Result<Routed, ProviderError> {
        if let Some(answer) = self.knowledge.lookup(utterance) {
            log::info!("FAQ hit for {:?}", utterance);
            return Ok(Routed {
                reply: answer.to_string(),
                session: prior_session,
            });
        }

        let response = self
            .provider
            .call(utterance, prior_session.as_deref())
            .await?;

        if !response.is_ok() {
            log::error!(
                "request_id={}, code={}, message={}",
                response.request_id,
                response.status_code.as_u16(),
                response.message
            );
            return Ok(Routed {
                reply: PROVIDER_FAILURE_REPLY.to_string(),
                session: prior_session,
            });
        }

        Ok(Routed {
            reply: response.output.text.unwrap_or_default(),
            session: response.output.session_id,
        })
    }

    /// Routes one message of a chat, threading the chat's session through the store.
    pub async fn reply_to(&self, chat_id: ChatId, utterance: &str) -> Result<String, ProviderError> {
        let prior = self.sessions.session(chat_id).await;
        let routed = self.route(utterance, prior.clone()).await?;

        if let Some(session) = routed.session {
            if prior.as_deref() != Some(session.as_str()) {
                self.sessions.advance(chat_id, session).await;
            }
        }

        Ok(routed.reply)
    }
}
