// Conversation state for one signed-in user

use tracing::{debug, info, warn};

use super::models::{
    greeting, ChatHistory, ChatMessage, ChatRequest, ChatResponse, ConversationEntry,
    ERROR_EMOTION, ERROR_REPLY,
};
use crate::auth::handlers::user_info;
use crate::common::error::ApiError;
use crate::services::api_client::{ApiClient, ApiRequest};

const FALLBACK_NAME: &str = "사용자";

// Stored user turns wrap the typed text in a prompt: 사용자가 이렇게 말했습니다: "<text>"
const PROMPT_MARKER: &str = "사용자가 이렇게 말했습니다: \"";

pub struct ChatSession {
    api: ApiClient,
    user_name: Option<String>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            user_name: None,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// Looks up the user's name and seeds the greeting. An unreachable
    /// profile falls back to a generic name.
    pub async fn start(&mut self) -> &ChatMessage {
        let name = match user_info(&self.api).await {
            Ok(info) => info.display_name().to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to load user info for chat greeting");
                FALLBACK_NAME.to_string()
            }
        };
        self.greet(name)
    }

    /// Resets the conversation to a single greeting for `name`
    pub fn greet(&mut self, name: impl Into<String>) -> &ChatMessage {
        let name = name.into();
        self.messages = vec![ChatMessage::ai(greeting(&name), None)];
        self.user_name = Some(name);
        &self.messages[0]
    }

    /// Appends the stored conversation after the greeting. System turns are
    /// skipped.
    pub async fn load_history(&mut self) -> Result<usize, ApiError> {
        let history: ChatHistory = self
            .api
            .send_json(ApiRequest::get("/api/chat/history"))
            .await?;

        let restored: Vec<ChatMessage> = history
            .conversation
            .iter()
            .filter_map(history_message)
            .collect();
        let count = restored.len();
        self.messages.extend(restored);

        debug!(count, "Chat history restored");
        Ok(count)
    }

    /// Sends one user turn. Blank input is ignored and returns `None`.
    ///
    /// Failures never surface as errors: the reply slot is filled with an
    /// apology tagged [`ERROR_EMOTION`] instead.
    pub async fn send(&mut self, text: &str) -> Option<&ChatMessage> {
        if text.trim().is_empty() {
            return None;
        }
        self.messages.push(ChatMessage::user(text));

        let reply = match self.ask(text).await {
            Ok(response) => {
                info!(
                    sentiment = response.sentiment_label.as_deref().unwrap_or("-"),
                    depression_score = ?response.depression_score,
                    "Chat reply received"
                );
                ChatMessage::ai(response.ai_response, response.sentiment_label)
            }
            Err(e) => {
                warn!(error = %e, "Chat request failed");
                ChatMessage::ai(ERROR_REPLY, Some(ERROR_EMOTION.to_string()))
            }
        };

        self.messages.push(reply);
        self.messages.last()
    }

    async fn ask(&self, text: &str) -> Result<ChatResponse, ApiError> {
        let request = ApiRequest::post("/api/chat").json(&ChatRequest { user_input: text })?;
        self.api.send_json(request).await
    }
}

fn history_message(entry: &ConversationEntry) -> Option<ChatMessage> {
    match entry.role.as_str() {
        "user" => Some(ChatMessage::user(unwrap_prompt(&entry.content))),
        "assistant" => Some(ChatMessage::ai(entry.content.clone(), None)),
        _ => None,
    }
}

fn unwrap_prompt(content: &str) -> String {
    content
        .split_once(PROMPT_MARKER)
        .and_then(|(_, rest)| rest.split_once("\"\n"))
        .map(|(typed, _)| typed.to_string())
        .unwrap_or_else(|| content.trim().to_string())
}
