// src/chat/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emotion tag attached to replies that could not be fetched
pub const ERROR_EMOTION: &str = "에러";
pub const ERROR_REPLY: &str = "서버와 통신 중 문제가 발생했습니다. 다시 시도해주세요.";

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub user_input: &'a str,
}

/// Reply from `POST /api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub ai_response: String,
    #[serde(default)]
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub depression_score: Option<i64>,
}

/// Stored conversation from `GET /api/chat/history`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatHistory {
    #[serde(default)]
    pub conversation: Vec<ConversationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationEntry {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn is_user(&self) -> bool {
        matches!(self, Sender::User)
    }
}

/// One bubble in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub emotion: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Sender::User, None)
    }

    pub fn ai(content: impl Into<String>, emotion: Option<String>) -> Self {
        Self::new(content, Sender::Ai, emotion)
    }

    fn new(content: impl Into<String>, sender: Sender, emotion: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
            emotion,
        }
    }

    pub fn is_error(&self) -> bool {
        self.emotion.as_deref() == Some(ERROR_EMOTION)
    }
}

pub fn greeting(name: &str) -> String {
    format!("안녕하세요, {}님! 오늘 기분은 어떠신가요?", name)
}
