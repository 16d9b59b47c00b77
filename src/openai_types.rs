use serde::{Deserialize, Serialize};

pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize, Default, Debug)]
pub struct OpenAIPayload {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIBatchResponse {
    pub choices: Vec<OpenAIBatchChoice>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIBatchChoice {
    pub message: OpenAIMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct OpenAIStreamResponse {
    pub choices: Vec<OpenAIStreamChoice>,
}

impl OpenAIStreamResponse {
    /// The incremental text carried by this frame.  Role markers, empty
    /// deltas, and frames without choices all coalesce to "".
    pub fn fragment(&self) -> &str {
        match self.choices.first().map(|c| &c.delta) {
            Some(StreamDelta::Content { content }) => content,
            _ => "",
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct OpenAIStreamChoice {
    pub delta: StreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum StreamDelta {
    Role { role: String },
    Content { content: String },
    Empty {},
}
