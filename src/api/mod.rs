use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::message::Message;

#[derive(Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub test_mode: bool,
}

#[derive(Deserialize)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    pub delta: ChatResponseDelta,
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

/// A model entry as reported by the platform: either a bare id or an
/// object carrying `id` (or the legacy `puterId`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListedModel {
    Id(String),
    Object {
        #[serde(default)]
        id: Option<String>,
        #[serde(default, rename = "puterId")]
        puter_id: Option<String>,
    },
}

impl ListedModel {
    pub fn id(&self) -> Option<&str> {
        let id = match self {
            ListedModel::Id(id) => Some(id.as_str()),
            ListedModel::Object { id, puter_id } => id.as_deref().or(puter_id.as_deref()),
        };
        id.filter(|id| !id.is_empty())
    }
}

/// `GET /models` accepts both the OpenAI envelope and a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ModelsResponse {
    Envelope { data: Vec<ListedModel> },
    List(Vec<ListedModel>),
}

impl ModelsResponse {
    pub fn into_models(self) -> Vec<ListedModel> {
        match self {
            ModelsResponse::Envelope { data } => data,
            ModelsResponse::List(models) => models,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Serialize)]
pub struct SignInRequest {
    pub attempt_temp_user_creation: bool,
}

#[derive(Deserialize)]
pub struct SignInResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

pub mod models;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_models_accept_strings_and_objects() {
        let raw = r#"[
            "openai/gpt-4o",
            {"id": "mistralai/mistral-small"},
            {"puterId": "x-ai/grok-4"},
            {"name": "no id here"}
        ]"#;
        let parsed: ModelsResponse = serde_json::from_str(raw).expect("model list");
        let ids: Vec<Option<&str>> = match &parsed {
            ModelsResponse::List(models) => models.iter().map(ListedModel::id).collect(),
            ModelsResponse::Envelope { .. } => panic!("expected bare list"),
        };
        assert_eq!(
            ids,
            vec![
                Some("openai/gpt-4o"),
                Some("mistralai/mistral-small"),
                Some("x-ai/grok-4"),
                None
            ]
        );
    }

    #[test]
    fn envelope_models_are_unwrapped() {
        let parsed: ModelsResponse =
            serde_json::from_str(r#"{"data":[{"id":"a/b","owned_by":"a"}]}"#).expect("envelope");
        let models = parsed.into_models();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id(), Some("a/b"));
    }

    #[test]
    fn user_keeps_unknown_fields() {
        let user: User =
            serde_json::from_str(r#"{"username":"wukong","uuid":"u-1","is_temp":true}"#)
                .expect("user");
        assert_eq!(user.username, "wukong");
        assert_eq!(user.extra.get("uuid"), Some(&Value::from("u-1")));
    }

    #[test]
    fn test_mode_is_only_sent_when_enabled() {
        let messages = vec![Message::user("hi")];
        let request = ChatRequest {
            model: "openai/gpt-4o",
            messages: &messages,
            stream: true,
            test_mode: false,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert!(json.get("test_mode").is_none());
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
