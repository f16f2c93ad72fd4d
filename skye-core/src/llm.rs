//! Provider-neutral view of a generative model that can request tool calls.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Debug;

use crate::error::ModelError;

pub mod gemini;

pub use gemini::GeminiModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Map<String, Value>,
    /// Opaque provider token that must accompany the call when it is replayed.
    pub thought_signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse { name: String, response: Value },
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self { role: Role::User, parts: vec![Part::Text(text.into())] }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self { role: Role::Model, parts: vec![Part::Text(text.into())] }
    }

    pub fn function_call(call: FunctionCall) -> Self {
        Self { role: Role::Model, parts: vec![Part::FunctionCall(call)] }
    }

    /// Tool output wrapped as `{"result": output}`, sent back on the user side.
    pub fn function_response(name: impl Into<String>, output: Value) -> Self {
        let response = serde_json::json!({ "result": output });
        Self { role: Role::User, parts: vec![Part::FunctionResponse { name: name.into(), response }] }
    }
}

/// A callable function as advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelResponse {
    pub candidates: Vec<Content>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { candidates: vec![Content::model_text(text)] }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let call = FunctionCall { name: name.into(), args, thought_signature: None };
        Self { candidates: vec![Content::function_call(call)] }
    }

    /// First part of the first candidate.
    pub fn first_part(&self) -> Option<&Part> {
        self.candidates.first()?.parts.first()
    }
}

#[async_trait]
pub trait GenerativeModel: Send + Sync + Debug {
    async fn generate(
        &self,
        history: &[Content],
        tools: &[FunctionDeclaration],
        system_instruction: Option<&str>,
    ) -> Result<ModelResponse, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_response_wraps_result() {
        let msg = Content::function_response("get_weather_info", json!({"error": null}));

        assert_eq!(msg.role, Role::User);
        match &msg.parts[0] {
            Part::FunctionResponse { name, response } => {
                assert_eq!(name, "get_weather_info");
                assert_eq!(response, &json!({"result": {"error": null}}));
            }
            other => panic!("unexpected part {other:?}"),
        }
    }

    #[test]
    fn first_part_of_empty_response_is_none() {
        assert!(ModelResponse::default().first_part().is_none());
        assert_eq!(
            ModelResponse::text("hi").first_part(),
            Some(&Part::Text("hi".into()))
        );
    }

    #[test]
    fn non_object_args_become_empty() {
        let response = ModelResponse::function_call("f", json!("nope"));
        match response.first_part() {
            Some(Part::FunctionCall(call)) => assert!(call.args.is_empty()),
            other => panic!("unexpected part {other:?}"),
        }
    }
}
