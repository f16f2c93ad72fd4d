use async_trait::async_trait;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::{
    config::GeminiSettings,
    error::ModelError,
    llm::{Content, FunctionCall, FunctionDeclaration, GenerativeModel, ModelResponse, Part, Role},
    provider::truncate_body,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    api_key: String,
    model: String,
    base_url: String,
    http: Client,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ModelError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ModelError::MissingApiKey);
        }

        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;

        Ok(Self { api_key, model: model.into(), base_url: DEFAULT_BASE_URL.to_string(), http })
    }

    pub fn from_settings(settings: &GeminiSettings, api_key: String) -> Result<Self, ModelError> {
        Ok(Self::new(api_key, settings.model.clone())?.with_base_url(settings.base_url.clone()))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(
        history: &[Content],
        tools: &[FunctionDeclaration],
        system_instruction: Option<&str>,
    ) -> GenerateContentRequest {
        let tools = (!tools.is_empty()).then(|| {
            vec![WireTool {
                function_declarations: tools
                    .iter()
                    .map(|t| WireFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }]
        });

        GenerateContentRequest {
            contents: history.iter().map(WireContent::from).collect(),
            system_instruction: system_instruction.map(|text| WireContent {
                role: None,
                parts: vec![WirePart { text: Some(text.to_string()), ..Default::default() }],
            }),
            tools,
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn generate(
        &self,
        history: &[Content],
        tools: &[FunctionDeclaration],
        system_instruction: Option<&str>,
    ) -> Result<ModelResponse, ModelError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let request = Self::build_request(history, tools, system_instruction);
        debug!(model = %self.model, messages = history.len(), tools = tools.len(), "calling gemini");

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| ModelError::Decode(format!("Invalid API key format: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let res = self.http.post(&url).headers(headers).json(&request).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| truncate_body(&body));
            return Err(ModelError::Api { status: status.as_u16(), message });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| ModelError::Decode(format!("{e}: {}", truncate_body(&body))))?;

        let candidates = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .map(Content::try_from)
            .collect::<Result<_, _>>()?;

        Ok(ModelResponse { candidates })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum WireRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,

    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<WireRole>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

impl From<&Content> for WireContent {
    fn from(content: &Content) -> Self {
        let role = match content.role {
            Role::User => WireRole::User,
            Role::Model => WireRole::Model,
        };

        let parts = content
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => WirePart { text: Some(text.clone()), ..Default::default() },
                Part::FunctionCall(call) => WirePart {
                    function_call: Some(WireFunctionCall {
                        name: call.name.clone(),
                        args: Value::Object(call.args.clone()),
                    }),
                    thought_signature: call.thought_signature.clone(),
                    ..Default::default()
                },
                Part::FunctionResponse { name, response } => WirePart {
                    function_response: Some(WireFunctionResponse {
                        name: name.clone(),
                        response: response.clone(),
                    }),
                    ..Default::default()
                },
            })
            .collect();

        Self { role: Some(role), parts }
    }
}

impl TryFrom<WireContent> for Content {
    type Error = ModelError;

    fn try_from(content: WireContent) -> Result<Self, Self::Error> {
        let role = match content.role {
            Some(WireRole::User) => Role::User,
            Some(WireRole::Model) | None => Role::Model,
        };

        let mut parts = Vec::with_capacity(content.parts.len());
        for part in content.parts {
            // Thought summaries are not part of the answer.
            if part.thought == Some(true) {
                continue;
            }
            if let Some(call) = part.function_call {
                let args = match call.args {
                    Value::Object(map) => map,
                    Value::Null => Map::new(),
                    other => {
                        return Err(ModelError::Decode(format!(
                            "function call args for {} must be an object, got {other}",
                            call.name
                        )));
                    }
                };
                parts.push(Part::FunctionCall(FunctionCall {
                    name: call.name,
                    args,
                    thought_signature: part.thought_signature,
                }));
            } else if let Some(resp) = part.function_response {
                parts.push(Part::FunctionResponse { name: resp.name, response: resp.response });
            } else if let Some(text) = part.text {
                parts.push(Part::Text(text));
            }
        }

        Ok(Self { role, parts })
    }
}
