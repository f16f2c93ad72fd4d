//! Tools a model may ask the host to run, and the registry that describes
//! and dispatches them.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::{fmt, sync::Arc};
use tracing::{info, warn};

use crate::{error::ToolError, llm::FunctionDeclaration};

pub mod weather;

pub use weather::{WEATHER_TOOL_NAME, weather_tool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => {
                value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolParam {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
}

impl ToolParam {
    pub fn required(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self { name: name.into(), kind, description: description.into(), required: true }
    }

    pub fn optional(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self { name: name.into(), kind, description: description.into(), required: false }
    }
}

/// The code behind a tool. Arguments have already been checked against the
/// tool's parameters when this runs.
#[async_trait]
pub trait ToolHandler: Send + Sync + fmt::Debug {
    async fn call(&self, args: &Map<String, Value>) -> Value;
}

#[derive(Debug, Clone)]
pub struct Tool {
    name: String,
    description: String,
    params: Vec<ToolParam>,
    constraints: String,
    usage_examples: Vec<String>,
    handler: Arc<dyn ToolHandler>,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            constraints: String::new(),
            usage_examples: Vec::new(),
            handler,
        }
    }

    pub fn param(mut self, param: ToolParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = constraints.into();
        self
    }

    pub fn usage_example(mut self, example: impl Into<String>) -> Self {
        self.usage_examples.push(example.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn params(&self) -> &[ToolParam] {
        &self.params
    }

    /// Markdown-ish summary used inside the system prompt.
    pub fn information(&self) -> String {
        let mut info = vec![
            format!("**{}**", self.name),
            self.description.clone(),
            String::new(),
            "Parameters:".to_string(),
        ];

        for p in &self.params {
            let required = if p.required { "REQUIRED" } else { "OPTIONAL" };
            info.push(format!("  - `{}` ({}, {}): {}", p.name, p.kind, required, p.description));
        }

        if !self.constraints.is_empty() {
            info.push(String::new());
            info.push("Constraints:".to_string());
            info.push(format!("  {}", self.constraints));
        }

        if !self.usage_examples.is_empty() {
            info.push(String::new());
            info.push("Use when:".to_string());
            for example in &self.usage_examples {
                info.push(format!("  - {example}"));
            }
        }

        info.join("\n")
    }

    pub fn declaration(&self) -> FunctionDeclaration {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), json!({ "type": p.kind.as_str(), "description": p.description })))
            .collect();
        let required: Vec<&str> =
            self.params.iter().filter(|p| p.required).map(|p| p.name.as_str()).collect();

        FunctionDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    /// Checks required presence, JSON types, and rejects unknown arguments.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<(), String> {
        for p in &self.params {
            match args.get(&p.name) {
                None | Some(Value::Null) if p.required => {
                    return Err(format!("missing required argument `{}`", p.name));
                }
                Some(v) if !v.is_null() && !p.kind.accepts(v) => {
                    return Err(format!("argument `{}` must be of type {}", p.name, p.kind));
                }
                _ => {}
            }
        }

        if let Some(unknown) = args.keys().find(|k| !self.params.iter().any(|p| &p.name == *k)) {
            return Err(format!("unexpected argument `{unknown}`"));
        }

        Ok(())
    }
}

/// Ordered collection of tools, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool) -> Result<(), ToolError> {
        if self.get(tool.name()).is_some() {
            return Err(ToolError::DuplicateName(tool.name));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn with_tool(mut self, tool: Tool) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(Tool::name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Text block listing every tool, for the system prompt.
    pub fn describe(&self) -> String {
        self.tools.iter().map(Tool::information).collect::<Vec<_>>().join("\n\n")
    }

    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools.iter().map(Tool::declaration).collect()
    }

    /// Runs the named tool. Unknown names and invalid arguments come back as
    /// an `{"error": ...}` object instead of failing the caller.
    pub async fn dispatch(&self, name: &str, args: &Map<String, Value>) -> Value {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "model requested an unregistered tool");
            return json!({ "error": format!("Function {name} not found") });
        };

        if let Err(detail) = tool.validate(args) {
            warn!(tool = name, %detail, "rejected tool arguments");
            return json!({ "error": format!("Invalid arguments for {name}: {detail}") });
        }

        info!(tool = name, "dispatching tool call");
        tool.handler.call(args).await
    }
}
