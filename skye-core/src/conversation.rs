use tracing::{debug, info, warn};

use crate::{
    error::ConversationError,
    llm::{Content, FunctionCall, GenerativeModel, ModelResponse, Part},
    tools::ToolRegistry,
};

pub const DEFAULT_MAX_TOOL_ROUND_TRIPS: usize = 5;

enum State {
    AwaitingUserInput,
    ModelGenerating,
    ToolDispatch(FunctionCall),
    Done(String),
}

/// Drives one user turn: the model may call tools any number of times (up
/// to the round-trip limit) before it answers in text.
#[derive(Debug, Clone)]
pub struct ConversationLoop {
    max_tool_round_trips: usize,
    system_instruction: Option<String>,
}

impl Default for ConversationLoop {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOOL_ROUND_TRIPS)
    }
}

impl ConversationLoop {
    pub fn new(max_tool_round_trips: usize) -> Self {
        Self { max_tool_round_trips, system_instruction: None }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn max_tool_round_trips(&self) -> usize {
        self.max_tool_round_trips
    }

    /// Appends the prompt and every tool exchange to `history` and returns
    /// the model's final text. The final text itself is not appended.
    pub async fn invoke(
        &self,
        model: &dyn GenerativeModel,
        user_prompt: &str,
        history: &mut Vec<Content>,
        tools: &ToolRegistry,
    ) -> Result<String, ConversationError> {
        let declarations = tools.declarations();
        let mut round_trips = 0;
        let mut state = State::AwaitingUserInput;

        loop {
            state = match state {
                State::AwaitingUserInput => {
                    history.push(Content::user_text(user_prompt));
                    State::ModelGenerating
                }
                State::ModelGenerating => {
                    debug!(messages = history.len(), "invoking model");
                    let response = model
                        .generate(history.as_slice(), &declarations, self.system_instruction.as_deref())
                        .await?;

                    match first_part(response)? {
                        Part::Text(text) => State::Done(text),
                        Part::FunctionCall(call) => {
                            history.push(Content::function_call(call.clone()));
                            State::ToolDispatch(call)
                        }
                        Part::FunctionResponse { name, .. } => {
                            return Err(ConversationError::UnexpectedPart(format!(
                                "function response for {name}"
                            )));
                        }
                    }
                }
                State::ToolDispatch(call) => {
                    if round_trips >= self.max_tool_round_trips {
                        warn!(limit = self.max_tool_round_trips, tool = %call.name, "tool loop limit reached");
                        return Err(ConversationError::ToolLoopExceeded {
                            limit: self.max_tool_round_trips,
                        });
                    }
                    round_trips += 1;

                    info!(tool = %call.name, round_trip = round_trips, "model requested tool");
                    let output = tools.dispatch(&call.name, &call.args).await;
                    history.push(Content::function_response(call.name, output));
                    State::ModelGenerating
                }
                State::Done(text) => return Ok(text),
            };
        }
    }
}

/// One model call with no tools and no shared history; returns the first text part.
pub async fn invoke_data_processor(
    model: &dyn GenerativeModel,
    system_instruction: Option<&str>,
    user_prompt: &str,
) -> Result<String, ConversationError> {
    let message = [Content::user_text(user_prompt)];
    let response = model.generate(&message, &[], system_instruction).await?;

    match first_part(response)? {
        Part::Text(text) => Ok(text),
        Part::FunctionCall(call) => Err(ConversationError::UnexpectedPart(format!(
            "function call to {} without tools",
            call.name
        ))),
        Part::FunctionResponse { name, .. } => Err(ConversationError::UnexpectedPart(format!(
            "function response for {name}"
        ))),
    }
}

fn first_part(response: ModelResponse) -> Result<Part, ConversationError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.parts.into_iter().next())
        .ok_or(ConversationError::EmptyResponse)
}
