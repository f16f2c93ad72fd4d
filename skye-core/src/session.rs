use std::sync::Arc;

use crate::{
    conversation::ConversationLoop,
    error::ConversationError,
    llm::{Content, GenerativeModel},
    tools::ToolRegistry,
};

/// A chat with the tool-using model. Owns the history across turns.
#[derive(Debug)]
pub struct ChatSession {
    model: Arc<dyn GenerativeModel>,
    tools: ToolRegistry,
    conversation: ConversationLoop,
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        tools: ToolRegistry,
        conversation: ConversationLoop,
    ) -> Self {
        Self { model, tools, conversation, history: Vec::new() }
    }

    /// Runs one turn and records the model's answer in the history.
    pub async fn send(&mut self, prompt: &str) -> Result<String, ConversationError> {
        let answer = self
            .conversation
            .invoke(self.model.as_ref(), prompt, &mut self.history, &self.tools)
            .await?;

        self.history.push(Content::model_text(answer.clone()));
        Ok(answer)
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        llm::{ModelResponse, Part, Role},
        testing::ScriptedModel,
    };
    use serde_json::json;

    #[tokio::test]
    async fn answers_are_appended_after_tool_exchange() {
        let model = Arc::new(ScriptedModel::new([
            ModelResponse::function_call("get_weather_info", json!({"location": "Atlanta"})),
            ModelResponse::text("Bring an umbrella."),
            ModelResponse::text("You're welcome!"),
        ]));
        let mut session =
            ChatSession::new(model.clone(), ToolRegistry::new(), ConversationLoop::default());

        let first = session.send("Rain in Atlanta tomorrow?").await.unwrap();
        assert_eq!(first, "Bring an umbrella.");
        assert_eq!(session.history().len(), 4);
        assert_eq!(session.history()[3], Content::model_text("Bring an umbrella."));

        session.send("Thanks").await.unwrap();
        assert_eq!(session.history().len(), 6);

        // The second turn sees the full earlier exchange.
        let calls = model.calls();
        assert_eq!(calls[2].history.len(), 5);
        assert_eq!(calls[2].history[4].role, Role::User);
        assert_eq!(calls[2].history[4].parts[0], Part::Text("Thanks".into()));
    }

    #[tokio::test]
    async fn clear_resets_history() {
        let model = Arc::new(ScriptedModel::new([ModelResponse::text("Hi!")]));
        let mut session = ChatSession::new(model, ToolRegistry::new(), ConversationLoop::default());

        session.send("Hello").await.unwrap();
        session.clear();
        assert!(session.history().is_empty());
    }
}
