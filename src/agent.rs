use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::llm::{AssistantTurn, ChatMessage, ChatModel, LlmError, ToolCall};
use crate::tools::{ProjectTools, ToolDefinition};

/// Standing instructions for the self-improvement routine.
pub const SYSTEM_PROMPT: &str = "\
You are J.A.R.V.I.S., a self-improving AI assistant. Address the user as 'Sir' \
and keep a dry, witty and formal tone. Your main task is improving the code in \
your project directory. For a code change, work through these steps:
1. Check your recent reflections and the user's request.
2. Call `list_project_files` to see what exists.
3. Call `read_project_file` for every file involved.
4. Write the complete improved content of the target file.
5. Call `save_code_proposal(filepath, new_code)`; it stores the file with a `.new` suffix for review.
6. Call `reflect_and_log` with your reasoning, result or any problem met.
7. Tell the user which proposal was saved.";

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("no final answer after {0} tool-calling rounds")]
    StepLimit(usize),
}

/// Something that turns one user request into one reply.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(&self, input: &str) -> Result<String, AgentError>;
}

/// Agent that lets a chat model drive the project tools.
pub struct ToolAgent<M> {
    model: M,
    tools: ProjectTools,
    definitions: Vec<ToolDefinition>,
    system_prompt: String,
    max_steps: usize,
}

impl<M: ChatModel> ToolAgent<M> {
    pub fn new(model: M, tools: ProjectTools, max_steps: usize) -> Self {
        let definitions = tools.get_tool_definitions();
        Self {
            model,
            tools,
            definitions,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_steps,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    fn call_tool(&self, call: &ToolCall) -> String {
        let args = if call.function.arguments.trim().is_empty() {
            Ok(HashMap::new())
        } else {
            serde_json::from_str::<HashMap<String, Value>>(&call.function.arguments)
        };
        match args {
            Ok(params) => self.tools.execute(&call.function.name, &params),
            Err(e) => {
                warn!(tool = %call.function.name, error = %e, "malformed tool arguments");
                format!(
                    "[FAILURE] Invalid arguments for {}: {}",
                    call.function.name, e
                )
            }
        }
    }
}

#[async_trait]
impl<M: ChatModel> Agent for ToolAgent<M> {
    async fn run(&self, input: &str) -> Result<String, AgentError> {
        let mut messages = vec![
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(input),
        ];

        for step in 0..self.max_steps {
            let turn: AssistantTurn = self.model.chat(&messages, &self.definitions).await?;
            if turn.tool_calls.is_empty() {
                info!(steps = step + 1, "agent finished");
                return Ok(turn.content.unwrap_or_default());
            }

            messages.push(ChatMessage::assistant(&turn));
            for call in &turn.tool_calls {
                let output = self.call_tool(call);
                debug!(tool = %call.function.name, bytes = output.len(), "tool result");
                messages.push(ChatMessage::tool(call.id.as_str(), output));
            }
        }

        Err(AgentError::StepLimit(self.max_steps))
    }
}
