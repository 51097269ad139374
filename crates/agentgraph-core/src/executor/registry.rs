use std::collections::HashMap;
use std::sync::Arc;

use super::{AgentExecutor, ExecutorError, ToolExecutor};

/// Maps an `assignee_id` (`Agent:<name>`) to an [`AgentExecutor`] and a
/// `tool_id` (`Tool:<name>`) to a [`ToolExecutor`].
///
/// Lookups strip the `Agent:`/`Tool:` prefix before keying, so an executor
/// is registered once under its bare name (`"Weather"`) and resolved for
/// either the full assignee id or a tool call's bare `tool_id`.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    agents: HashMap<String, Arc<dyn AgentExecutor>>,
    tools: HashMap<String, Arc<dyn ToolExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, name: impl Into<String>, executor: Arc<dyn AgentExecutor>) -> Self {
        self.agents.insert(name.into(), executor);
        self
    }

    pub fn with_tool(mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) -> Self {
        self.tools.insert(name.into(), executor);
        self
    }

    pub fn register_agent(&mut self, name: impl Into<String>, executor: Arc<dyn AgentExecutor>) {
        self.agents.insert(name.into(), executor);
    }

    pub fn register_tool(&mut self, name: impl Into<String>, executor: Arc<dyn ToolExecutor>) {
        self.tools.insert(name.into(), executor);
    }

    pub fn agent_for(&self, assignee_id: &str) -> Result<Arc<dyn AgentExecutor>, ExecutorError> {
        let name = assignee_id.strip_prefix("Agent:").unwrap_or(assignee_id);
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutorError::AgentNotFound(assignee_id.to_string()))
    }

    pub fn tool_for(&self, tool_id: &str) -> Result<Arc<dyn ToolExecutor>, ExecutorError> {
        let name = tool_id.strip_prefix("Tool:").unwrap_or(tool_id);
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutorError::ToolNotFound(tool_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::fixtures::{EchoToolExecutor, HelloWorldAgentExecutor};

    #[test]
    fn resolves_by_bare_name_from_prefixed_ids() {
        let registry = ExecutorRegistry::new()
            .with_agent("HelloWorld", Arc::new(HelloWorldAgentExecutor))
            .with_tool("Echo", Arc::new(EchoToolExecutor));

        assert!(registry.agent_for("Agent:HelloWorld").is_ok());
        assert!(registry.tool_for("Tool:Echo").is_ok());
        assert!(registry.agent_for("Agent:Missing").is_err());
    }
}
