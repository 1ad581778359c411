//! Answer generation on top of an [`LLMClient`].

use std::sync::Arc;

use crate::llm::client::LLMClient;
use crate::rag::prompt::Prompt;
use crate::types::{Answer, GenerationError};
use crate::utils::logging::LLM_TRACE_TARGET;

/// Sends an assembled [`Prompt`] to the language model and turns the reply
/// into an [`Answer`].
pub struct AnswerGenerator {
    client: Arc<dyn LLMClient>,
    /// Project tag for prompt/answer trace events; `None` disables them.
    trace_project: Option<String>,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            trace_project: None,
        }
    }

    /// Emit an `llm_trace` event per call, tagged with `project`.
    pub fn with_tracing(mut self, project: impl Into<String>) -> Self {
        self.trace_project = Some(project.into());
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub async fn generate(&self, prompt: &Prompt) -> Result<Answer, GenerationError> {
        let started = std::time::Instant::now();
        let completion = self
            .client
            .generate_with_system(&prompt.system, &prompt.user)
            .await
            .map_err(|e| GenerationError::Provider(e.to_string()))?;

        if completion.trim().is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }

        if let Some(project) = &self.trace_project {
            tracing::info!(
                target: LLM_TRACE_TARGET,
                project = %project,
                model = %self.client.model_name(),
                system_chars = prompt.system.len(),
                question = %prompt.user,
                answer = %completion,
                latency_ms = started.elapsed().as_millis() as u64,
                "LLM call"
            );
        }

        Ok(Answer(completion))
    }
}
