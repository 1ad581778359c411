use crate::types::{Question, RetrievedContext};

/// System instructions for grounded, short answers. `{context}` is replaced
/// with the retrieved chunk texts.
pub const SYSTEM_PROMPT: &str = "You are a question answering assistant. \
Use the retrieved context below. If you don't know the answer, say you don't know. \
Be concise (3 sentences max).\n\n{context}";

const CONTEXT_PLACEHOLDER: &str = "{context}";

/// The two chat messages sent to the language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Fixed system template. Never built from request data, so a question can
/// only ever land in the user message.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assemble(&self, context: &RetrievedContext, question: &Question) -> Prompt {
        Prompt {
            system: self.system.replacen(CONTEXT_PLACEHOLDER, &context.render(), 1),
            user: question.as_str().to_string(),
        }
    }
}
