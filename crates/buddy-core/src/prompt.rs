//! Prompt assembly for a single turn.

/// Fixed prompt template: role framing, usage rules, memory context block,
/// then the user question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    assistant_name: String,
}

const RULES: &[&str] = &[
    "Use the provided memory to answer the user.",
    "If memory contains relevant information, prioritize it.",
    "If memory does not contain relevant information, answer normally.",
    "Be concise, clear, and helpful.",
    "Do NOT invent facts that are not in memory.",
    "Maintain conversational tone.",
];

impl PromptTemplate {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
        }
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    /// Render the prompt for `query` grounded on the recalled `context`.
    pub fn render(&self, context: &str, query: &str) -> String {
        let name = &self.assistant_name;
        let mut prompt =
            format!("You are {name}, a smart personal assistant with memory.\n\nFollow these rules:\n");
        for rule in RULES {
            prompt.push_str("- ");
            prompt.push_str(rule);
            prompt.push('\n');
        }
        prompt.push_str("\nMemory Context:\n");
        prompt.push_str(context);
        prompt.push_str("\n\nUser Question:\n");
        prompt.push_str(query);
        prompt.push_str(&format!("\n\n{name} Response:"));
        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new("BuddyAI")
    }
}
