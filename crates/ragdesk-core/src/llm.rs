//! Answer synthesizer trait.
//!
//! Concrete providers (Gemini, Ollama) live in the `ragdesk` app crate.
//! Orchestrators never surface provider errors to their callers; they go
//! through [`generate_or_explain`], which turns any failure into a
//! readable answer string.

use anyhow::Result;
use async_trait::async_trait;

/// Returned when the model replies with nothing but whitespace.
pub const EMPTY_ANSWER: &str = "(No answer returned by model.)";

/// Prefix of every degraded answer.
pub const ERROR_PREFIX: &str = "Error calling LLM";

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. `"gemini"`).
    fn name(&self) -> &str;
    /// Model identifier (e.g. `"gemini-2.5-flash"`).
    fn model(&self) -> &str;
    /// Send a prompt and return the raw model reply.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Call the provider and always return an answer.
///
/// Errors become `"Error calling LLM: <reason>"`; an empty reply becomes
/// [`EMPTY_ANSWER`].
pub async fn generate_or_explain(llm: &dyn LlmProvider, prompt: &str) -> String {
    match llm.generate(prompt).await {
        Ok(reply) => {
            let reply = reply.trim();
            if reply.is_empty() {
                EMPTY_ANSWER.to_string()
            } else {
                reply.to_string()
            }
        }
        Err(e) => {
            tracing::warn!(provider = llm.name(), error = %format!("{:#}", e), "LLM call failed");
            format!("{}: {:#}", ERROR_PREFIX, e)
        }
    }
}

/// Whether `answer` is a degraded error answer.
pub fn is_error_answer(answer: &str) -> bool {
    answer.starts_with(ERROR_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Result<String, String>);

    #[async_trait]
    impl LlmProvider for Canned {
        fn name(&self) -> &str {
            "canned"
        }
        fn model(&self) -> &str {
            "canned-1"
        }
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.0.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    #[tokio::test]
    async fn test_reply_is_trimmed() {
        let llm = Canned(Ok("  on the mat \n".to_string()));
        assert_eq!(generate_or_explain(&llm, "q").await, "on the mat");
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let llm = Canned(Ok("   ".to_string()));
        assert_eq!(generate_or_explain(&llm, "q").await, EMPTY_ANSWER);
    }

    #[tokio::test]
    async fn test_error_degrades_to_text() {
        let llm = Canned(Err("GEMINI_API_KEY is not set".to_string()));
        let answer = generate_or_explain(&llm, "q").await;
        assert_eq!(answer, "Error calling LLM: GEMINI_API_KEY is not set");
        assert!(is_error_answer(&answer));
    }
}
