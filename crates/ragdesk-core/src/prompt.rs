//! Prompt construction for the answer synthesizer.
//!
//! Every prompt the orchestrators send to an [`LlmProvider`](crate::llm::LlmProvider)
//! is built here, so the wording lives in one place.

use crate::models::ConversationTurn;

/// The reply the model is told to give when the context has no answer.
pub const NOT_FOUND: &str = "Not found";

/// Characters of raw text sent when asking for a summary.
pub const SUMMARY_INPUT_CHARS: usize = 8000;

/// Characters of raw text sent for sentiment and keyword analysis.
pub const ANALYSIS_INPUT_CHARS: usize = 3000;

/// Return at most the first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Retrieval prompt: answer strictly from the given chunks.
pub fn context_prompt(chunks: &[String], question: &str) -> String {
    format!(
        "You are a retrieval-augmented question answering system.\n\
         Answer ONLY using the context provided.\n\
         \n\
         --- CONTEXT ---\n\
         {}\n\
         --- END CONTEXT ---\n\
         \n\
         Question: {}\n\
         \n\
         If the answer cannot be found in the context, say \"{}\".",
        chunks.join("\n\n"),
        question,
        NOT_FOUND
    )
}

/// Render turns as `Role: content` lines.
pub fn render_transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Conversational prompt. Retrieved chunks, when present, are placed ahead
/// of the conversation.
pub fn chat_prompt(transcript: &str, message: &str, chunks: &[String]) -> String {
    let mut prompt = String::new();
    if !chunks.is_empty() {
        prompt.push_str("--- Retrieved Context ---\n");
        prompt.push_str(&chunks.join("\n\n"));
        prompt.push_str("\n--- End Context ---\n\n");
    }
    prompt.push_str(&format!(
        "You are in a conversation with the user.\n\
         If external document context is provided, use it; otherwise answer normally.\n\
         \n\
         Conversation so far:\n\
         {}\n\
         \n\
         User's latest message: {}\n\
         \n\
         Reply as a helpful assistant.",
        transcript, message
    ));
    prompt
}

pub fn summary_prompt(raw_text: &str) -> String {
    format!(
        "Summarize this clearly:\n\n{}",
        truncate_chars(raw_text, SUMMARY_INPUT_CHARS)
    )
}

pub fn sentiment_prompt(text: &str) -> String {
    format!(
        "You are a sentiment classifier. Read the document text and classify the\n\
         overall sentiment strictly as one of the following:\n\
         \n\
         - Positive\n\
         - Negative\n\
         - Neutral\n\
         \n\
         Respond with ONLY one word, no explanation.\n\
         \n\
         Document:\n\
         {}",
        truncate_chars(text, ANALYSIS_INPUT_CHARS)
    )
}

pub fn keyword_prompt(text: &str, max_keywords: usize) -> String {
    format!(
        "Extract the TOP {} most important keywords from the following text.\n\
         Respond ONLY with a comma-separated list of keywords. No sentences.\n\
         \n\
         Text:\n\
         {}",
        max_keywords,
        truncate_chars(text, ANALYSIS_INPUT_CHARS)
    )
}
