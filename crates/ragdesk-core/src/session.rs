//! Caller-owned conversation state.
//!
//! A [`Session`] holds the chat history and the most recent question /
//! answer exchange. The orchestrators borrow it mutably for the duration of
//! one call; nothing here is global.

use serde::Serialize;

use crate::models::{ConversationTurn, ExportRow};

/// Number of most recent turns shown to the model in chat mode.
pub const HISTORY_WINDOW: usize = 6;

/// The last question asked, its answer, and the rows retrieved for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub rows: Vec<ExportRow>,
}

impl Exchange {
    /// Retrieved chunk texts, in rank order.
    pub fn chunk_texts(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.normalize().text).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    history: Vec<ConversationTurn>,
    last_exchange: Option<Exchange>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// The last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Append a user turn followed by the assistant's reply.
    pub fn push_exchange(&mut self, message: &str, reply: &str) {
        self.history.push(ConversationTurn::user(message));
        self.history.push(ConversationTurn::assistant(reply));
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn last_exchange(&self) -> Option<&Exchange> {
        self.last_exchange.as_ref()
    }

    pub fn set_last_exchange(&mut self, exchange: Exchange) {
        self.last_exchange = Some(exchange);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_recent_window() {
        let mut s = Session::new();
        for i in 0..5 {
            s.push_exchange(&format!("q{i}"), &format!("a{i}"));
        }
        assert_eq!(s.history().len(), 10);

        let recent = s.recent(HISTORY_WINDOW);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].content, "q2");
        assert_eq!(recent[0].role, Role::User);
        assert_eq!(recent[5].content, "a4");
    }

    #[test]
    fn test_recent_shorter_than_window() {
        let mut s = Session::new();
        s.push_exchange("hi", "hello");
        assert_eq!(s.recent(HISTORY_WINDOW).len(), 2);
    }

    #[test]
    fn test_clear_history_keeps_last_exchange() {
        let mut s = Session::new();
        s.push_exchange("hi", "hello");
        s.set_last_exchange(Exchange {
            question: "q".into(),
            answer: "a".into(),
            rows: vec![ExportRow::text("chunk")],
        });
        s.clear_history();
        assert!(s.history().is_empty());
        assert_eq!(
            s.last_exchange().map(|e| e.chunk_texts()),
            Some(vec!["chunk".to_string()])
        );
    }
}
