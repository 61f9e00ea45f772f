//! Prompt assembly: persona, bounded history window, numbered snippets.

use std::fmt::Write as _;

use super::document::RetrievalResult;
use crate::llm::types::ChatMessage;

/// Assembles the message list for a generation call.
///
/// The persona/system prompt is supplied externally and passed through
/// unmodified. Conversation history is owned elsewhere; this builder only
/// reads a trailing window of it — older exchanges are dropped, not
/// summarized.
pub struct ContextBuilder {
    max_history_messages: usize,
}

impl ContextBuilder {
    pub fn new(max_history_messages: usize) -> Self {
        Self {
            max_history_messages,
        }
    }

    /// Build the full retrieval-augmented prompt: system persona, recent
    /// history, then one user turn carrying the numbered snippets and the
    /// question.
    pub fn build(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        results: &[RetrievalResult],
        question: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.max_history_messages + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(self.recent_history(history).iter().cloned());
        messages.push(ChatMessage::user(format_user_turn(results, question)));
        messages
    }

    /// Build the non-retrieval prompt (persona + history + question only).
    /// This is the explicit fallback shape used when retrieval is
    /// unavailable.
    pub fn build_plain(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        question: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.max_history_messages + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(self.recent_history(history).iter().cloned());
        messages.push(ChatMessage::user(question));
        messages
    }

    fn recent_history<'a>(&self, history: &'a [ChatMessage]) -> &'a [ChatMessage] {
        let start = history.len().saturating_sub(self.max_history_messages);
        &history[start..]
    }
}

fn format_user_turn(results: &[RetrievalResult], question: &str) -> String {
    if results.is_empty() {
        return question.to_string();
    }

    let mut turn = String::from("Relevant background, in your own words:\n\n");
    for (i, result) in results.iter().enumerate() {
        let _ = write!(turn, "[{}]", i + 1);
        if let Some(topic) = &result.document.metadata.topic {
            let _ = write!(turn, " ({topic})");
        }
        let _ = writeln!(turn, " {}", result.document.text);
    }
    let _ = write!(turn, "\nQuestion: {question}");
    turn
}
