//! One bounded-history LLM conversation (spec §4.5).

use tracing::debug;

use super::Message;
use crate::activity::ActivityControl;
use crate::error::CoreError;
use crate::vendor::LlmChatClient;

/// Wraps a vendor [`LlmChatClient`] with the bounded message history the source system
/// keeps per-conversation, and coalesces streamed tokens into sentences so the Activity
/// Runtime can start TTS on the first sentence without waiting for the whole reply.
pub struct LlmSession {
    client: Box<dyn LlmChatClient>,
    history: Vec<Message>,
    max_turns: usize,
    temperature: f32,
}

impl LlmSession {
    pub fn new(client: Box<dyn LlmChatClient>, max_turns: usize, temperature: f32) -> Self {
        Self { client, history: Vec::new(), max_turns, temperature }
    }

    /// Seed the history with context the user never spoke (e.g. a gratitude note or
    /// quote handed off from another activity), so the next reply can reference it.
    pub fn seed_context(&mut self, note: &str) {
        self.history.push(Message::user(&format!("[context] {note}")));
    }

    /// Send a user message, streaming the assistant's reply to `on_sentence` one
    /// sentence at a time. Returns the full reply text once the stream ends.
    pub fn send(&mut self, user_message: &str, mut on_sentence: impl FnMut(String) -> ActivityControl) -> Result<String, CoreError> {
        debug!(message = %user_message, "dialog session: sending user turn");
        self.history.push(Message::user(user_message));

        let mut buffer = String::new();
        let mut full = String::new();
        let history_snapshot = self.history.clone();

        self.client.stream_chat(&history_snapshot, self.temperature, &mut |chunk: String| {
            full.push_str(&chunk);
            buffer.push_str(&chunk);

            while let Some(idx) = sentence_boundary(&buffer) {
                let sentence = buffer[..=idx].trim().to_string();
                buffer.drain(..=idx);
                if sentence.is_empty() {
                    continue;
                }
                if on_sentence(sentence) == ActivityControl::Cancelled {
                    return ActivityControl::Cancelled;
                }
            }
            ActivityControl::Continue
        })?;

        let trailing = buffer.trim();
        if !trailing.is_empty() {
            on_sentence(trailing.to_string());
        }

        self.history.push(Message::assistant(&full));
        self.trim_history();
        Ok(full)
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.max_turns * 2 {
            self.history.remove(0);
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }
}

fn sentence_boundary(s: &str) -> Option<usize> {
    s.char_indices().find(|&(_, c)| matches!(c, '.' | '!' | '?' | '\n')).map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoClient;
    impl LlmChatClient for EchoClient {
        fn stream_chat(&mut self, messages: &[Message], _temperature: f32, on_chunk: &mut dyn FnMut(String) -> ActivityControl) -> Result<(), CoreError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            on_chunk(format!("echo: {last}. done!"));
            Ok(())
        }
    }

    #[test]
    fn coalesces_into_sentences() {
        let mut session = LlmSession::new(Box::new(EchoClient), 10, 0.7);
        let mut sentences = Vec::new();
        let reply = session.send("hi", |s| {
            sentences.push(s);
            ActivityControl::Continue
        }).unwrap();

        assert_eq!(reply, "echo: hi. done!");
        assert_eq!(sentences, vec!["echo: hi.".to_string(), "done!".to_string()]);
    }

    #[test]
    fn trims_history_to_max_turns() {
        let mut session = LlmSession::new(Box::new(EchoClient), 1, 0.7);
        session.send("a", |_| ActivityControl::Continue).unwrap();
        session.send("b", |_| ActivityControl::Continue).unwrap();
        assert!(session.history().len() <= 2);
    }
}
