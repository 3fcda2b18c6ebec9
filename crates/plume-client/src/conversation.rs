//! Conversation state and server-confirmed history
//!
//! The UI-facing message list and the server-confirmed history evolve
//! separately: the list is append-only (the one pending message is mutated
//! in place, never reordered), while the history is the minimal context the
//! service has acknowledged and is what seeds the next request.

use futures::StreamExt;
use tokio_stream::Stream;

use crate::record::StreamRecord;
use crate::turn::{TurnReducer, TurnUpdate};
use crate::types::{ChatEntry, ChatRequest, Message, Role};

/// Ordered message list plus the server-confirmed subset used to seed the
/// next turn. At most one turn is in flight at a time; a second
/// `start_turn` is rejected, not queued.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    server_history: Vec<ChatEntry>,
    turn: Option<TurnReducer>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn server_history(&self) -> &[ChatEntry] {
        &self.server_history
    }

    /// Whether a turn is currently in flight
    pub fn turn_pending(&self) -> bool {
        self.turn.is_some()
    }

    /// Begin a new turn.
    ///
    /// Returns the outbound request, or `None` when a turn is already in
    /// flight or the text is blank. Both are UI guard conditions, not
    /// errors. The request is built from server-confirmed history plus the
    /// new user entry, never from the full local message list.
    pub fn start_turn(&mut self, text: &str) -> Option<ChatRequest> {
        if self.turn.is_some() {
            tracing::debug!("ignoring start_turn while a turn is in flight");
            return None;
        }
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.messages.push(Message::user(text));
        self.messages.push(Message::pending_assistant());
        self.server_history.push(ChatEntry::user(text));
        self.turn = Some(TurnReducer::new());

        Some(ChatRequest {
            messages: self.server_history.clone(),
        })
    }

    /// Apply one classified record to the in-flight turn.
    ///
    /// No-op when no turn is pending. A history echo replaces the
    /// server-confirmed history wholesale; everything else goes through the
    /// reducer onto the pending assistant message.
    pub fn apply(&mut self, record: StreamRecord) -> Option<TurnUpdate> {
        let reducer = self.turn.as_mut()?;

        if let StreamRecord::HistoryEcho(entries) = record {
            tracing::debug!(entries = entries.len(), "adopting server history echo");
            self.server_history = entries;
            return None;
        }

        let message = self.messages.last_mut()?;
        let update = reducer.apply(message, &record);
        if matches!(update, Some(TurnUpdate::Finished)) {
            self.commit_turn();
        }
        update
    }

    /// Abort the in-flight turn, keeping whatever partial output arrived.
    pub fn fail_turn(&mut self, description: impl Into<String>) {
        if self.turn.take().is_none() {
            return;
        }
        let description = description.into();
        tracing::warn!(error = %description, "turn failed");
        if let Some(message) = self.messages.last_mut() {
            message.pending = false;
            message.error = Some(description);
        }
    }

    /// Drive one turn to resolution, forwarding updates to the UI callback.
    ///
    /// Stops consuming as soon as the turn finishes; the stream is simply
    /// dropped, since the server may still be closing its side gracefully.
    /// A transport error or a premature end of stream fails the turn while
    /// preserving partial output.
    pub async fn consume<S>(&mut self, records: S, mut on_update: impl FnMut(&TurnUpdate))
    where
        S: Stream<Item = crate::Result<StreamRecord>> + Unpin,
    {
        let mut records = records;
        while let Some(item) = records.next().await {
            match item {
                Ok(record) => {
                    if let Some(update) = self.apply(record) {
                        let finished = matches!(update, TurnUpdate::Finished);
                        on_update(&update);
                        if finished {
                            return;
                        }
                    }
                }
                Err(error) => {
                    self.fail_turn(error.to_string());
                    return;
                }
            }
        }
        if self.turn_pending() {
            self.fail_turn("response ended before completion");
        }
    }

    fn commit_turn(&mut self) {
        self.turn = None;
        let Some(message) = self.messages.last() else {
            return;
        };
        // Some service configurations already fold the final answer into
        // their history echo; only append when the echo did not.
        let echo_has_answer = self
            .server_history
            .last()
            .is_some_and(|entry| entry.role == Role::Assistant);
        if !echo_has_answer {
            self.server_history
                .push(ChatEntry::assistant(message.content.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify_line;
    use crate::error::Error;

    fn apply_lines(conversation: &mut Conversation, lines: &[&str]) -> Vec<TurnUpdate> {
        let mut updates = Vec::new();
        for line in lines {
            for record in classify_line(line) {
                updates.extend(conversation.apply(record));
            }
        }
        updates
    }

    #[test]
    fn test_start_turn_builds_request_from_server_history() {
        let mut conversation = Conversation::new();
        let request = conversation.start_turn("  hello  ").expect("turn starts");

        assert_eq!(request.messages, vec![ChatEntry::user("hello")]);
        assert_eq!(conversation.messages().len(), 2);
        assert!(conversation.messages()[1].pending);
        assert!(conversation.turn_pending());
    }

    #[test]
    fn test_blank_text_rejected() {
        let mut conversation = Conversation::new();
        assert!(conversation.start_turn("   \n").is_none());
        assert!(conversation.messages().is_empty());
    }

    #[test]
    fn test_single_turn_guard() {
        let mut conversation = Conversation::new();
        assert!(conversation.start_turn("first").is_some());
        assert!(conversation.start_turn("second").is_none());

        let pending: Vec<_> = conversation.messages().iter().filter(|m| m.pending).collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(conversation.messages().len(), 2);
    }

    #[test]
    fn test_turn_without_echo_appends_assistant_locally() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");
        apply_lines(&mut conversation, &[r#"{"content":"answer"}"#, r#"{"done":true}"#]);

        assert!(!conversation.turn_pending());
        assert_eq!(
            conversation.server_history(),
            &[ChatEntry::user("question"), ChatEntry::assistant("answer")]
        );
    }

    #[test]
    fn test_history_echo_precedence() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");
        apply_lines(
            &mut conversation,
            &[
                r#"{"content":"answer"}"#,
                r#"{"messages":[{"role":"user","content":"question"},{"role":"assistant","content":"answer"}]}"#,
                r#"{"done":true}"#,
            ],
        );

        // The echo already holds the answer; no local duplicate appended.
        assert_eq!(
            conversation.server_history(),
            &[ChatEntry::user("question"), ChatEntry::assistant("answer")]
        );
    }

    #[test]
    fn test_echo_without_final_assistant_gets_local_append() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");
        apply_lines(
            &mut conversation,
            &[
                r#"{"messages":[{"role":"user","content":"question"}]}"#,
                r#"{"content":"answer"}"#,
                r#"{"done":true}"#,
            ],
        );

        assert_eq!(
            conversation.server_history(),
            &[ChatEntry::user("question"), ChatEntry::assistant("answer")]
        );
    }

    #[test]
    fn test_tool_call_suppression() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");
        let updates = apply_lines(
            &mut conversation,
            &[
                r#"{"message":{"tool_calls":[{"function":{"name":"subquery"}}]}}"#,
                r#"{"done":true}"#,
                r#"{"content":"A"}"#,
                r#"{"done":true}"#,
            ],
        );

        let finishes = updates.iter().filter(|u| **u == TurnUpdate::Finished).count();
        assert_eq!(finishes, 1);
        assert_eq!(conversation.messages().last().unwrap().content, "A");
        assert!(!conversation.turn_pending());
    }

    #[test]
    fn test_reasoning_clears_on_content() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");
        apply_lines(
            &mut conversation,
            &[
                r#"{"thinking":"t1"}"#,
                r#"{"thinking":"t2"}"#,
                r#"{"content":"c1"}"#,
                r#"{"done":true}"#,
            ],
        );

        let message = conversation.messages().last().unwrap();
        assert_eq!(message.reasoning, "");
        assert_eq!(message.content, "c1");
    }

    #[test]
    fn test_malformed_line_tolerance() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");
        apply_lines(
            &mut conversation,
            &[
                "not json",
                r#"{"unrelated": 1}"#,
                r#"{"content":"x"}"#,
                r#"{"done":true}"#,
            ],
        );

        let message = conversation.messages().last().unwrap();
        assert_eq!(message.content, "x");
        assert!(message.error.is_none());
    }

    #[test]
    fn test_fail_turn_preserves_partial_output() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");
        conversation.apply(StreamRecord::Delta {
            content: Some("partial".to_string()),
            reasoning: None,
        });
        conversation.fail_turn("request to http://x/api/chat failed: connection reset");

        let message = conversation.messages().last().unwrap();
        assert_eq!(message.content, "partial");
        assert!(!message.pending);
        assert!(message.error.as_deref().unwrap().contains("/api/chat"));
        assert!(!conversation.turn_pending());

        // the conversation stays usable
        assert!(conversation.start_turn("again").is_some());
    }

    #[tokio::test]
    async fn test_consume_stops_at_finish() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");

        let records = futures::stream::iter(vec![
            Ok(StreamRecord::Delta {
                content: Some("A".to_string()),
                reasoning: None,
            }),
            Ok(StreamRecord::Completion),
            // must never be reached
            Ok(StreamRecord::Delta {
                content: Some("B".to_string()),
                reasoning: None,
            }),
        ]);

        let mut seen = Vec::new();
        conversation
            .consume(Box::pin(records), |update| seen.push(update.clone()))
            .await;

        assert_eq!(
            seen,
            vec![TurnUpdate::Content("A".to_string()), TurnUpdate::Finished]
        );
        assert_eq!(conversation.messages().last().unwrap().content, "A");
    }

    #[tokio::test]
    async fn test_consume_transport_error_fails_turn() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");

        let records = futures::stream::iter(vec![
            Ok(StreamRecord::Delta {
                content: Some("partial".to_string()),
                reasoning: None,
            }),
            Err(Error::Status {
                url: "http://localhost:8111/api/chat".to_string(),
                status: reqwest::StatusCode::BAD_GATEWAY,
            }),
        ]);

        conversation.consume(Box::pin(records), |_| {}).await;

        let message = conversation.messages().last().unwrap();
        assert_eq!(message.content, "partial");
        assert!(!message.pending);
        assert!(message.error.as_deref().unwrap().contains("/api/chat"));
    }

    #[tokio::test]
    async fn test_consume_premature_end_fails_turn() {
        let mut conversation = Conversation::new();
        conversation.start_turn("question");

        let records = futures::stream::iter(vec![Ok(StreamRecord::Delta {
            content: Some("half".to_string()),
            reasoning: None,
        })]);

        conversation.consume(Box::pin(records), |_| {}).await;

        let message = conversation.messages().last().unwrap();
        assert_eq!(message.content, "half");
        assert!(message.error.is_some());
    }
}
