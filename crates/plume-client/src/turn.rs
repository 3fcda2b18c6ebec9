//! Turn reduction: applying classified records to the in-flight message
//!
//! The reducer is synchronous and touches nothing beyond its two arguments;
//! the async adapter invokes it at each suspension point. The completion
//! arbiter lives in `awaiting_tool`: the service may run one or more tool
//! round trips before producing the user-visible answer, and each round
//! trip ends with its own completion record that must not end the turn.

use crate::record::StreamRecord;
use crate::types::Message;

/// A user-visible effect of applying one record
#[derive(Debug, Clone, PartialEq)]
pub enum TurnUpdate {
    /// A reasoning fragment was appended
    Reasoning(String),
    /// A content fragment was appended
    Content(String),
    /// The service reported the prompt size for this turn
    PromptTokens(u64),
    /// The turn is complete; the message is no longer pending
    Finished,
}

/// Reducer for one outstanding turn
#[derive(Debug, Default)]
pub struct TurnReducer {
    awaiting_tool: bool,
    finished: bool,
}

impl TurnReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply one record to the pending message.
    pub fn apply(&mut self, message: &mut Message, record: &StreamRecord) -> Option<TurnUpdate> {
        if self.finished {
            return None;
        }
        match record {
            StreamRecord::Delta { content, reasoning } => {
                let mut update = None;
                if let Some(reasoning) = reasoning {
                    // Reasoning only accumulates before content starts.
                    if message.content.is_empty() && !reasoning.is_empty() {
                        message.reasoning.push_str(reasoning);
                        update = Some(TurnUpdate::Reasoning(reasoning.clone()));
                    }
                }
                if let Some(content) = content {
                    // Empty-but-present content arrives alongside thinking
                    // chunks and must not clear the accumulating trace.
                    if !content.is_empty() {
                        if !message.reasoning.is_empty() {
                            message.reasoning.clear();
                        }
                        message.content.push_str(content);
                        update = Some(TurnUpdate::Content(content.clone()));
                    }
                }
                update
            }
            StreamRecord::Usage { prompt_tokens } => {
                Some(TurnUpdate::PromptTokens(*prompt_tokens))
            }
            StreamRecord::ToolInvocation => {
                tracing::debug!("assistant requested a tool round trip");
                self.awaiting_tool = true;
                None
            }
            StreamRecord::Completion => {
                if self.awaiting_tool {
                    // This completion only closed the intermediate tool
                    // step; the user-visible answer is still coming.
                    tracing::debug!("suppressing completion after tool invocation");
                    self.awaiting_tool = false;
                    None
                } else {
                    self.finished = true;
                    message.pending = false;
                    Some(TurnUpdate::Finished)
                }
            }
            StreamRecord::HistoryEcho(_) | StreamRecord::Unrecognized => None,
        }
    }
}
