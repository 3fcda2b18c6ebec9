//! plume-client: streaming chat decoder and conversation state
//!
//! The inference service answers a chat request with a continuous NDJSON
//! body interleaving three channels: a reasoning trace, the final content,
//! and control records (history echoes, token counts, completion flags).
//! This crate turns that stream into a single append-only conversation
//! view: raw bytes are reassembled into lines, lines are classified into
//! records, and records are reduced onto the one assistant message that may
//! be in flight at a time.

pub mod client;
pub mod conversation;
pub mod error;
pub mod lines;
pub mod record;
pub mod turn;
pub mod types;

pub use client::{ChatClient, RecordStream};
pub use conversation::Conversation;
pub use error::{Error, Result};
pub use record::{StreamRecord, classify_line};
pub use turn::{TurnReducer, TurnUpdate};
pub use types::{ChatEntry, ChatRequest, Message, Role};
