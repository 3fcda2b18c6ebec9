//! Classification of stream lines into logical records
//!
//! The service has emitted several shapes for the same concept over time,
//! so every field is probed defensively. A single line may carry more than
//! one signal; `classify_line` emits them as an ordered list: usage first,
//! then the output delta, then a tool invocation, then the completion flag.
//! That ordering is load-bearing for the turn reducer.

use serde_json::Value;

use crate::types::ChatEntry;

/// One logical signal decoded from a stream line
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRecord {
    /// The service's confirmation of the context it actually used
    HistoryEcho(Vec<ChatEntry>),
    /// Context-size metric for the turn
    Usage { prompt_tokens: u64 },
    /// Incremental fragment of assistant output
    Delta {
        content: Option<String>,
        reasoning: Option<String>,
    },
    /// The assistant requested an intermediate action before continuing
    ToolInvocation,
    /// The current generation step ended
    Completion,
    /// Valid JSON matching no known shape, or not JSON at all
    Unrecognized,
}

type Extractor = fn(&Value) -> Option<&str>;

/// Historically observed locations of the content channel, probed in order.
const CONTENT_EXTRACTORS: &[Extractor] = &[
    |v| v.get("message")?.get("content")?.as_str(),
    |v| v.get("delta")?.get("content")?.as_str(),
    |v| v.get("response")?.as_str(),
    |v| v.get("content")?.as_str(),
];

/// Same for the reasoning channel.
const REASONING_EXTRACTORS: &[Extractor] = &[
    |v| v.get("message")?.get("thinking")?.as_str(),
    |v| v.get("delta")?.get("thinking")?.as_str(),
    |v| v.get("thinking")?.as_str(),
];

fn extract(value: &Value, extractors: &[Extractor]) -> Option<String> {
    extractors.iter().find_map(|probe| probe(value)).map(str::to_owned)
}

/// Classify one non-blank line. Never fails: anything unparseable or
/// unrecognized becomes [`StreamRecord::Unrecognized`] and is dropped
/// downstream, since the stream legitimately carries framework noise.
pub fn classify_line(line: &str) -> Vec<StreamRecord> {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        tracing::trace!(line, "discarding non-JSON line");
        return vec![StreamRecord::Unrecognized];
    };

    // A history echo is exclusive: first match wins.
    if let Some(entries) = history_echo(&value) {
        return vec![StreamRecord::HistoryEcho(entries)];
    }

    let mut records = Vec::new();

    if let Some(prompt_tokens) = value.get("prompt_eval_count").and_then(Value::as_u64) {
        records.push(StreamRecord::Usage { prompt_tokens });
    }

    let content = extract(&value, CONTENT_EXTRACTORS);
    let reasoning = extract(&value, REASONING_EXTRACTORS);
    if content.is_some() || reasoning.is_some() {
        records.push(StreamRecord::Delta { content, reasoning });
    }

    if has_tool_calls(&value) {
        records.push(StreamRecord::ToolInvocation);
    }

    if value.get("done").and_then(Value::as_bool) == Some(true) {
        records.push(StreamRecord::Completion);
    }

    if records.is_empty() {
        tracing::trace!(line, "discarding unrecognized record");
        records.push(StreamRecord::Unrecognized);
    }
    records
}

/// A `messages` array counts as a history echo when at least one entry
/// parses as `{role, content}`. Entries that do not parse are skipped
/// rather than failing the whole echo.
fn history_echo(value: &Value) -> Option<Vec<ChatEntry>> {
    let list = value.get("messages")?.as_array()?;
    let entries: Vec<ChatEntry> = list
        .iter()
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect();
    if entries.is_empty() { None } else { Some(entries) }
}

fn has_tool_calls(value: &Value) -> bool {
    [
        value.get("message").and_then(|m| m.get("tool_calls")),
        value.get("tool_calls"),
    ]
    .into_iter()
    .flatten()
    .any(|calls| calls.as_array().is_some_and(|list| !list.is_empty()))
}
