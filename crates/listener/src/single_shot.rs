//! Event source over a fixed input: a file, stdin or a string.

use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use pipeline::{EventEnvelope, EventSource};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::ListenerError;

/// Yields the envelopes of one input document in order, then ends.
#[derive(Debug, Default)]
pub struct SingleShotEventSource {
    events: VecDeque<EventEnvelope>,
}

impl SingleShotEventSource {
    /// Parses a single envelope object or an array of envelope objects.
    ///
    /// The whole document is rejected if any element is malformed, so a
    /// partially valid replay never runs.
    pub fn from_json(raw: &str) -> Result<Self, ListenerError> {
        let document: Value =
            serde_json::from_str(raw).map_err(|e| ListenerError::Malformed(e.to_string()))?;

        let events = match document {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    serde_json::from_value::<EventEnvelope>(item)
                        .map_err(|e| ListenerError::Malformed(format!("element {index}: {e}")))
                })
                .collect::<Result<VecDeque<_>, _>>()?,
            Value::Object(_) => {
                let envelope = serde_json::from_value::<EventEnvelope>(document)
                    .map_err(|e| ListenerError::Malformed(e.to_string()))?;
                VecDeque::from([envelope])
            }
            _ => {
                return Err(ListenerError::Malformed(
                    "expected an event object or an array of event objects".to_string(),
                ))
            }
        };

        debug!(events = events.len(), "Loaded single-shot input");
        Ok(Self { events })
    }

    pub async fn from_path(path: &Path) -> Result<Self, ListenerError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ListenerError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&raw)
    }

    pub async fn from_stdin() -> Result<Self, ListenerError> {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .map_err(ListenerError::Stdin)?;
        Self::from_json(&raw)
    }

    /// Events not yet yielded.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait]
impl EventSource for SingleShotEventSource {
    async fn next_event(&mut self) -> Option<EventEnvelope> {
        self.events.pop_front()
    }
}
