// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental Server-Sent-Events parser.

use std::time::Duration;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    /// Value of the `event:` field, empty if none was sent.
    pub event: String,
    /// `data:` lines joined with `\n`.
    pub data: String,
    /// Value of the last `id:` field in the frame.
    pub id: Option<String>,
}

/// Splits a byte stream into [`SseFrame`]s.
///
/// Bytes may arrive in arbitrary chunks; incomplete lines are buffered
/// until the rest arrives. A frame is dispatched at a blank line if it
/// carried an event name or data. Frames with only a name are kept because
/// the appliance stream sends sentinel events without payload.
///
/// # Examples
///
/// ```
/// use homeconnect_lib::protocol::SseParser;
///
/// let mut parser = SseParser::new();
/// assert!(parser.feed(b"event: STATUS\nda").is_empty());
///
/// let frames = parser.feed(b"ta: {\"items\":[]}\n\n");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].event, "STATUS");
/// assert_eq!(frames[0].data, "{\"items\":[]}");
/// ```
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: String,
    data: Vec<String>,
    id: Option<String>,
    retry: Option<Duration>,
}

impl SseParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of bytes and returns every frame it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Returns the reconnection delay last requested by the server.
    #[must_use]
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = value.to_string(),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            "retry" => {
                if let Ok(millis) = value.trim().parse::<u64>() {
                    self.retry = Some(Duration::from_millis(millis));
                }
            }
            other => tracing::trace!(field = other, "Ignoring unknown SSE field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.event.is_empty() && self.data.is_empty() {
            self.id = None;
            return None;
        }

        Some(SseFrame {
            event: std::mem::take(&mut self.event),
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.id.take(),
        })
    }
}
