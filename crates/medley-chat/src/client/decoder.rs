//! Incremental `text/event-stream` parser.

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Feed arbitrary byte chunks; complete frames come out as soon as their
/// terminating blank line arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            if self.data.is_empty() {
                self.event = None;
                return None;
            }
            return Some(SseFrame {
                event: self.event.take(),
                data: std::mem::take(&mut self.data).join("\n"),
            });
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":").is_empty());
        let frames = decoder.push(b"\"ping\"}\n\n");
        assert_eq!(frames, vec![SseFrame { event: None, data: r#"{"type":"ping"}"#.into() }]);
    }

    #[test]
    fn test_multiline_data_comments_and_crlf() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\r\nevent: note\r\ndata: a\r\ndata: b\r\n\r\ndata: c\n\n");
        assert_eq!(
            frames,
            vec![
                SseFrame { event: Some("note".into()), data: "a\nb".into() },
                SseFrame { event: None, data: "c".into() },
            ]
        );
    }

    #[test]
    fn test_blank_line_without_data_dispatches_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"\n\nevent: x\n\n").is_empty());
    }
}
