//! Line buffering for Server-Sent Events byte streams.
//!
//! HTTP chunks can end mid-line or mid-codepoint; this buffer re-frames
//! them into complete lines before the SSE payloads are parsed.

/// Accumulates bytes and yields complete lines.
pub(crate) struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feeds a chunk of bytes, returning every line completed by it.
    ///
    /// The trailing partial line stays buffered until a later chunk closes
    /// it. Splitting on `\n` is safe mid-codepoint because the byte never
    /// occurs inside a multi-byte UTF-8 sequence.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            lines.push(text.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_line_held_until_complete() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: {\"x\":").is_empty());
        let lines = buf.push(b"1}\n");
        assert_eq!(lines, vec!["data: {\"x\":1}".to_string()]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.push(b"data: a\n\ndata: b\n");
        assert_eq!(lines, vec!["data: a", "", "data: b"]);
    }

    #[test]
    fn test_crlf_stripped() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.push(b"data: a\r\n");
        assert_eq!(lines, vec!["data: a"]);
    }

    #[test]
    fn test_multibyte_codepoint_split_across_chunks() {
        let mut buf = SseLineBuffer::new();
        let text = "data: 学習\n".as_bytes();
        let (head, tail) = text.split_at(8); // splits inside a multi-byte char
        assert!(buf.push(head).is_empty());
        let lines = buf.push(tail);
        assert_eq!(lines, vec!["data: 学習"]);
    }
}
