//! JSON Frame Extraction
//!
//! The raw-socket deployment delivers a continuous byte stream of JSON objects
//! with no delimiter between them. [`StreamBuffer`] accumulates received bytes
//! and [`StreamBuffer::frames`] yields every complete, brace-balanced object
//! currently buffered.
//!
//! Braces are counted without regard to string context: the wire format never
//! carries unescaped braces inside string values. Brace bytes never occur inside
//! a multi-byte UTF-8 sequence, so scanning bytes is safe for any UTF-8 input.
//!
//! # Example
//!
//! ```
//! use obualert_core::framing::StreamBuffer;
//!
//! let mut buffer = StreamBuffer::new();
//! buffer.extend(br#"{"a":1}{"b":"#);
//! let frames: Vec<Vec<u8>> = buffer.frames().collect();
//! assert_eq!(frames, vec![br#"{"a":1}"#.to_vec()]);
//! assert_eq!(buffer.pending(), br#"{"b":"#);
//! ```

/// Default cap on a single pending (not yet balanced) frame
pub const DEFAULT_MAX_PENDING: usize = 1024 * 1024;

/// Accumulator of not-yet-framed bytes
#[derive(Debug, Clone)]
pub struct StreamBuffer {
    buf: Vec<u8>,
    max_pending: usize,
    discarded: u64,
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_PENDING)
    }

    /// Create a buffer that gives up on a partial frame longer than `max_pending`
    pub fn with_limit(max_pending: usize) -> Self {
        StreamBuffer {
            buf: Vec::with_capacity(4096),
            max_pending: max_pending.max(2),
            discarded: 0,
        }
    }

    /// Append freshly received bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes retained for the next extraction pass
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Total number of bytes dropped as noise or malformed prefixes
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Lazily extract the complete frames currently buffered, in arrival order
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { buffer: self }
    }

    /// Remove and return the next complete frame, if any
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let Some(start) = self.buf.iter().position(|&b| b == b'{') else {
                // No opening brace: nothing here can become part of an object
                self.discard(self.buf.len());
                return None;
            };
            if start > 0 {
                self.discard(start);
            }

            match balanced_end(&self.buf) {
                Some(end) => {
                    let frame: Vec<u8> = self.buf.drain(..=end).collect();
                    return Some(frame);
                }
                None if self.buf.len() > self.max_pending => {
                    // Give up on this opening brace and resynchronise on the next one
                    let next = self.buf[1..]
                        .iter()
                        .position(|&b| b == b'{')
                        .map(|p| p + 1)
                        .unwrap_or(self.buf.len());
                    self.discard(next);
                }
                None => return None,
            }
        }
    }

    fn discard(&mut self, count: usize) {
        self.buf.drain(..count);
        self.discarded += count as u64;
    }
}

/// Index of the brace closing the object that opens at `buf[0]`
fn balanced_end(buf: &[u8]) -> Option<usize> {
    let mut depth: usize = 0;
    for (i, &b) in buf.iter().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Iterator over complete frames; finite per call, restartable after more bytes arrive
pub struct Frames<'a> {
    buffer: &'a mut StreamBuffer,
}

impl Iterator for Frames<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(buffer: &mut StreamBuffer, data: &[u8]) -> Vec<String> {
        buffer.extend(data);
        buffer
            .frames()
            .map(|f| String::from_utf8(f).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let mut buffer = StreamBuffer::new();
        assert!(extract(&mut buffer, b"").is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_unbalanced_tail_retained() {
        let mut buffer = StreamBuffer::new();
        let frames = extract(&mut buffer, br#"{"a":1}{"b":"#);
        assert_eq!(frames, vec![r#"{"a":1}"#]);
        assert_eq!(buffer.pending(), br#"{"b":"#);

        let frames = extract(&mut buffer, b"2}");
        assert_eq!(frames, vec![r#"{"b":2}"#]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_dangling_brace_retained() {
        let mut buffer = StreamBuffer::new();
        assert!(extract(&mut buffer, b"{").is_empty());
        assert_eq!(buffer.pending(), b"{");
        assert!(extract(&mut buffer, br#"{"x":{"#).is_empty());
        assert_eq!(buffer.pending(), br#"{{"x":{"#);
    }

    #[test]
    fn test_back_to_back_objects() {
        let mut buffer = StreamBuffer::new();
        let frames = extract(&mut buffer, br#"{"a":1}{"b":{"c":2}}{"d":3}"#);
        assert_eq!(frames, vec![r#"{"a":1}"#, r#"{"b":{"c":2}}"#, r#"{"d":3}"#]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_noise_without_brace_discarded() {
        let mut buffer = StreamBuffer::new();
        assert!(extract(&mut buffer, b"garbage\r\n").is_empty());
        assert!(buffer.is_empty());
        assert_eq!(buffer.discarded_bytes(), 9);
    }

    #[test]
    fn test_noise_before_object_discarded() {
        let mut buffer = StreamBuffer::new();
        let frames = extract(&mut buffer, b"xx}\n{\"a\":1}\n");
        assert_eq!(frames, vec![r#"{"a":1}"#]);
        // the trailing newline has no opening brace and is dropped
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_any_split_yields_same_frames() {
        let stream = br#"noise{"id":"p1","pos":{"lat":1,"long":2}} {"id":"p2"}{"v":{"w":{}}}"#;
        let expected = vec![
            r#"{"id":"p1","pos":{"lat":1,"long":2}}"#.to_string(),
            r#"{"id":"p2"}"#.to_string(),
            r#"{"v":{"w":{}}}"#.to_string(),
        ];

        for chunk_size in 1..stream.len() {
            let mut buffer = StreamBuffer::new();
            let mut frames = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                frames.extend(extract(&mut buffer, chunk));
            }
            assert_eq!(frames, expected, "chunk size {}", chunk_size);
            for frame in &frames {
                assert!(serde_json::from_str::<serde_json::Value>(frame).is_ok());
            }
        }
    }

    #[test]
    fn test_oversized_partial_frame_resynchronises() {
        let mut buffer = StreamBuffer::with_limit(16);
        let frames = extract(&mut buffer, br#"{"broken": "never closed"#);
        assert!(frames.is_empty());
        assert!(buffer.is_empty());

        let frames = extract(&mut buffer, br#"{"ok":1}"#);
        assert_eq!(frames, vec![r#"{"ok":1}"#]);
    }

    #[test]
    fn test_oversized_partial_keeps_following_object() {
        let mut buffer = StreamBuffer::with_limit(20);
        let frames = extract(&mut buffer, br#"{"broken": 1, {"ok":1}"#);
        assert_eq!(frames, vec![r#"{"ok":1}"#]);
    }
}
