//! Line index with LF/CRLF/CR-robust line/byte mapping.
//!
//! Goals
//! - Single pass over bytes to record line starts.
//! - 1-based external line numbers.
//! - Binary search for byte→line mapping.
//!
//! Notes
//! - An empty buffer has 0 lines.
//! - A buffer ending in a terminator does not gain an extra line.
//! - For ranges, end is exclusive (Rust slicing convention).

#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset where each line starts; always begins with 0.
    starts: Vec<usize>,
    /// Total byte length of the buffer.
    len: usize,
}

impl LineIndex {
    /// Build an index over `\n`, `\r\n` and lone `\r` terminators.
    pub fn build(bytes: &[u8]) -> Self {
        let mut starts = Vec::with_capacity(bytes.len() / 48 + 1);
        starts.push(0);
        let mut i = 0usize;

        while let Some(pos) = memchr::memchr2(b'\n', b'\r', &bytes[i..]) {
            let abs = i + pos;
            let next = if bytes[abs] == b'\r' && bytes.get(abs + 1) == Some(&b'\n') {
                abs + 2
            } else {
                abs + 1
            };
            if next < bytes.len() {
                starts.push(next);
            }
            i = next;
        }

        Self {
            starts,
            len: bytes.len(),
        }
    }

    /// Total number of logical lines.
    pub fn line_count(&self) -> usize {
        if self.len == 0 { 0 } else { self.starts.len() }
    }

    /// Start byte offsets of every line, in order.
    pub fn line_starts(&self) -> &[usize] {
        if self.len == 0 { &[] } else { &self.starts }
    }

    /// Start byte (inclusive) of a 1-based line.
    pub fn start_byte_of_line(&self, line1: usize) -> Option<usize> {
        if line1 == 0 || line1 > self.line_count() {
            return None;
        }
        Some(self.starts[line1 - 1])
    }

    /// 1-based line number covering the given byte offset.
    /// Terminator bytes belong to the line they end.
    /// Returns 0 for empty buffers.
    pub fn line_of_byte(&self, byte: usize) -> usize {
        if self.len == 0 {
            return 0;
        }
        match self.starts.binary_search(&byte) {
            Ok(pos) => pos + 1,
            Err(pos) => pos,
        }
    }
}
