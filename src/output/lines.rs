//! Incremental line splitting for shell output.

use super::OutputSanitizer;

/// Longest unterminated line kept before it is emitted anyway.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a byte stream into clean text lines.
///
/// Chunks may end mid-line (or mid UTF-8 sequence); the tail is kept until
/// the next newline arrives or [`LineDecoder::finish`] is called. Text
/// overwritten by a carriage return is discarded once the tail reaches
/// [`MAX_LINE_BYTES`], and a tail still that long is emitted as a line.
#[derive(Debug, Default)]
pub struct LineDecoder {
    partial: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                lines.push(OutputSanitizer::clean_line(&self.partial));
                self.partial.clear();
            } else {
                self.partial.push(byte);
                if self.partial.len() >= MAX_LINE_BYTES {
                    self.compact();
                    if self.partial.len() >= MAX_LINE_BYTES {
                        lines.push(OutputSanitizer::clean_line(&self.partial));
                        self.partial.clear();
                    }
                }
            }
        }
        lines
    }

    /// Drop everything up to the last carriage return that has text after it.
    fn compact(&mut self) {
        let body = self.partial.strip_suffix(b"\r").unwrap_or(&self.partial);
        if let Some(pos) = body.iter().rposition(|&b| b == b'\r') {
            self.partial.drain(..=pos);
        }
    }

    /// Whether an unterminated line is buffered.
    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Flush the unterminated tail, if it has any visible text.
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let line = OutputSanitizer::clean_line(&self.partial);
        self.partial.clear();
        (!line.is_empty()).then_some(line)
    }
}
