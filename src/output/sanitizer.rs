//! Output sanitization for stripping ANSI escape codes.

use vte::{Params, Parser, Perform};

/// Output sanitizer using the VTE parser.
pub struct OutputSanitizer;

impl OutputSanitizer {
    /// Strip ANSI escape codes from raw bytes.
    ///
    /// Returns text with all control sequences removed. Newlines, carriage
    /// returns and tabs survive; other C0 controls are dropped.
    pub fn strip_ansi(input: &[u8]) -> String {
        let mut extractor = PlainTextExtractor::default();
        let mut parser = Parser::new();

        parser.advance(&mut extractor, input);

        extractor.into_string()
    }

    /// Strip ANSI codes from a string.
    pub fn strip_ansi_str(input: &str) -> String {
        Self::strip_ansi(input.as_bytes())
    }

    /// Turn the raw bytes of one terminal line into display text.
    ///
    /// Escape codes are stripped and carriage-return overwrites are
    /// resolved the way a terminal would show them: only the text after
    /// the last `\r` remains.
    pub fn clean_line(raw: &[u8]) -> String {
        let text = Self::strip_ansi(raw);
        let text = text.trim_end_matches('\r');
        match text.rfind('\r') {
            Some(pos) => text[pos + 1..].to_string(),
            None => text.to_string(),
        }
    }
}

/// VTE performer that keeps printable text only.
#[derive(Default)]
struct PlainTextExtractor {
    output: String,
}

impl PlainTextExtractor {
    fn into_string(self) -> String {
        self.output
    }
}

impl Perform for PlainTextExtractor {
    fn print(&mut self, c: char) {
        self.output.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.output.push(byte as char);
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    // Window titles and shell-integration OSCs carry no output text.
    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
