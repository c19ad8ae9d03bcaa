//! Output processing for captured shell output.
//!
//! - ANSI escape code stripping
//! - Incremental splitting of a byte stream into clean lines
//!
//! # Example
//!
//! ```
//! use shell_bridge::output::{LineDecoder, OutputSanitizer};
//!
//! let clean = OutputSanitizer::strip_ansi(b"\x1b[31mRed text\x1b[0m");
//! assert_eq!(clean, "Red text");
//!
//! let mut decoder = LineDecoder::new();
//! assert_eq!(decoder.feed(b"first\r\nsec"), vec!["first"]);
//! assert_eq!(decoder.finish().as_deref(), Some("sec"));
//! ```

mod lines;
mod sanitizer;

pub use lines::LineDecoder;
pub use sanitizer::OutputSanitizer;
