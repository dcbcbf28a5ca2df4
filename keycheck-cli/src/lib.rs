//! Gemini key-check diagnostics
//!
//! Library half of the `gemini-models`, `gemini-simple` and `gemini-live`
//! binaries. Every diagnostic writes its report to any [`std::io::Write`], so
//! the binaries print to stdout and the tests capture into a buffer.

pub mod bootstrap;
pub mod diagnostics;
pub mod logging;
pub mod output;
pub mod prompt;
