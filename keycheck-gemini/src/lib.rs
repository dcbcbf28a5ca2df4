//! Gemini integration for the key-check diagnostics
//!
//! This crate provides a REST client for single `generateContent` calls and
//! a tester for the bidirectional live endpoint. Both authenticate with the
//! API key as a `key` query parameter.

pub mod client;
pub mod live;
pub mod types;

pub use client::{CallOutcome, GeminiClient};
pub use live::{live_url, LiveSession, LiveSetup, SessionEvent, SessionState, Step};
