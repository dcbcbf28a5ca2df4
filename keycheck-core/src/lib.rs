//! Core types for the Gemini key-check diagnostics
//!
//! This crate defines what the diagnostics share: the error type, API key
//! loading, probe reports and runtime configuration.

pub mod config;
pub mod credential;
pub mod error;
pub mod report;
pub mod text;

pub use config::KeycheckConfig;
pub use credential::{Credential, CredentialLoader, CredentialSource, Prompt};
pub use error::{KeycheckError, KeycheckResult};
pub use report::{ProbeReport, ProbeResult};
