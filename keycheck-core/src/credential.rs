//! API key loading
//!
//! The key lives in a line-oriented `KEY=VALUE` properties file next to the
//! project (by default `gradle.properties`). When no usable key is found
//! there, the caller falls back to asking for one through a [`Prompt`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{KeycheckError, KeycheckResult};
use crate::text;

/// Property holding the Gemini API key
pub const API_KEY_PROPERTY: &str = "GEMINI_API_KEY";

/// Template value shipped in the sample properties file
pub const PLACEHOLDER_KEY: &str = "YOUR_GEMINI_API_KEY_HERE";

/// Where a credential came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(PathBuf),
    Prompt,
}

/// An opaque API key.
///
/// Formatting never reveals the full token; use [`Credential::expose`] when
/// the raw value has to go on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    source: CredentialSource,
}

impl Credential {
    /// Build a credential from a raw token, trimming surrounding whitespace.
    pub fn new(token: impl Into<String>, source: CredentialSource) -> KeycheckResult<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(KeycheckError::credential("No API key provided"));
        }
        Ok(Self { token, source })
    }

    pub fn expose(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    /// First ten and last four characters, e.g. `ABCDEFGHIJ...1234`
    pub fn masked(&self) -> String {
        format!(
            "{}...{}",
            text::truncate(&self.token, 10),
            text::tail(&self.token, 4)
        )
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Interactive fallback used when the properties file has no key
pub trait Prompt {
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Reads the API key from a properties file, or from a [`Prompt`]
#[derive(Debug, Clone)]
pub struct CredentialLoader {
    path: PathBuf,
}

impl CredentialLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look the key up in the properties file.
    ///
    /// A missing file is treated like a missing key. Any other I/O failure is
    /// an error.
    pub fn from_file(&self) -> KeycheckResult<Option<Credential>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Properties file {} does not exist", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match find_api_key(&contents) {
            Some(token) => {
                debug!("Found {} in {}", API_KEY_PROPERTY, self.path.display());
                Credential::new(token, CredentialSource::File(self.path.clone())).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Ask for the key interactively. An empty answer is an error.
    pub fn from_prompt<P: Prompt + ?Sized>(&self, prompt: &mut P) -> KeycheckResult<Credential> {
        let answer = prompt.ask("Please enter your Gemini API key: ")?;
        Credential::new(answer, CredentialSource::Prompt)
    }

    /// File first, prompt second
    pub fn load<P: Prompt + ?Sized>(&self, prompt: &mut P) -> KeycheckResult<Credential> {
        match self.from_file()? {
            Some(credential) => Ok(credential),
            None => self.from_prompt(prompt),
        }
    }
}

/// First usable `GEMINI_API_KEY=` value in a properties file.
///
/// Empty values and the template placeholder are skipped so a later line can
/// still supply the key.
pub fn find_api_key(contents: &str) -> Option<&str> {
    contents
        .lines()
        .filter_map(|line| line.strip_prefix(API_KEY_PROPERTY)?.strip_prefix('='))
        .map(str::trim)
        .find(|value| !value.is_empty() && *value != PLACEHOLDER_KEY)
}
