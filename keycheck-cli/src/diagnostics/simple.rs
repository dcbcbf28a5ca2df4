//! Single-call checker
//!
//! One `generateContent` call to a fixed model, with remediation text for the
//! status codes a bad or throttled key produces.

use std::io::{self, Write};

use keycheck_core::{text, KeycheckError};
use keycheck_gemini::{CallOutcome, GeminiClient};

use crate::output;

pub const MODEL: &str = "gemini-pro";
pub const PROMPT: &str = "Say 'API is working' if you receive this.";

const RULE_WIDTH: usize = 60;
const ERROR_BODY_CHARS: usize = 500;

pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", output::rule(RULE_WIDTH))?;
    writeln!(out, "{}", output::heading("Gemini API Simple Test"))?;
    writeln!(out, "{}", output::rule(RULE_WIDTH))?;
    writeln!(out)
}

/// Run the check and report it. Returns whether the key works.
pub async fn check<W: Write>(client: &GeminiClient, out: &mut W) -> io::Result<bool> {
    writeln!(out, "Testing API key: {}", client.credential().masked())?;
    writeln!(out)?;
    writeln!(out, "{}", output::progress("🔄 Sending test request to Gemini API..."))?;
    out.flush()?;

    let outcome = match client.generate_content(MODEL, PROMPT).await {
        Ok(outcome) => outcome,
        Err(KeycheckError::Network(e)) => {
            writeln!(out, "{}", output::failure(format!("❌ Network Error: {}", e)))?;
            writeln!(out)?;
            writeln!(out, "Check your internet connection.")?;
            return Ok(false);
        }
        Err(e) => {
            writeln!(out, "{}", output::failure(format!("❌ {}", e)))?;
            return Ok(false);
        }
    };

    writeln!(out, "Status Code: {}", outcome.status())?;

    match outcome {
        CallOutcome::Success { text } => {
            writeln!(out, "{}", output::success(format!("✅ SUCCESS! API Response: {}", text)))?;
            writeln!(out)?;
            writeln!(out, "{}", output::success("✅ Your Gemini API key is working correctly!"))?;
            writeln!(out, "{}", output::success("✅ The app should be able to connect to Gemini."))?;
            return Ok(true);
        }
        CallOutcome::NoCandidates => {
            writeln!(out, "{}", output::failure("❌ Response contained no candidates"))?;
            writeln!(out, "The request was accepted but nothing was generated.")?;
        }
        CallOutcome::Forbidden { .. } => {
            writeln!(out, "{}", output::failure("❌ 403 Forbidden Error"))?;
            writeln!(out)?;
            writeln!(out, "Possible causes:")?;
            writeln!(out, "1. API key is invalid or expired")?;
            writeln!(out, "2. Gemini API is not enabled in your Google Cloud project")?;
            writeln!(out, "3. API key doesn't have permission for this API")?;
            writeln!(out)?;
            writeln!(out, "To fix:")?;
            writeln!(out, "1. Go to https://aistudio.google.com/app/apikey")?;
            writeln!(out, "2. Create a new API key")?;
            writeln!(out, "3. Update gradle.properties with the new key")?;
        }
        CallOutcome::RateLimited { .. } => {
            writeln!(out, "{}", output::failure("❌ 429 Rate Limit Error"))?;
            writeln!(out, "You've exceeded the API quota. Wait a bit and try again.")?;
        }
        other @ (CallOutcome::NotFound { .. } | CallOutcome::Failed { .. }) => {
            writeln!(out, "{}", output::failure(format!("❌ Error: {}", other.status())))?;
            writeln!(out, "{}", text::truncate(other.body(), ERROR_BODY_CHARS))?;
        }
    }

    Ok(false)
}

pub fn write_verdict<W: Write>(out: &mut W, passed: bool) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", output::rule(RULE_WIDTH))?;
    if passed {
        writeln!(out, "{}", output::success("✅ TEST PASSED - API is working!"))?;
    } else {
        writeln!(out, "{}", output::failure("❌ TEST FAILED - API connection issue"))?;
    }
    writeln!(out, "{}", output::rule(RULE_WIDTH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keycheck_core::CredentialLoader;
    use serde_json::json;
    use std::io::Write as _;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn run_against(server: &MockServer) -> (bool, String) {
        run_against_url(&server.uri()).await
    }

    async fn run_against_url(base_url: &str) -> (bool, String) {
        console::set_colors_enabled(false);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "GEMINI_API_KEY=ABCDEFGHIJ1234").unwrap();
        let credential = CredentialLoader::new(file.path()).from_file().unwrap().unwrap();

        let client = GeminiClient::with_timeout(credential, base_url, Duration::from_secs(5)).unwrap();
        let mut out = Vec::new();
        let passed = check(&client, &mut out).await.unwrap();
        write_verdict(&mut out, passed).unwrap();
        (passed, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_working_key_passes_and_prints_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-pro:generateContent"))
            .and(query_param("key", "ABCDEFGHIJ1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "API is working"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (passed, text) = run_against(&server).await;

        assert!(passed);
        assert!(text.contains("Testing API key: ABCDEFGHIJ...1234"));
        assert!(text.contains("Status Code: 200"));
        assert!(text.contains("SUCCESS! API Response: API is working"));
        assert!(text.contains("TEST PASSED"));
    }

    #[tokio::test]
    async fn test_forbidden_explains_key_problem() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("{}"))
            .mount(&server)
            .await;

        let (passed, text) = run_against(&server).await;

        assert!(!passed);
        assert!(text.contains("403 Forbidden Error"));
        assert!(text.contains("API key is invalid or expired"));
        assert!(!text.contains("Error: 403"));
        assert!(text.contains("TEST FAILED"));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let (passed, text) = run_against(&server).await;

        assert!(!passed);
        assert!(text.contains("429 Rate Limit Error"));
    }

    #[tokio::test]
    async fn test_other_status_prints_truncated_body() {
        let server = MockServer::start().await;
        let body = "e".repeat(800);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string(body))
            .mount(&server)
            .await;

        let (passed, text) = run_against(&server).await;

        assert!(!passed);
        assert!(text.contains("Error: 500"));
        assert!(text.contains(&"e".repeat(500)));
        assert!(!text.contains(&"e".repeat(501)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let (passed, text) = run_against_url(&base_url).await;

        assert!(!passed);
        assert!(text.contains("❌ Network Error:"));
        assert!(text.contains("Check your internet connection."));
        assert!(!text.contains("Status Code:"));
        // the key travels in the query string and must not leak into the error
        assert!(!text.contains("ABCDEFGHIJ1234"));
        assert!(text.contains("TEST FAILED"));
    }
}
