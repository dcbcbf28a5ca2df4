//! Session tester report
//!
//! Renders [`SessionEvent`]s as they arrive and prints the pass/fail summary
//! once the connection is closed.

use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;

use keycheck_core::{Credential, ProbeReport};
use keycheck_gemini::live::{MIN_PASSING_RESULTS, PERMISSION_DENIED};
use keycheck_gemini::{LiveSession, SessionEvent};
use url::Url;

use crate::output;

pub fn write_header<W: Write>(out: &mut W, credential: &Credential) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", output::heading("=== Gemini API Connection Test ==="))?;
    writeln!(out)?;
    writeln!(out, "API Key: {}", credential.masked())?;
    writeln!(out, "Endpoint: Gemini 2.0 Flash Experimental")?;
    writeln!(out)?;
    writeln!(out, "{}", output::progress("Starting test..."))?;
    writeln!(out)
}

pub fn write_event<W: Write>(out: &mut W, event: &SessionEvent) -> io::Result<()> {
    match event {
        SessionEvent::Connected => {
            writeln!(out, "{}", output::success("✓ WebSocket connected successfully"))
        }
        SessionEvent::SendingSetup => {
            writeln!(out, "{}", output::progress("→ Sending configuration..."))
        }
        SessionEvent::SetupComplete => {
            writeln!(out, "{}", output::success("✓ Setup completed successfully"))
        }
        SessionEvent::SendingMessage => {
            writeln!(out, "{}", output::progress("→ Sending test message..."))
        }
        SessionEvent::Reply(text) => {
            writeln!(out, "{}", output::success(format!("✓ Received response: {}", text)))
        }
        SessionEvent::ApiError(message) => {
            writeln!(out, "{}", output::failure(format!("✗ API Error: {}", message)))
        }
        SessionEvent::PermissionDenied(message) => {
            writeln!(out, "{}", output::failure(format!("✗ Permission denied: {}", message)))
        }
        SessionEvent::Interrupted => {
            writeln!(out)?;
            writeln!(out, "{}", output::warning("Test interrupted by user"))
        }
        SessionEvent::Malformed(error) => {
            writeln!(out, "{}", output::warning(format!("⚠ Could not parse message: {}", error)))
        }
        SessionEvent::TransportError(error) => {
            writeln!(out, "{}", output::failure(format!("✗ WebSocket error: {}", error)))
        }
        SessionEvent::TimedOut(waited) => writeln!(
            out,
            "{}",
            output::failure(format!("✗ No response within {}s", waited.as_secs()))
        ),
        SessionEvent::Closed { code: Some(code), reason } => writeln!(
            out,
            "{}",
            output::warning(format!("WebSocket closed: {} - {}", code, reason))
        ),
        SessionEvent::Closed { code: None, .. } => Ok(()),
    }
}

/// Print the per-step results and overall verdict. Returns the verdict.
pub fn write_summary<W: Write>(out: &mut W, report: &ProbeReport) -> io::Result<bool> {
    writeln!(out)?;
    writeln!(out, "{}", output::heading("=== Test Summary ==="))?;
    writeln!(out)?;

    for result in report.results() {
        if result.passed {
            writeln!(out, "✓ {}: {}", result.label, output::success("PASS"))?;
        } else {
            writeln!(out, "✗ {}: {}", result.label, output::failure("FAIL"))?;
            if !result.detail.is_empty() {
                writeln!(out, "  {}", output::warning(format!("→ {}", result.detail)))?;
            }
        }
    }

    let passed = report.all_passed(MIN_PASSING_RESULTS);

    writeln!(out)?;
    write!(out, "{}", output::heading("Overall Result: "))?;
    if passed {
        writeln!(out, "{}", output::success("✓ ALL TESTS PASSED"))?;
        writeln!(out)?;
        writeln!(out, "Your Gemini API key is working correctly!")?;
        writeln!(out, "The app should be able to connect and process calls.")?;
    } else {
        writeln!(out, "{}", output::failure("✗ TESTS FAILED"))?;
        writeln!(out)?;
        writeln!(out, "Please check:")?;
        writeln!(out, "1. Your API key is correct")?;
        writeln!(out, "2. The Gemini API is enabled in your Google Cloud project")?;
        writeln!(out, "3. You have sufficient quota remaining")?;
        writeln!(out, "4. Your network allows WebSocket connections")?;

        if report.failed().any(|r| r.label == PERMISSION_DENIED) {
            writeln!(out)?;
            writeln!(out, "{}", output::warning("The API key was refused (403 Forbidden)."))?;
            writeln!(out, "To fix:")?;
            writeln!(out, "1. Go to https://aistudio.google.com/app/apikey")?;
            writeln!(out, "2. Create a new API key")?;
            writeln!(out, "3. Update gradle.properties with the new key")?;
        }
    }

    Ok(passed)
}

/// Drive `session` against `url`, printing events and then the summary.
///
/// The session stops early when `shutdown` completes and the summary covers
/// what was gathered until then. Write errors don't interrupt the session or
/// the summary; the first one is returned at the end.
pub async fn run<W, S>(
    session: LiveSession,
    url: &Url,
    idle_timeout: Duration,
    shutdown: S,
    out: &mut W,
) -> io::Result<bool>
where
    W: Write,
    S: Future<Output = ()>,
{
    let mut write_error: Option<io::Error> = None;

    let report = session
        .run_until(url, idle_timeout, shutdown, |event| {
            let result = write_event(&mut *out, event).and_then(|()| out.flush());
            if let Err(e) = result {
                write_error.get_or_insert(e);
            }
        })
        .await;

    let passed = write_summary(out, &report)?;
    match write_error {
        Some(e) => Err(e),
        None => Ok(passed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keycheck_core::ProbeResult;

    fn render(report: &ProbeReport) -> (bool, String) {
        console::set_colors_enabled(false);
        let mut out = Vec::new();
        let passed = write_summary(&mut out, report).unwrap();
        (passed, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_summary_all_passed() {
        let mut report = ProbeReport::new();
        report.push(ProbeResult::pass("WebSocket Connection", "Connected"));
        report.push(ProbeResult::pass("API Setup", "Configuration accepted"));
        report.push(ProbeResult::pass("Message Response", "Hello, I am working!"));

        let (passed, text) = render(&report);

        assert!(passed);
        assert!(text.contains("✓ API Setup: PASS"));
        assert!(text.contains("ALL TESTS PASSED"));
        assert!(!text.contains("Please check:"));
    }

    #[test]
    fn test_summary_needs_two_results() {
        let mut report = ProbeReport::new();
        report.push(ProbeResult::pass("WebSocket Connection", "Connected"));

        let (passed, text) = render(&report);

        assert!(!passed);
        assert!(text.contains("TESTS FAILED"));
        assert!(text.contains("4. Your network allows WebSocket connections"));
    }

    #[test]
    fn test_summary_shows_failure_detail() {
        let mut report = ProbeReport::new();
        report.push(ProbeResult::pass("WebSocket Connection", "Connected"));
        report.push(ProbeResult::pass("API Setup", "Configuration accepted"));
        report.push(ProbeResult::fail("API Error", "API key not valid"));

        let (passed, text) = render(&report);

        assert!(!passed);
        assert!(text.contains("✗ API Error: FAIL"));
        assert!(text.contains("→ API key not valid"));
        // details of passing steps stay hidden
        assert!(!text.contains("→ Connected"));
    }

    #[test]
    fn test_close_line_only_with_code() {
        console::set_colors_enabled(false);
        let mut out = Vec::new();
        write_event(
            &mut out,
            &SessionEvent::Closed {
                code: Some(1000),
                reason: String::new(),
            },
        )
        .unwrap();
        write_event(
            &mut out,
            &SessionEvent::Closed {
                code: None,
                reason: String::new(),
            },
        )
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("WebSocket closed").count(), 1);
        assert!(text.contains("WebSocket closed: 1000 - "));
    }

    #[tokio::test]
    async fn test_run_unreachable_endpoint() {
        console::set_colors_enabled(false);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{}/v1beta/models/x:bidiGenerateContent", addr)).unwrap();
        let mut out = Vec::new();
        let session = LiveSession::new(Default::default());

        let passed = run(
            session,
            &url,
            Duration::from_secs(5),
            std::future::pending::<()>(),
            &mut out,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(!passed);
        assert!(text.contains("✗ WebSocket error:"));
        assert!(text.contains("✗ WebSocket Error: FAIL"));
    }

    /// Rejects the first `failures` writes, then buffers
    struct FailingWriter {
        failures: usize,
        buf: Vec<u8>,
    }

    impl Write for FailingWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"));
            }
            self.buf.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_write_error_still_prints_summary() {
        console::set_colors_enabled(false);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{}/v1beta/models/x:bidiGenerateContent", addr)).unwrap();
        let mut out = FailingWriter {
            failures: 1,
            buf: Vec::new(),
        };

        let err = run(
            LiveSession::new(Default::default()),
            &url,
            Duration::from_secs(5),
            std::future::pending::<()>(),
            &mut out,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        let text = String::from_utf8(out.buf).unwrap();
        assert!(text.contains("=== Test Summary ==="));
        assert!(text.contains("✗ WebSocket Error: FAIL"));
    }

    #[tokio::test]
    async fn test_shutdown_prints_summary() {
        console::set_colors_enabled(false);
        // bound but never accepting: the handshake stalls
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!(
            "ws://{}/v1beta/models/x:bidiGenerateContent",
            listener.local_addr().unwrap()
        ))
        .unwrap();
        let mut out = Vec::new();

        let passed = run(
            LiveSession::new(Default::default()),
            &url,
            Duration::from_secs(5),
            async {},
            &mut out,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(!passed);
        assert!(text.contains("Test interrupted by user"));
        assert!(text.contains("✗ Interrupted: FAIL"));
        assert!(text.contains("TESTS FAILED"));
    }

    #[test]
    fn test_summary_permission_remediation() {
        let mut report = ProbeReport::new();
        report.push(ProbeResult::fail(PERMISSION_DENIED, "API key not valid"));

        let (passed, text) = render(&report);

        assert!(!passed);
        assert!(text.contains("✗ Permission Denied: FAIL"));
        assert!(text.contains("→ API key not valid"));
        assert!(text.contains("The API key was refused (403 Forbidden)."));
        assert!(text.contains("Create a new API key"));

        let mut report = ProbeReport::new();
        report.push(ProbeResult::fail("API Error", "Quota exceeded"));
        let (_, text) = render(&report);
        assert!(!text.contains("403 Forbidden"));
    }

    #[test]
    fn test_permission_event_line() {
        console::set_colors_enabled(false);
        let mut out = Vec::new();
        write_event(&mut out, &SessionEvent::PermissionDenied("API key not valid".to_string()))
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "✗ Permission denied: API key not valid\n"
        );
    }
}
