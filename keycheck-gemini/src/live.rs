//! Gemini live session tester
//!
//! Opens one WebSocket to the bidirectional generate endpoint, performs the
//! setup handshake, sends a single user turn and waits for a single reply.
//!
//! The protocol logic lives in [`LiveSession`], a synchronous state machine
//! that turns server frames into [`Step`]s. [`LiveSession::run`] drives it
//! over a real connection and reports progress as [`SessionEvent`]s.

use std::future::{self, Future};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use keycheck_core::{text, Credential, KeycheckError, KeycheckResult, ProbeReport, ProbeResult};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::types::{
    ApiErrorBody, ClientContent, ClientContentMessage, Content, GenerationConfig,
    LiveServerMessage, ModelSelection, Part, Setup, SetupMessage,
};

/// Model the live endpoint is opened against
pub const LIVE_MODEL: &str = "gemini-2.0-flash-exp";

/// User turn sent once the setup is acknowledged
pub const LIVE_PROMPT: &str = "Reply with 'Hello, I am working!' if you receive this.";

/// Minimum number of recorded steps for the session to count as passed
pub const MIN_PASSING_RESULTS: usize = 2;

/// Label recorded when the server refuses the key
pub const PERMISSION_DENIED: &str = "Permission Denied";

/// Label recorded when the run is cancelled from outside
pub const INTERRUPTED: &str = "Interrupted";

/// Characters of the reply kept in the report
const REPLY_PREVIEW_CHARS: usize = 50;

/// Parameters of the setup frame
#[derive(Debug, Clone)]
pub struct LiveSetup {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for LiveSetup {
    fn default() -> Self {
        Self {
            model: LIVE_MODEL.to_string(),
            prompt: LIVE_PROMPT.to_string(),
            temperature: 0.7,
            max_output_tokens: 100,
        }
    }
}

impl LiveSetup {
    fn setup_message(&self) -> SetupMessage {
        SetupMessage {
            setup: Setup {
                model: ModelSelection {
                    model: format!("models/{}", self.model),
                },
                generation_config: GenerationConfig {
                    response_modalities: vec!["TEXT".to_string()],
                    temperature: self.temperature,
                    max_output_tokens: self.max_output_tokens,
                },
            },
        }
    }

    fn client_content_message(&self) -> ClientContentMessage {
        ClientContentMessage {
            client_content: ClientContent {
                turns: vec![Content {
                    role: Some("user".to_string()),
                    parts: vec![Part::text(&self.prompt)],
                }],
                turn_complete: true,
            },
        }
    }
}

/// Build the live endpoint URL for `model`, carrying the key as a query
/// parameter.
pub fn live_url(base_url: &str, model: &str, credential: &Credential) -> KeycheckResult<Url> {
    let raw = format!(
        "{}/v1beta/models/{}:bidiGenerateContent",
        base_url.trim_end_matches('/'),
        model
    );
    let mut url = Url::parse(&raw)
        .map_err(|e| KeycheckError::config(format!("Invalid live endpoint {}: {}", raw, e)))?;
    url.query_pairs_mut().append_pair("key", credential.expose());
    Ok(url)
}

/// Where the session is in its single linear exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected yet
    Initial,
    /// Setup sent, waiting for `setupComplete`
    AwaitingSetupAck,
    /// User turn sent, waiting for model text
    AwaitingReply,
    /// Reply received
    Done,
    /// Server reported an error, or the transport failed
    Errored,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Errored)
    }
}

/// What the driver must do after feeding a frame to the session
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Setup acknowledged; send this user turn
    SendTurn(String),
    /// Model replied; close the connection
    Reply(String),
    /// Server reported an error; close the connection
    ApiError(String),
    /// Server refused the key; close the connection
    PermissionDenied(String),
    /// Frame was not JSON
    Malformed(String),
    /// Frame did not match what the current state expects
    Ignored,
}

/// Progress notifications emitted while the session runs
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    SendingSetup,
    SetupComplete,
    SendingMessage,
    Reply(String),
    ApiError(String),
    PermissionDenied(String),
    Malformed(String),
    TransportError(String),
    TimedOut(Duration),
    Interrupted,
    Closed { code: Option<u16>, reason: String },
}

/// State machine for one live session
#[derive(Debug)]
pub struct LiveSession {
    setup: LiveSetup,
    state: SessionState,
    report: ProbeReport,
}

impl LiveSession {
    pub fn new(setup: LiveSetup) -> Self {
        Self {
            setup,
            state: SessionState::Initial,
            report: ProbeReport::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn report(&self) -> &ProbeReport {
        &self.report
    }

    pub fn into_report(self) -> ProbeReport {
        self.report
    }

    /// Connection is open: record it and return the setup frame to send.
    pub fn on_open(&mut self) -> KeycheckResult<String> {
        if self.state != SessionState::Initial {
            return Err(KeycheckError::websocket(format!(
                "Session already opened (state {:?})",
                self.state
            )));
        }

        self.report.push(ProbeResult::pass("WebSocket Connection", "Connected"));
        let frame = serde_json::to_string(&self.setup.setup_message())
            .map_err(|e| KeycheckError::parse(format!("Failed to encode setup: {}", e)))?;
        self.state = SessionState::AwaitingSetupAck;
        Ok(frame)
    }

    /// Feed one server frame.
    ///
    /// Frames that do not fit the current state are ignored. An `error` key
    /// ends the session in either waiting state.
    pub fn on_message(&mut self, raw: &str) -> Step {
        if self.state.is_terminal() || self.state == SessionState::Initial {
            return Step::Ignored;
        }

        let message: LiveServerMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(e) => return Step::Malformed(e.to_string()),
        };

        let reply = message
            .server_content
            .as_ref()
            .and_then(|c| c.first_text())
            .map(str::to_string);

        match (self.state, reply) {
            (SessionState::AwaitingSetupAck, _) if message.setup_complete.is_some() => {
                match serde_json::to_string(&self.setup.client_content_message()) {
                    Ok(frame) => {
                        self.report
                            .push(ProbeResult::pass("API Setup", "Configuration accepted"));
                        self.state = SessionState::AwaitingReply;
                        Step::SendTurn(frame)
                    }
                    Err(e) => self.fail("API Setup", format!("Failed to encode message: {}", e)),
                }
            }
            (SessionState::AwaitingReply, Some(reply)) => {
                self.report.push(ProbeResult::pass(
                    "Message Response",
                    text::truncate(&reply, REPLY_PREVIEW_CHARS),
                ));
                self.state = SessionState::Done;
                Step::Reply(reply)
            }
            _ => match message.error {
                Some(error) if error.is_permission_denied() => {
                    let detail = error
                        .message
                        .unwrap_or_else(|| "The caller does not have permission".to_string());
                    self.on_permission_denied(detail.clone());
                    Step::PermissionDenied(detail)
                }
                Some(error) => {
                    let detail = error.message.unwrap_or_else(|| "Unknown error".to_string());
                    self.fail("API Error", detail)
                }
                None => Step::Ignored,
            },
        }
    }

    /// Transport-level failure
    pub fn on_transport_error(&mut self, error: impl Into<String>) {
        self.report.push(ProbeResult::fail("WebSocket Error", error));
        self.state = SessionState::Errored;
    }

    /// The key was refused, either on the upgrade or in an error frame
    pub fn on_permission_denied(&mut self, detail: impl Into<String>) {
        self.report.push(ProbeResult::fail(PERMISSION_DENIED, detail));
        self.state = SessionState::Errored;
    }

    /// The run was cancelled before reaching a terminal state
    pub fn on_interrupt(&mut self) {
        self.report
            .push(ProbeResult::fail(INTERRUPTED, "Test interrupted by user"));
        self.state = SessionState::Errored;
    }

    /// Nothing arrived within the idle timeout
    pub fn on_timeout(&mut self, waited: Duration) {
        self.report.push(ProbeResult::fail(
            "Session Timeout",
            format!("No response within {}s ({:?})", waited.as_secs(), self.state),
        ));
        self.state = SessionState::Errored;
    }

    /// True when every step passed and the handshake got far enough
    pub fn passed(&self) -> bool {
        self.report.all_passed(MIN_PASSING_RESULTS)
    }

    fn fail(&mut self, label: &str, detail: String) -> Step {
        self.report.push(ProbeResult::fail(label, detail.clone()));
        self.state = SessionState::Errored;
        Step::ApiError(detail)
    }

    /// Drive the session over a real WebSocket connection.
    ///
    /// `idle_timeout` bounds the connect attempt and every wait for a server
    /// frame. The connection is always closed before this returns, and a
    /// [`SessionEvent::Closed`] is always the last event emitted.
    pub async fn run<F>(self, url: &Url, idle_timeout: Duration, on_event: F) -> ProbeReport
    where
        F: FnMut(&SessionEvent),
    {
        self.run_until(url, idle_timeout, future::pending::<()>(), on_event)
            .await
    }

    /// Same as [`LiveSession::run`], but stops early once `shutdown`
    /// completes. An interrupted run still closes the connection and returns
    /// the report gathered so far.
    pub async fn run_until<F, S>(
        mut self,
        url: &Url,
        idle_timeout: Duration,
        shutdown: S,
        mut on_event: F,
    ) -> ProbeReport
    where
        F: FnMut(&SessionEvent),
        S: Future<Output = ()>,
    {
        info!("Connecting to live endpoint {}", redact(url));
        tokio::pin!(shutdown);

        let connect = tokio::select! {
            result = timeout(idle_timeout, connect_async(url.as_str())) => Some(result),
            _ = &mut shutdown => None,
        };

        let ws_stream = match connect {
            Some(Ok(Ok((ws_stream, _)))) => ws_stream,
            Some(Ok(Err(WsError::Http(response)))) if response.status() == StatusCode::FORBIDDEN => {
                let detail = forbidden_detail(response.body().as_deref());
                warn!("Live connection refused: {}", detail);
                self.on_permission_denied(detail.clone());
                on_event(&SessionEvent::PermissionDenied(detail));
                on_event(&SessionEvent::Closed { code: None, reason: String::new() });
                return self.into_report();
            }
            Some(Ok(Err(e))) => {
                let message = e.to_string();
                warn!("Live connection failed: {}", message);
                self.on_transport_error(message.clone());
                on_event(&SessionEvent::TransportError(message));
                on_event(&SessionEvent::Closed { code: None, reason: String::new() });
                return self.into_report();
            }
            Some(Err(_)) => {
                self.on_timeout(idle_timeout);
                on_event(&SessionEvent::TimedOut(idle_timeout));
                on_event(&SessionEvent::Closed { code: None, reason: String::new() });
                return self.into_report();
            }
            None => {
                self.on_interrupt();
                on_event(&SessionEvent::Interrupted);
                on_event(&SessionEvent::Closed { code: None, reason: String::new() });
                return self.into_report();
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let mut close_frame: Option<(u16, String)> = None;
        let mut closed_by_server = false;

        match self.on_open() {
            Ok(setup) => {
                on_event(&SessionEvent::Connected);
                on_event(&SessionEvent::SendingSetup);
                if let Err(e) = write.send(Message::Text(setup.into())).await {
                    self.on_transport_error(e.to_string());
                    on_event(&SessionEvent::TransportError(e.to_string()));
                }
            }
            Err(e) => {
                self.on_transport_error(e.to_string());
                on_event(&SessionEvent::TransportError(e.to_string()));
            }
        }

        while !self.state.is_terminal() {
            let next = tokio::select! {
                next = timeout(idle_timeout, read.next()) => next,
                _ = &mut shutdown => {
                    self.on_interrupt();
                    on_event(&SessionEvent::Interrupted);
                    break;
                }
            };

            let frame = match next {
                Err(_) => {
                    self.on_timeout(idle_timeout);
                    on_event(&SessionEvent::TimedOut(idle_timeout));
                    break;
                }
                Ok(None) => {
                    debug!("Live stream ended");
                    break;
                }
                Ok(Some(Err(e))) => {
                    self.on_transport_error(e.to_string());
                    on_event(&SessionEvent::TransportError(e.to_string()));
                    break;
                }
                Ok(Some(Ok(frame))) => frame,
            };

            let raw = match frame {
                Message::Text(text) => text.as_str().to_string(),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(e) => {
                        on_event(&SessionEvent::Malformed(e.to_string()));
                        continue;
                    }
                },
                Message::Close(frame) => {
                    closed_by_server = true;
                    close_frame = frame.map(|f| (u16::from(f.code), f.reason.as_str().to_string()));
                    break;
                }
                _ => continue,
            };

            match self.on_message(&raw) {
                Step::SendTurn(turn) => {
                    on_event(&SessionEvent::SetupComplete);
                    on_event(&SessionEvent::SendingMessage);
                    if let Err(e) = write.send(Message::Text(turn.into())).await {
                        self.on_transport_error(e.to_string());
                        on_event(&SessionEvent::TransportError(e.to_string()));
                    }
                }
                Step::Reply(reply) => on_event(&SessionEvent::Reply(reply)),
                Step::ApiError(message) => on_event(&SessionEvent::ApiError(message)),
                Step::PermissionDenied(message) => {
                    on_event(&SessionEvent::PermissionDenied(message))
                }
                Step::Malformed(error) => on_event(&SessionEvent::Malformed(error)),
                Step::Ignored => debug!("Ignoring live frame in state {:?}", self.state),
            }
        }

        // Close from our side unless the server already did
        if !closed_by_server {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: String::new().into(),
            };
            if write.send(Message::Close(Some(frame))).await.is_ok() {
                close_frame = await_close_ack(&mut read, idle_timeout).await;
            }
        } else {
            // flushes the automatic close reply
            let _ = write.close().await;
        }

        let (code, reason) = match close_frame {
            Some((code, reason)) => (Some(code), reason),
            None => (None, String::new()),
        };
        on_event(&SessionEvent::Closed { code, reason });
        self.into_report()
    }
}

/// Read until the peer answers our close frame or the stream ends
async fn await_close_ack<S>(read: &mut S, wait: Duration) -> Option<(u16, String)>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match timeout(wait, read.next()).await {
            Ok(Some(Ok(Message::Close(frame)))) => {
                return frame.map(|f| (u16::from(f.code), f.reason.as_str().to_string()));
            }
            Ok(Some(Ok(_))) => continue,
            _ => return None,
        }
    }
}

/// Vendor message from a refused upgrade, when the body carries one
fn forbidden_detail(body: Option<&[u8]>) -> String {
    body.and_then(|b| serde_json::from_slice::<ApiErrorBody>(b).ok())
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| "403 Forbidden".to_string())
}

/// URL without its query string, safe to log
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keycheck_core::CredentialSource;
    use serde_json::Value;

    fn opened() -> LiveSession {
        let mut session = LiveSession::new(LiveSetup::default());
        session.on_open().unwrap();
        session
    }

    #[test]
    fn test_open_sends_setup_once() {
        let mut session = LiveSession::new(LiveSetup::default());
        let setup: Value = serde_json::from_str(&session.on_open().unwrap()).unwrap();

        assert_eq!(setup["setup"]["model"]["model"], "models/gemini-2.0-flash-exp");
        assert_eq!(setup["setup"]["generationConfig"]["temperature"], 0.7);
        assert_eq!(session.state(), SessionState::AwaitingSetupAck);
        assert!(session.on_open().is_err());
    }

    #[test]
    fn test_happy_path() {
        let mut session = opened();

        let turn = match session.on_message(r#"{"setupComplete": {}}"#) {
            Step::SendTurn(turn) => turn,
            other => panic!("expected a turn, got {:?}", other),
        };
        let turn: Value = serde_json::from_str(&turn).unwrap();
        assert_eq!(turn["clientContent"]["turnComplete"], true);
        assert_eq!(turn["clientContent"]["turns"][0]["role"], "user");
        assert_eq!(turn["clientContent"]["turns"][0]["parts"][0]["text"], LIVE_PROMPT);

        let step = session.on_message(
            r#"{"serverContent": {"modelTurn": {"parts": [{"text": "Hello, I am working!"}]}}}"#,
        );
        assert_eq!(step, Step::Reply("Hello, I am working!".to_string()));
        assert_eq!(session.state(), SessionState::Done);
        assert!(session.passed());

        let labels: Vec<_> = session.report().results().iter().map(|r| r.label.clone()).collect();
        assert_eq!(labels, ["WebSocket Connection", "API Setup", "Message Response"]);
    }

    #[test]
    fn test_out_of_order_frames_are_ignored() {
        let mut session = opened();

        let early_reply = r#"{"serverContent": {"modelTurn": {"parts": [{"text": "too soon"}]}}}"#;
        assert_eq!(session.on_message(early_reply), Step::Ignored);
        assert_eq!(session.state(), SessionState::AwaitingSetupAck);

        session.on_message(r#"{"setupComplete": {}}"#);
        assert_eq!(session.on_message(r#"{"setupComplete": {}}"#), Step::Ignored);
        assert_eq!(session.on_message(r#"{"serverContent": {"turnComplete": true}}"#), Step::Ignored);
        assert_eq!(session.state(), SessionState::AwaitingReply);
    }

    #[test]
    fn test_api_error_ends_session() {
        let mut session = opened();
        session.on_message(r#"{"setupComplete": {}}"#);

        let step = session.on_message(r#"{"error": {"code": 429, "message": "Quota exceeded"}}"#);
        assert_eq!(step, Step::ApiError("Quota exceeded".to_string()));
        assert_eq!(session.state(), SessionState::Errored);
        assert!(!session.passed());

        // terminal: nothing else is processed
        let late = r#"{"serverContent": {"modelTurn": {"parts": [{"text": "late"}]}}}"#;
        assert_eq!(session.on_message(late), Step::Ignored);
        assert_eq!(session.report().len(), 3);
    }

    #[test]
    fn test_permission_error_frame() {
        let mut session = opened();
        session.on_message(r#"{"setupComplete": {}}"#);

        let step = session.on_message(
            r#"{"error": {"code": 403, "message": "The caller does not have permission"}}"#,
        );
        assert_eq!(
            step,
            Step::PermissionDenied("The caller does not have permission".to_string())
        );
        assert_eq!(session.state(), SessionState::Errored);
        assert_eq!(session.report().results()[2].label, PERMISSION_DENIED);

        let mut session = opened();
        let step = session.on_message(r#"{"error": {"status": "PERMISSION_DENIED"}}"#);
        assert!(matches!(step, Step::PermissionDenied(_)));
        assert_eq!(session.report().results()[1].label, PERMISSION_DENIED);
    }

    #[test]
    fn test_forbidden_detail_uses_vendor_message() {
        let body = br#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(forbidden_detail(Some(body)), "API key not valid");
        assert_eq!(forbidden_detail(Some(b"<html>nope</html>")), "403 Forbidden");
        assert_eq!(forbidden_detail(None), "403 Forbidden");
    }

    #[test]
    fn test_interrupt_is_a_failure() {
        let mut session = opened();
        session.on_interrupt();
        assert_eq!(session.state(), SessionState::Errored);
        assert!(!session.passed());
        assert_eq!(session.report().results()[1].label, INTERRUPTED);
    }

    #[test]
    fn test_error_during_setup() {
        let mut session = opened();
        let step = session.on_message(r#"{"error": {}}"#);
        assert_eq!(step, Step::ApiError("Unknown error".to_string()));
        assert_eq!(session.state(), SessionState::Errored);
    }

    #[test]
    fn test_malformed_frame_keeps_state() {
        let mut session = opened();
        assert!(matches!(session.on_message("{not json"), Step::Malformed(_)));
        assert_eq!(session.state(), SessionState::AwaitingSetupAck);
    }

    #[test]
    fn test_reply_preview_truncated() {
        let mut session = opened();
        session.on_message(r#"{"setupComplete": {}}"#);
        let long = "x".repeat(80);
        let frame = format!(r#"{{"serverContent": {{"modelTurn": {{"parts": [{{"text": "{}"}}]}}}}}}"#, long);

        assert_eq!(session.on_message(&frame), Step::Reply(long));
        assert_eq!(session.report().results()[2].detail.len(), 50);
    }

    #[test]
    fn test_live_url_carries_key() {
        let credential = Credential::new("ABCDEFGHIJ1234", CredentialSource::Prompt).unwrap();
        let url = live_url("wss://generativelanguage.googleapis.com/", LIVE_MODEL, &credential).unwrap();

        assert_eq!(
            url.as_str(),
            "wss://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:bidiGenerateContent?key=ABCDEFGHIJ1234"
        );
        assert!(!redact(&url).contains("ABCDEFGHIJ1234"));
    }
}
