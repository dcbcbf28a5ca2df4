//! Live session test against the bidirectional Gemini endpoint
//!
//! Usage: gemini-live
//!
//! Opens one WebSocket, completes the setup handshake, sends a single
//! message and waits for the reply. Ctrl-C closes the session early and
//! still prints the summary.

use std::io::{self, Write};
use std::process::ExitCode;

use keycheck_cli::diagnostics::live;
use keycheck_cli::prompt::TerminalPrompt;
use keycheck_cli::{bootstrap, output};
use keycheck_core::CredentialLoader;
use keycheck_gemini::live::LIVE_MODEL;
use keycheck_gemini::{live_url, LiveSession, LiveSetup};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let config = bootstrap::init()?;
    let mut out = io::stdout().lock();

    writeln!(
        out,
        "{}",
        output::progress("Gemini Phone AI - API Connection Tester").bold()
    )?;
    writeln!(out, "{}", output::rule(50))?;

    let loader = CredentialLoader::new(&config.properties_path);
    let mut prompt = TerminalPrompt::new();
    let Some(credential) = bootstrap::resolve_credential(&loader, &mut prompt, &mut out)? else {
        return Ok(ExitCode::FAILURE);
    };

    live::write_header(&mut out, &credential)?;

    let url = live_url(&config.live_base_url, LIVE_MODEL, &credential)?;
    let session = LiveSession::new(LiveSetup::default());

    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // no signal handler; run until the session ends on its own
            std::future::pending::<()>().await;
        }
    };
    let passed = live::run(session, &url, config.session_timeout, interrupted, &mut out).await?;
    out.flush()?;

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
