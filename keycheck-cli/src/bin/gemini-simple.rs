//! Single generateContent call to check an API key
//!
//! Usage: gemini-simple

use std::io::{self, Write};
use std::process::ExitCode;

use keycheck_cli::bootstrap;
use keycheck_cli::diagnostics::simple;
use keycheck_cli::prompt::TerminalPrompt;
use keycheck_core::CredentialLoader;
use keycheck_gemini::GeminiClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let config = bootstrap::init()?;
    let mut out = io::stdout().lock();

    simple::write_header(&mut out)?;

    let loader = CredentialLoader::new(&config.properties_path);
    let mut prompt = TerminalPrompt::new();
    let Some(credential) = bootstrap::resolve_credential(&loader, &mut prompt, &mut out)? else {
        return Ok(ExitCode::FAILURE);
    };

    let client = GeminiClient::new(credential, &config)?;
    let passed = simple::check(&client, &mut out).await?;
    simple::write_verdict(&mut out, passed)?;
    out.flush()?;

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
