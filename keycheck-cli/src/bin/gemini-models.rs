//! Probe which Gemini models an API key can call
//!
//! Usage: gemini-models
//!
//! Reads `GEMINI_API_KEY` from the properties file (see `KEYCHECK_PROPERTIES_PATH`)
//! or asks for it. Exits non-zero only when no key is available.

use std::io::{self, Write};
use std::process::ExitCode;

use keycheck_cli::bootstrap;
use keycheck_cli::diagnostics::models::{self, MODELS, PREFERRED_MODEL};
use keycheck_cli::prompt::TerminalPrompt;
use keycheck_core::CredentialLoader;
use keycheck_gemini::GeminiClient;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let config = bootstrap::init()?;
    let mut out = io::stdout().lock();

    models::write_header(&mut out)?;

    let loader = CredentialLoader::new(&config.properties_path);
    let mut prompt = TerminalPrompt::new();
    let Some(credential) = bootstrap::resolve_credential(&loader, &mut prompt, &mut out)? else {
        return Ok(ExitCode::FAILURE);
    };

    let client = GeminiClient::new(credential, &config)?;
    let survey = models::probe(&client, &MODELS, &mut out).await?;
    models::write_summary(&mut out, &survey, PREFERRED_MODEL)?;
    out.flush()?;

    info!("{} of {} models working", survey.working.len(), survey.attempts());
    Ok(ExitCode::SUCCESS)
}
