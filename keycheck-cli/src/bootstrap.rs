//! Start-up steps shared by the three binaries

use std::io::Write;

use keycheck_core::{Credential, CredentialLoader, KeycheckConfig, KeycheckError, Prompt};
use tracing::info;

use crate::{logging, output};

/// Load `.env.local`, install logging and read the configuration.
pub fn init() -> anyhow::Result<KeycheckConfig> {
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    logging::init();

    let config = KeycheckConfig::from_env()?;
    info!("Reading API key from {}", config.properties_path.display());
    Ok(config)
}

/// Properties file first, then the prompt.
///
/// Returns `None` after reporting when no key was provided, so the caller can
/// exit non-zero.
pub fn resolve_credential<P, W>(
    loader: &CredentialLoader,
    prompt: &mut P,
    out: &mut W,
) -> anyhow::Result<Option<Credential>>
where
    P: Prompt + ?Sized,
    W: Write,
{
    if let Some(credential) = loader.from_file()? {
        return Ok(Some(credential));
    }

    writeln!(
        out,
        "{}",
        output::warning(format!("API key not found in {}", loader.path().display()))
    )?;
    out.flush()?;

    match loader.from_prompt(prompt) {
        Ok(credential) => Ok(Some(credential)),
        Err(KeycheckError::Credential(_)) => {
            writeln!(out, "{}", output::failure("Error: No API key provided"))?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
