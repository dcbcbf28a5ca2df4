//! Model prober
//!
//! Calls each model in a fixed list once and reports which ones the key can
//! use. Failures are informational: the survey always runs to the end.

use std::io::{self, Write};

use keycheck_core::{text, ProbeReport, ProbeResult};
use keycheck_gemini::live::LIVE_MODEL;
use keycheck_gemini::{CallOutcome, GeminiClient};
use tracing::debug;

use crate::output;

/// Models probed, in order
pub const MODELS: [&str; 4] = [
    "gemini-pro",
    "gemini-1.5-pro",
    "gemini-1.5-flash",
    "gemini-2.0-flash-exp",
];

/// Model the live session uses; recommended when reachable
pub const PREFERRED_MODEL: &str = LIVE_MODEL;

pub const PROMPT: &str = "Hello, respond with 'Working!' if you receive this.";

const RULE_WIDTH: usize = 70;
const PREVIEW_CHARS: usize = 50;
const DETAIL_CHARS: usize = 100;
const STATUS_BODY_CHARS: usize = 200;

/// Result of probing a list of models
#[derive(Debug, Clone, Default)]
pub struct ModelSurvey {
    /// One entry per probed model, labelled with the model name
    pub report: ProbeReport,
    /// Models that answered, in probe order
    pub working: Vec<String>,
}

impl ModelSurvey {
    pub fn attempts(&self) -> usize {
        self.report.len()
    }

    pub fn is_working(&self, model: &str) -> bool {
        self.working.iter().any(|m| m == model)
    }

    /// First working model, if the preferred one is not among them
    pub fn recommendation(&self, preferred: &str) -> Option<&str> {
        if self.is_working(preferred) {
            return None;
        }
        self.working.first().map(String::as_str)
    }
}

pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", output::rule(RULE_WIDTH))?;
    writeln!(out, "{}", output::heading("Gemini API Model Compatibility Test"))?;
    writeln!(out, "{}", output::rule(RULE_WIDTH))?;
    writeln!(out)
}

/// Probe every model once, printing a line per attempt as it completes.
pub async fn probe<W: Write>(
    client: &GeminiClient,
    models: &[&str],
    out: &mut W,
) -> io::Result<ModelSurvey> {
    let mut survey = ModelSurvey::default();

    writeln!(out, "Testing API key: {}", client.credential().masked())?;
    writeln!(out)?;

    for model in models {
        write!(out, "Testing {}... ", model)?;
        out.flush()?;

        match client.generate_content(model, PROMPT).await {
            Ok(CallOutcome::Success { text }) => {
                writeln!(
                    out,
                    "{}",
                    output::success(format!("✅ WORKS! Response: {}", text::truncate(&text, PREVIEW_CHARS)))
                )?;
                survey.working.push(model.to_string());
                survey.report.push(ProbeResult::pass(*model, text));
            }
            Ok(outcome) => {
                let detail = failure_detail(&outcome);
                debug!("{} failed: {}", model, detail);
                writeln!(out, "{}", output::failure("❌ FAILED"))?;
                writeln!(out, "   → {}", detail)?;
                survey.report.push(ProbeResult::fail(*model, detail));
            }
            Err(e) => {
                let detail = text::truncate(&e.to_string(), DETAIL_CHARS).to_string();
                writeln!(out, "{}", output::failure("❌ FAILED"))?;
                writeln!(out, "   → {}", detail)?;
                survey.report.push(ProbeResult::fail(*model, detail));
            }
        }
        writeln!(out)?;
    }

    Ok(survey)
}

/// One-line explanation of a non-success outcome
pub fn failure_detail(outcome: &CallOutcome) -> String {
    match outcome {
        CallOutcome::NotFound { .. } => "Model not found or not accessible".to_string(),
        CallOutcome::Forbidden { .. } => "Permission denied".to_string(),
        CallOutcome::NoCandidates => "No response text".to_string(),
        other => {
            let message = other.error_message();
            let line = format!(
                "Status {}: {}",
                other.status(),
                text::truncate(&message, STATUS_BODY_CHARS)
            );
            text::truncate(&line, DETAIL_CHARS).to_string()
        }
    }
}

pub fn write_summary<W: Write>(out: &mut W, survey: &ModelSurvey, preferred: &str) -> io::Result<()> {
    writeln!(out, "{}", output::rule(RULE_WIDTH))?;
    writeln!(out, "{}", output::heading("Summary:"))?;
    writeln!(out, "{}", output::rule(RULE_WIDTH))?;

    if survey.working.is_empty() {
        writeln!(out, "{}", output::failure("❌ No models are working with this API key"))?;
        writeln!(out)?;
        writeln!(out, "Possible issues:")?;
        writeln!(out, "1. API key is invalid")?;
        writeln!(out, "2. Generative Language API is not enabled")?;
        writeln!(out, "3. API key has restrictions")?;
        writeln!(out)?;
        writeln!(out, "Solutions:")?;
        writeln!(out, "1. Visit: https://aistudio.google.com/app/apikey")?;
        writeln!(out, "2. Create a new API key")?;
        writeln!(out, "3. Make sure 'Generative Language API' is enabled")?;
        writeln!(out, "4. Update gradle.properties with the new key")?;
        return Ok(());
    }

    writeln!(
        out,
        "{}",
        output::success(format!("✅ {} model(s) working:", survey.working.len()))
    )?;
    for model in &survey.working {
        writeln!(out, "   • {}", model)?;
    }
    writeln!(out)?;
    writeln!(out, "{}", output::success("✅ Your API key is valid!"))?;

    if let Some(recommended) = survey.recommendation(preferred) {
        writeln!(out)?;
        writeln!(out, "{}", output::warning(format!("⚠️  Note: {} is not accessible", preferred)))?;
        writeln!(out, "   You may need to use a different model in the app")?;
        writeln!(out, "   Recommended: {}", recommended)?;
    }

    Ok(())
}
