use anyhow::{bail, Context, Result};
use std::io::IsTerminal;
use std::path::Path;

use super::output::{format_entries, format_fragment, print_note};
use super::{App, OutputFormat};
use crate::core::attachment::Attachment;
use crate::core::error::ChatError;
use crate::render::{format_blocks, Transcript};

const LOGIN_HINT: &str = "run `graphchat --set-token <TOKEN>` or set GRAPHCHAT_TOKEN";

/// One exchange: gate, submit, print the reply. Request failures become the
/// process error after the transcript has been settled.
pub async fn run_prompt(
    app: &mut App,
    prompt: &str,
    file: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let attachment = file
        .map(|path| {
            Attachment::from_path(path).with_context(|| format!("reading {}", path.display()))
        })
        .transpose()?;

    app.controller.check_status().await;
    if !app.controller.input_enabled() {
        bail!("this conversation has concluded; no further messages can be sent");
    }
    if attachment.is_some() && !app.controller.uploads_enabled() {
        bail!("file uploads are not available for this account");
    }

    let mut transcript = Transcript::new();
    let Some(pending) = app.controller.begin(&mut transcript, prompt, attachment) else {
        if transcript.turn_count() > 0 {
            bail!("{}: {LOGIN_HINT}", ChatError::NotAuthenticated);
        }
        bail!("nothing to send: provide a message with -p or a file with --file");
    };

    if !quiet {
        print_note("Waiting for the assistant...");
    }
    let service = app.controller.service();
    let outcome = pending.dispatch(service.as_ref()).await;
    let failure = outcome.as_ref().err().cloned();
    let decision = outcome.as_ref().ok().and_then(|r| r.decision.clone());
    app.controller.finish(&mut transcript, pending, outcome);

    if let Some(e) = failure {
        return Err(e.into());
    }

    let blocks = transcript
        .turns()
        .last()
        .map(|turn| turn.blocks().to_vec())
        .unwrap_or_default();

    match format {
        OutputFormat::Text => {
            let color = std::io::stdout().is_terminal();
            let text: Vec<String> = format_blocks(&blocks)
                .iter()
                .map(|f| format_fragment(f, color))
                .collect();
            println!("{}", text.join("\n\n"));
            if !quiet && !app.controller.input_enabled() {
                print_note("The conversation has concluded.");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "content": blocks,
                "decision": decision,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

/// Print the stored conversation as the transcript would show it.
pub async fn run_history(app: &App, format: OutputFormat) -> Result<()> {
    let mut transcript = Transcript::new();
    app.controller
        .load_history(&mut transcript)
        .await
        .map_err(|e| match e {
            ChatError::NotAuthenticated => anyhow::anyhow!("{e}: {LOGIN_HINT}"),
            other => other.into(),
        })?;

    match format {
        OutputFormat::Text => {
            let color = std::io::stdout().is_terminal();
            println!("{}", format_entries(transcript.entries(), color));
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(transcript.turns())?);
        }
    }
    Ok(())
}
