use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use relay_core::Phase;
use relay_engine::{
    Artifact, HttpStatusChannel, HttpTransferChannel, Orchestrator, SubmitOptions, Subscription,
};
use relay_logging::{relay_info, relay_warn};

use crate::cli::SubmitArgs;
use crate::config::AppConfig;
use crate::output::{OutputFormat, Printer};

/// Submit one video and follow it until it is terminal.
///
/// The first Ctrl-C cancels the job; the command still waits for the
/// cancelled snapshot so the last line printed is always terminal.
pub async fn submit(args: SubmitArgs, config: AppConfig) -> Result<ExitCode> {
    let settings = config.http_settings();
    let orchestrator = Orchestrator::new(
        Arc::new(HttpTransferChannel::new(settings.clone())),
        Arc::new(HttpStatusChannel::new(settings)),
        config.poll_policy(),
    )
    .context("Invalid poll settings in configuration")?;

    let language = args.language.unwrap_or(config.target_language);
    let updates = orchestrator.submit(
        Artifact::from_path(&args.file),
        SubmitOptions::new(language),
    );
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let phase = follow(&orchestrator, updates, Printer::new(format)).await?;
    Ok(exit_code(phase))
}

async fn follow(
    orchestrator: &Orchestrator,
    mut updates: Subscription,
    mut printer: Printer,
) -> Result<Phase> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut last = None;

    loop {
        tokio::select! {
            snapshot = updates.next() => {
                let Some(snapshot) = snapshot else { break };
                if let Some(line) = printer.render(&snapshot, Local::now())? {
                    println!("{}", line);
                }
                last = Some(snapshot.phase);
            }
            signal = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        relay_info!("Interrupted, cancelling job");
                        orchestrator.cancel();
                    }
                    Err(err) => relay_warn!("Could not listen for Ctrl-C: {}", err),
                }
            }
        }
    }

    match last {
        Some(phase) if phase.is_terminal() => Ok(phase),
        _ => bail!("Job updates ended before the job finished"),
    }
}

fn exit_code(phase: Phase) -> ExitCode {
    if phase == Phase::Complete {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
