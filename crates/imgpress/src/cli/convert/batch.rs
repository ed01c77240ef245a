//! Batch conversion: drop registration, live progress and keyboard controls.

use std::io::{BufRead, IsTerminal};

use imgpress_core::{
    ConversionOrchestrator, ConversionSummary, ImgPress, JobStatus, OrchestratorState,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

use super::report::{self, BatchReport};
use super::{ConvertArgs, SystemRevealer};

/// Register `args.inputs` as a drop and convert every image found.
pub async fn convert_batch(imgpress: ImgPress, args: &ConvertArgs) -> anyhow::Result<()> {
    let found = imgpress.register_drop(args.inputs.clone())?.await?;
    if found == 0 {
        let reason = imgpress
            .snapshot()
            .drop_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "No images found.".to_string());
        anyhow::bail!("{reason}\n\n  Hint: Check the paths and try again.");
    }
    tracing::info!("Found {} image(s) to convert", found);

    let run = imgpress.start_conversion()?;
    let progress = create_progress_bar(found as u64)?;
    if !args.no_controls && std::io::stdin().is_terminal() {
        spawn_keyboard_controls(imgpress.orchestrator().clone(), progress.clone());
        progress.println("  Type p, r or s and press Enter to pause, resume or stop.");
    }

    let summary = follow_run(&imgpress, run, &progress).await?;
    progress.finish_and_clear();

    let state = imgpress.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&BatchReport::from_state(&state))?);
    } else {
        report::print_table(&state);
    }

    match &summary {
        Some(summary) => report::print_summary(summary),
        None => {
            if let Some(message) = &state.status_message {
                eprintln!("  {message}");
            }
        }
    }

    if args.reveal && !imgpress.reveal_latest_output(&SystemRevealer) {
        tracing::warn!("Nothing was converted, so there is nothing to reveal");
    }

    if summary.is_none() && state.failed_count() > 0 {
        anyhow::bail!("None of the {} file(s) could be converted", state.failed_count());
    }
    Ok(())
}

/// Mirror state changes onto the bar until the run finishes. Ctrl-C asks
/// the run to stop after the file in flight.
async fn follow_run(
    imgpress: &ImgPress,
    mut run: JoinHandle<Option<ConversionSummary>>,
    progress: &ProgressBar,
) -> anyhow::Result<Option<ConversionSummary>> {
    let mut updates = imgpress.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            outcome = &mut run => return Ok(outcome?),
            Ok(()) = updates.changed() => {
                render(progress, &updates.borrow_and_update());
            }
            signal = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        progress.println("  Stopping after the current file…");
                        imgpress.stop_conversion();
                    }
                    Err(e) => tracing::warn!("Couldn't listen for Ctrl-C: {e}"),
                }
            }
        }
    }
}

fn render(progress: &ProgressBar, state: &OrchestratorState) {
    progress.set_length(state.jobs.len() as u64);
    progress.set_position((state.completed_count() + state.failed_count()) as u64);
    progress.set_message(progress_message(state));
}

/// Status line shown next to the bar.
fn progress_message(state: &OrchestratorState) -> String {
    let mut message = state.status_message.clone().unwrap_or_default();

    let current = state.jobs.iter().find_map(|job| match job.status() {
        JobStatus::InProgress(stage) => {
            Some((job.item.display_name.as_str(), stage.short_label()))
        }
        _ => None,
    });
    if let Some((name, stage)) = current {
        message.push_str(&format!(" {name} [{stage}]"));
    }

    if state.stop_requested {
        message.push_str(" (stopping)");
    } else if state.is_paused {
        message.push_str(" (paused)");
    }
    message
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Pause,
    Resume,
    Stop,
}

fn parse_control(line: &str) -> Option<Control> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(Control::Pause),
        "r" | "resume" => Some(Control::Resume),
        "s" | "stop" => Some(Control::Stop),
        _ => None,
    }
}

/// Read control commands from stdin on a plain thread; stdin reads block.
///
/// The thread is detached. After the run ends it stays parked in `lines()`
/// until the next line or process exit, and `convert` returns right after
/// the run, so nothing joins it.
fn spawn_keyboard_controls(orchestrator: ConversionOrchestrator, progress: ProgressBar) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if !orchestrator.is_active() {
                break;
            }
            match parse_control(&line) {
                Some(Control::Pause) => {
                    orchestrator.pause();
                    progress.println("  Paused before the next file. Type r to resume.");
                }
                Some(Control::Resume) => orchestrator.resume(),
                Some(Control::Stop) => {
                    orchestrator.stop();
                    progress.println("  Stopping after the current file…");
                }
                None => progress.println(format!("  Unknown command: {:?}", line.trim())),
            }
        }
    });
}

/// Create a progress bar for batch conversion.
fn create_progress_bar(total: u64) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("##-"),
    );
    pb.set_message("starting...");
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control() {
        assert_eq!(parse_control("p\n"), Some(Control::Pause));
        assert_eq!(parse_control("  RESUME "), Some(Control::Resume));
        assert_eq!(parse_control("s"), Some(Control::Stop));
        assert_eq!(parse_control("q"), None);
        assert_eq!(parse_control(""), None);
    }

    #[test]
    fn test_progress_message_flags() {
        let mut state = OrchestratorState {
            status_message: Some("Converting 1/3…".to_string()),
            ..Default::default()
        };
        assert_eq!(progress_message(&state), "Converting 1/3…");

        state.is_paused = true;
        assert_eq!(progress_message(&state), "Converting 1/3… (paused)");

        state.stop_requested = true;
        assert_eq!(progress_message(&state), "Converting 1/3… (stopping)");
    }

    #[test]
    fn test_progress_bar_template_is_valid() {
        let pb = create_progress_bar(3).unwrap();
        assert_eq!(pb.length(), Some(3));
    }
}
