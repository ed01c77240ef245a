//! The `imgpress convert` command.

mod batch;
mod report;
mod setup;

use std::path::{Path, PathBuf};

use clap::Args;
use imgpress_core::{Config, ConversionStage, PathRevealer, TargetFormat};

use batch::convert_batch;
use setup::setup_session;

/// Arguments for the `convert` command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Image files, folders or file:// URLs to convert
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Preset to start from, by name (see `imgpress presets list`)
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Target format: jpeg, png, webp or avif
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<TargetFormat>,

    /// Lossy quality, 0-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: Option<u8>,

    /// Scale the longest edge to this percentage, 1-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub resize: Option<u8>,

    /// Strip EXIF metadata from outputs
    #[arg(long)]
    pub no_metadata: bool,

    /// Directory converted files are written to
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Appended to each output file's base name
    #[arg(long)]
    pub suffix: Option<String>,

    /// Open the latest output in the file browser when done
    #[arg(long)]
    pub reveal: bool,

    /// Don't read pause/resume/stop commands from stdin
    #[arg(long)]
    pub no_controls: bool,

    /// Print per-file results and the summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

pub(crate) fn parse_format(s: &str) -> Result<TargetFormat, String> {
    TargetFormat::parse(s).ok_or_else(|| format!("unknown format '{s}' (jpeg, png, webp, avif)"))
}

/// Execute the convert command.
pub async fn execute(args: ConvertArgs, config: Config) -> anyhow::Result<()> {
    let imgpress = setup_session(&args, config)?;

    match single_file(&args.inputs) {
        Some(path) => convert_single(&imgpress, &path, &args),
        None => convert_batch(imgpress, &args).await,
    }
}

/// The input path when exactly one regular file was given.
fn single_file(inputs: &[String]) -> Option<PathBuf> {
    match inputs {
        [only] if !only.contains("://") && Path::new(only).is_file() => Some(PathBuf::from(only)),
        _ => None,
    }
}

// ── Single-file conversion ─────────────────────────────────────────────────

fn convert_single(
    imgpress: &imgpress_core::ImgPress,
    path: &Path,
    args: &ConvertArgs,
) -> anyhow::Result<()> {
    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    let on_stage: &dyn Fn(ConversionStage) = &|stage| spinner.set_message(stage.label());

    let outcome = imgpress.convert_file(path, Some(on_stage));
    spinner.finish_and_clear();
    let result = outcome?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "{} -> {}  {}",
            path.display(),
            result.output_path.display(),
            report::size_change(result.original_size, result.output_size)
        );
    }
    if args.reveal {
        SystemRevealer.reveal(&result.output_path);
    }
    Ok(())
}

/// Opens paths with the platform's default file browser.
pub(crate) struct SystemRevealer;

impl PathRevealer for SystemRevealer {
    fn reveal(&self, path: &Path) {
        let mut command = if cfg!(target_os = "macos") {
            let mut open = std::process::Command::new("open");
            open.arg("-R").arg(path);
            open
        } else if cfg!(target_os = "windows") {
            let mut explorer = std::process::Command::new("explorer");
            explorer.arg(format!("/select,{}", path.display()));
            explorer
        } else {
            // xdg-open can't select a file, so open its folder
            let mut xdg = std::process::Command::new("xdg-open");
            xdg.arg(path.parent().unwrap_or(path));
            xdg
        };

        if let Err(e) = command.spawn() {
            tracing::warn!("Couldn't reveal {}: {e}", path.display());
        }
    }
}
