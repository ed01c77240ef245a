//! Session setup: preset selection and per-run overrides.

use imgpress_core::{Config, ImgPress};

use super::ConvertArgs;

/// Build a session and shape its form from `args`.
///
/// The preset is applied first so explicit flags win over its values.
pub fn setup_session(args: &ConvertArgs, config: Config) -> anyhow::Result<ImgPress> {
    let imgpress = ImgPress::new(config);

    if let Some(name) = &args.preset {
        let Some(preset) = imgpress.find_preset_by_name(name) else {
            let names: Vec<String> = imgpress.presets().into_iter().map(|p| p.name).collect();
            anyhow::bail!(
                "Unknown preset: {name:?}\n\n  Available presets: {}",
                names.join(", ")
            );
        };
        imgpress.select_preset(preset.id);
    }

    apply_overrides(&imgpress, args);

    let form = imgpress.snapshot().form;
    tracing::debug!(
        "Converting to {} at quality {}, resize {}%, metadata {}",
        form.format,
        form.quality,
        form.resize_percent,
        if form.preserve_metadata { "kept" } else { "stripped" }
    );
    Ok(imgpress)
}

fn apply_overrides(imgpress: &ImgPress, args: &ConvertArgs) {
    imgpress.update_form(|form| {
        if let Some(format) = args.format {
            form.format = format;
        }
        if let Some(quality) = args.quality {
            form.quality = f64::from(quality);
        }
        if let Some(resize) = args.resize {
            form.resize_percent = f64::from(resize);
        }
        if args.no_metadata {
            form.preserve_metadata = false;
        }
        if let Some(suffix) = &args.suffix {
            form.filename_suffix = suffix.clone();
        }
    });
    if let Some(dir) = &args.output_dir {
        imgpress.set_output_directory(dir.clone());
    }
}
