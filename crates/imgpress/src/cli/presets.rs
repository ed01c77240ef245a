//! The `imgpress presets` command for managing saved presets.
//!
//! Shipped presets are listed alongside saved ones but can't be edited,
//! deleted or moved.

use clap::{Args, Subcommand, ValueEnum};
use dialoguer::Confirm;
use imgpress_core::{Config, ConversionForm, FileStore, Preset, PresetStore, TargetFormat};
use uuid::Uuid;

use super::convert::parse_format;

/// Arguments for the `presets` command.
#[derive(Args, Debug)]
pub struct PresetsArgs {
    #[command(subcommand)]
    pub command: PresetsCommand,
}

/// Subcommands for preset management.
#[derive(Subcommand, Debug)]
pub enum PresetsCommand {
    /// List shipped and saved presets
    List,

    /// Show one preset in detail
    Show {
        /// Preset name or id
        preset: String,
    },

    /// Save a new preset
    Create {
        /// Name of the new preset
        name: String,

        #[command(flatten)]
        fields: PresetFields,
    },

    /// Change a saved preset
    Update {
        /// Preset name or id
        preset: String,

        /// New name
        #[arg(long)]
        rename: Option<String>,

        #[command(flatten)]
        fields: PresetFields,
    },

    /// Delete one or more saved presets
    Delete {
        /// Preset names or ids
        #[arg(required = true)]
        presets: Vec<String>,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Move saved presets to a new position
    Move {
        /// Preset names or ids, moved together in list order
        #[arg(required = true)]
        presets: Vec<String>,

        /// 1-based position among saved presets to move in front of;
        /// one past the last position moves to the end
        #[arg(long)]
        to: usize,
    },

    /// Start new sessions with the first saved preset
    AutoApply {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

/// Preset parameters settable from the command line.
#[derive(Args, Debug, Default)]
pub struct PresetFields {
    /// Short description shown in listings
    #[arg(long)]
    pub description: Option<String>,

    /// Icon name
    #[arg(long)]
    pub icon: Option<String>,

    /// Target format: jpeg, png, webp or avif
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<TargetFormat>,

    /// Lossy quality, 0-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: Option<u8>,

    /// Resize percentage, 1-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub resize: Option<u8>,

    /// Keep EXIF metadata (true or false)
    #[arg(long, action = clap::ArgAction::Set)]
    pub metadata: Option<bool>,
}

impl PresetFields {
    fn apply(&self, form: &mut ConversionForm) {
        if let Some(format) = self.format {
            form.format = format;
        }
        if let Some(quality) = self.quality {
            form.quality = f64::from(quality);
        }
        if let Some(resize) = self.resize {
            form.resize_percent = f64::from(resize);
        }
        if let Some(metadata) = self.metadata {
            form.preserve_metadata = metadata;
        }
    }
}

/// Execute the presets command.
pub async fn execute(args: PresetsArgs, config: Config) -> anyhow::Result<()> {
    let mut store = PresetStore::load(Box::new(FileStore::new(config.presets_dir())));

    match args.command {
        PresetsCommand::List => print_list(&store),

        PresetsCommand::Show { preset } => {
            let preset = find_any(&store, &preset)?;
            println!("{}", serde_json::to_string_pretty(&preset)?);
        }

        PresetsCommand::Create { name, fields } => {
            let mut form = config.conversion.default_form();
            fields.apply(&mut form);
            let id = store.create(
                &name,
                fields.description.as_deref().unwrap_or_default(),
                fields.icon.as_deref().unwrap_or("photo"),
                &form,
            )?;
            tracing::info!("Created preset {name:?} ({id})");
            println!("{id}");
        }

        PresetsCommand::Update {
            preset,
            rename,
            fields,
        } => {
            let current = find_saved(&store, &preset)?;
            let mut form = current.make_form(&config.conversion.output_dir);
            fields.apply(&mut form);
            store.update(
                current.id,
                rename.as_deref().unwrap_or(&current.name),
                fields.description.as_deref().unwrap_or(&current.description),
                fields.icon.as_deref().unwrap_or(&current.icon),
                &form,
            )?;
            println!("Updated {:?}", rename.unwrap_or(current.name));
        }

        PresetsCommand::Delete { presets, yes } => {
            let targets = presets
                .iter()
                .map(|reference| find_saved(&store, reference))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let names: Vec<&str> = targets.iter().map(|p| p.name.as_str()).collect();

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete {}?", names.join(", ")))
                    .default(false)
                    .interact_opt()?;
                if confirmed != Some(true) {
                    eprintln!("Nothing deleted.");
                    return Ok(());
                }
            }

            let ids: Vec<Uuid> = targets.iter().map(|p| p.id).collect();
            let removed = store.delete_many(&ids)?;
            println!("Deleted {removed} preset(s)");
        }

        PresetsCommand::Move { presets, to } => {
            let indices = presets
                .iter()
                .map(|reference| saved_index(&store, reference))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let destination = destination_index(to, store.presets().len())?;
            store.reorder(&indices, destination)?;
            print_list(&store);
        }

        PresetsCommand::AutoApply { state } => {
            store.set_auto_apply(state == Toggle::On)?;
            println!(
                "Auto-apply {}",
                if store.auto_apply() { "on" } else { "off" }
            );
        }
    }

    Ok(())
}

fn print_list(store: &PresetStore) {
    println!("  Shipped:");
    for preset in Preset::defaults() {
        println!("    -  {}", describe(&preset));
    }

    println!("  Saved (auto-apply {}):", if store.auto_apply() { "on" } else { "off" });
    if store.presets().is_empty() {
        println!("    (none)");
    }
    for (i, preset) in store.presets().iter().enumerate() {
        println!("    {:>2} {}", i + 1, describe(preset));
    }
}

fn describe(preset: &Preset) -> String {
    let mut line = format!(
        "{:<24} {:<5} q{:<3}",
        preset.name,
        preset.format.display_name(),
        preset.quality_percent.round() as i64
    );
    if preset.resize_percent != 100.0 {
        line.push_str(&format!(" {}%", preset.resize_percent.round() as i64));
    }
    if !preset.preserve_metadata {
        line.push_str(" no-exif");
    }
    if !preset.description.is_empty() {
        line.push_str(&format!("  {}", preset.description));
    }
    line
}

fn matches(preset: &Preset, reference: &str) -> bool {
    match Uuid::parse_str(reference) {
        Ok(id) => preset.id == id,
        Err(_) => preset.name.eq_ignore_ascii_case(reference),
    }
}

/// Find a shipped or saved preset by name or id.
fn find_any(store: &PresetStore, reference: &str) -> anyhow::Result<Preset> {
    Preset::defaults()
        .into_iter()
        .chain(store.presets().iter().cloned())
        .find(|p| matches(p, reference))
        .ok_or_else(|| anyhow::anyhow!("No preset named {reference:?}"))
}

/// Find a saved preset, rejecting shipped ones.
fn find_saved(store: &PresetStore, reference: &str) -> anyhow::Result<Preset> {
    let index = saved_index(store, reference)?;
    Ok(store.presets()[index].clone())
}

fn saved_index(store: &PresetStore, reference: &str) -> anyhow::Result<usize> {
    if let Some(index) = store.presets().iter().position(|p| matches(p, reference)) {
        return Ok(index);
    }
    if Preset::defaults().iter().any(|p| matches(p, reference)) {
        anyhow::bail!("{reference:?} is a shipped preset and can't be changed");
    }
    anyhow::bail!("No saved preset named {reference:?}")
}

/// Convert a 1-based position into the store's destination index.
fn destination_index(position: usize, len: usize) -> anyhow::Result<usize> {
    if position == 0 || position > len + 1 {
        anyhow::bail!("Position must be between 1 and {}", len + 1);
    }
    Ok(position - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgpress_core::MemoryStore;

    fn store_with(names: &[&str]) -> PresetStore {
        let mut store = PresetStore::load(Box::new(MemoryStore::new()));
        for name in names {
            store
                .create(name, "", "photo", &ConversionForm::default())
                .unwrap();
        }
        store
    }

    #[test]
    fn test_fields_apply_only_given_values() {
        let fields = PresetFields {
            quality: Some(55),
            metadata: Some(false),
            ..Default::default()
        };
        let mut form = ConversionForm::default();
        fields.apply(&mut form);

        assert_eq!(form.quality, 55.0);
        assert!(!form.preserve_metadata);
        assert_eq!(form.format, TargetFormat::Jpeg);
        assert_eq!(form.resize_percent, 100.0);
    }

    #[test]
    fn test_find_by_name_or_id() {
        let store = store_with(&["Web", "Print"]);
        let print = store.presets()[1].clone();

        assert_eq!(find_any(&store, "print").unwrap().id, print.id);
        assert_eq!(find_any(&store, &print.id.to_string()).unwrap().id, print.id);
        assert_eq!(find_any(&store, "Shareable JPEG").unwrap().name, "Shareable JPEG");
        assert!(find_any(&store, "missing").is_err());
    }

    #[test]
    fn test_shipped_presets_are_not_editable() {
        let store = store_with(&["Web"]);
        let err = find_saved(&store, "Transparent PNG").unwrap_err();
        assert!(err.to_string().contains("shipped"));
        assert_eq!(saved_index(&store, "web").unwrap(), 0);
    }

    #[test]
    fn test_destination_index_bounds() {
        assert_eq!(destination_index(1, 3).unwrap(), 0);
        assert_eq!(destination_index(4, 3).unwrap(), 3);
        assert!(destination_index(0, 3).is_err());
        assert!(destination_index(5, 3).is_err());
    }

    #[test]
    fn test_move_to_front_by_name() {
        let mut store = store_with(&["A", "B", "C"]);
        let indices = vec![saved_index(&store, "C").unwrap()];
        store.reorder(&indices, destination_index(1, 3).unwrap()).unwrap();

        let names: Vec<&str> = store.presets().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["C", "A", "B"]);
    }

    #[test]
    fn test_describe_marks_resize_and_metadata() {
        let mut form = ConversionForm::default();
        form.resize_percent = 50.0;
        form.preserve_metadata = false;
        let preset = Preset::from_form("Half", "", "photo", &form);

        let line = describe(&preset);
        assert!(line.contains("50%"));
        assert!(line.contains("no-exif"));
    }
}
