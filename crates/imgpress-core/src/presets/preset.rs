//! Named conversion templates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ConversionForm, TargetFormat};

/// A named set of conversion parameters.
///
/// Output directory and filename suffix are not part of a preset; they take
/// defaults when the preset is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub format: TargetFormat,
    pub quality_percent: f64,
    pub resize_percent: f64,
    pub preserve_metadata: bool,
}

impl Preset {
    /// Build a preset with a fresh id from a form's parameters.
    pub fn from_form(
        name: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
        form: &ConversionForm,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), name, description, icon, form)
    }

    pub(crate) fn with_id(
        id: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
        form: &ConversionForm,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            icon: icon.into(),
            format: form.format,
            quality_percent: form.quality,
            resize_percent: form.resize_percent,
            preserve_metadata: form.preserve_metadata,
        }
    }

    /// The form this preset applies, writing into `output_directory`.
    pub fn make_form(&self, output_directory: &str) -> ConversionForm {
        ConversionForm {
            format: self.format,
            quality: self.quality_percent,
            preserve_metadata: self.preserve_metadata,
            resize_percent: self.resize_percent,
            output_directory_path: output_directory.to_string(),
            filename_suffix: String::new(),
        }
    }

    /// Presets shipped with the application. Not persisted, not editable.
    pub fn defaults() -> Vec<Preset> {
        vec![
            Self::builtin(
                1,
                "Shareable JPEG",
                "Best for websites",
                "sparkles",
                TargetFormat::Jpeg,
                75.0,
            ),
            Self::builtin(
                2,
                "Transparent PNG",
                "Best for logos",
                "layers",
                TargetFormat::Png,
                100.0,
            ),
            Self::builtin(
                3,
                "High-efficiency AVIF",
                "Modern devices",
                "leaf",
                TargetFormat::Avif,
                60.0,
            ),
        ]
    }

    /// Whether `id` names one of the shipped presets.
    pub fn is_builtin(id: Uuid) -> bool {
        Self::defaults().iter().any(|p| p.id == id)
    }

    fn builtin(
        n: u128,
        name: &str,
        description: &str,
        icon: &str,
        format: TargetFormat,
        quality_percent: f64,
    ) -> Self {
        Self {
            // Stable across launches so a selection can be remembered
            id: Uuid::from_u128(0x1a9b_7e55_0000_4000_8000_0000_0000_0000 | n),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            format,
            quality_percent,
            resize_percent: 100.0,
            preserve_metadata: true,
        }
    }
}
