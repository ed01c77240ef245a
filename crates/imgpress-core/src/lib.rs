//! ImgPress Core - batch image conversion library.
//!
//! ImgPress takes a drop of files and folders, keeps the convertible images
//! as jobs, and converts them one after another to a target format, quality
//! and size while reporting live progress and before/after statistics.
//!
//! # Architecture
//!
//! ```text
//! Drop → Discover → Validate → Jobs → Orchestrator → Engine (per file) → Summary
//! ```
//!
//! [`ImgPress`] is the command/query surface a front end talks to. It wires
//! the [`ConversionOrchestrator`] to the preset store and the thumbnail
//! cache.
//!
//! # Usage
//!
//! ```rust,ignore
//! use imgpress_core::{Config, ImgPress};
//!
//! #[tokio::main]
//! async fn main() -> imgpress_core::Result<()> {
//!     let imgpress = ImgPress::new(Config::load()?);
//!
//!     imgpress.register_drop(vec!["./photos".into()])?.await.ok();
//!     if let Ok(Some(summary)) = imgpress.start_conversion()?.await {
//!         println!("Saved {} bytes", -summary.total_size_delta());
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod presets;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{
    ConfigError, ConversionError, ConversionOutcome, DropError, ImgPressError,
    OrchestratorError, Result, StoreError,
};
pub use orchestrator::{
    ConversionOrchestrator, InputItem, Job, JobStatus, OrchestratorState, PathRevealer,
};
pub use pipeline::{
    ConversionEngine, ImageTranscoder, MediaType, NativeTranscoder, ThumbnailCache,
};
pub use presets::{FileStore, KeyValueStore, MemoryStore, Preset, PresetStore};
pub use types::{
    ConversionForm, ConversionResult, ConversionStage, ConversionSummary, TargetFormat,
};

use image::DynamicImage;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ImgPress session - the main entry point for front ends.
pub struct ImgPress {
    config: Config,
    orchestrator: ConversionOrchestrator,
    presets: Mutex<PresetStore>,
    thumbnails: Arc<ThumbnailCache>,
    transcoder: Arc<dyn ImageTranscoder>,
}

impl ImgPress {
    /// Create a session with the native transcoder and on-disk presets.
    pub fn new(config: Config) -> Self {
        let storage = FileStore::new(config.presets_dir());
        Self::with_components(config, Arc::new(NativeTranscoder::new()), Box::new(storage))
    }

    /// Create a session from the config file at its default location.
    pub fn with_defaults() -> Result<Self> {
        let config = Config::load()?;
        Ok(Self::new(config))
    }

    /// Create a session with an explicit transcoder and preset storage.
    pub fn with_components(
        config: Config,
        transcoder: Arc<dyn ImageTranscoder>,
        storage: Box<dyn KeyValueStore>,
    ) -> Self {
        tracing::debug!(
            "Initializing ImgPress v{} ({} transcoder)",
            VERSION,
            transcoder.name()
        );

        let store = PresetStore::load(storage);
        let thumbnails = Arc::new(ThumbnailCache::new(&config.thumbnail));
        let orchestrator = ConversionOrchestrator::new(
            ConversionEngine::new(Arc::clone(&transcoder)),
            Arc::clone(&thumbnails),
            config.import.batch_size,
            config.conversion.output_dir.clone(),
            config.conversion.default_form(),
        );

        // First custom preset when auto-apply is on, else the first shipped one
        let initial = match store.presets().first() {
            Some(first) if store.auto_apply() => Some(first.clone()),
            _ => Preset::defaults().into_iter().next(),
        };
        if let Some(preset) = initial {
            orchestrator.apply_preset(&preset);
        }
        let suffix = &config.conversion.filename_suffix;
        if !suffix.is_empty() {
            orchestrator.update_form(|form| form.filename_suffix = suffix.clone());
        }

        Self {
            config,
            orchestrator,
            presets: Mutex::new(store),
            thumbnails,
            transcoder,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &ConversionOrchestrator {
        &self.orchestrator
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.orchestrator.subscribe()
    }

    pub fn snapshot(&self) -> OrchestratorState {
        self.orchestrator.snapshot()
    }

    // -- Presets --

    fn store(&self) -> MutexGuard<'_, PresetStore> {
        self.presets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shipped presets followed by user presets.
    pub fn presets(&self) -> Vec<Preset> {
        let mut all = Preset::defaults();
        all.extend(self.store().presets().iter().cloned());
        all
    }

    pub fn find_preset(&self, id: Uuid) -> Option<Preset> {
        self.presets().into_iter().find(|p| p.id == id)
    }

    /// Find a preset by case-insensitive name, shipped presets first.
    pub fn find_preset_by_name(&self, name: &str) -> Option<Preset> {
        self.presets()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Apply the preset with `id`. Returns `false` if it is unknown or
    /// already selected.
    pub fn select_preset(&self, id: Uuid) -> bool {
        match self.find_preset(id) {
            Some(preset) => self.orchestrator.apply_preset(&preset),
            None => false,
        }
    }

    /// Run `f` with exclusive access to the user preset store.
    pub fn with_presets<R>(&self, f: impl FnOnce(&mut PresetStore) -> R) -> R {
        f(&mut self.store())
    }

    // -- Commands --

    pub fn register_drop(
        &self,
        inputs: Vec<String>,
    ) -> std::result::Result<JoinHandle<usize>, OrchestratorError> {
        self.orchestrator.register_drop(inputs)
    }

    pub fn start_conversion(
        &self,
    ) -> std::result::Result<JoinHandle<Option<ConversionSummary>>, OrchestratorError> {
        self.orchestrator.start_conversion()
    }

    pub fn pause_conversion(&self) {
        self.orchestrator.pause();
    }

    pub fn resume_conversion(&self) {
        self.orchestrator.resume();
    }

    pub fn stop_conversion(&self) {
        self.orchestrator.stop();
    }

    pub fn set_output_directory(&self, path: impl Into<String>) {
        self.orchestrator.set_output_directory(path);
    }

    pub fn update_form(&self, edit: impl FnOnce(&mut ConversionForm)) {
        self.orchestrator.update_form(edit);
    }

    /// Convert one file outside the batch, reporting each stage.
    pub fn convert_file(
        &self,
        path: &Path,
        progress: Option<&dyn Fn(ConversionStage)>,
    ) -> Result<ConversionResult> {
        let item = InputItem::new(path.to_path_buf(), MediaType::detect(path));
        let form = self.snapshot().form;
        let result = self
            .orchestrator
            .engine()
            .convert_with_progress(&item, &form, progress)?;
        Ok(result)
    }

    // -- Queries --

    /// Preview of `path` at the configured size, cached on success.
    pub fn thumbnail(&self, path: &Path) -> Option<Arc<DynamicImage>> {
        self.thumbnails.thumbnail(path, self.transcoder.as_ref())
    }

    pub fn reveal_latest_output(&self, revealer: &dyn PathRevealer) -> bool {
        self.orchestrator.reveal_latest_output(revealer)
    }
}
