//! Batch conversion: the job list, drop registration and the run loop.
//!
//! All observable state lives in one [`OrchestratorState`] behind a
//! `watch::Sender`, mutated only by [`ConversionOrchestrator`] methods and
//! its worker tasks. Consumers call [`ConversionOrchestrator::subscribe`]
//! for change notifications or [`ConversionOrchestrator::snapshot`] for a
//! point-in-time copy.
//!
//! A run converts the pending jobs one at a time on a blocking thread, in
//! the order they were discovered. Pause and stop are observed between
//! jobs, never inside one.

mod job;
mod state;

pub use job::{InputItem, Job, JobStatus};
pub use state::OrchestratorState;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{ConversionError, DropError, OrchestratorError};
use crate::pipeline::{ConversionEngine, FileDiscovery, FileTypeValidator, ThumbnailCache};
use crate::presets::Preset;
use crate::types::{ConversionForm, ConversionStage, ConversionSummary};

/// Opens a path in the platform file browser.
pub trait PathRevealer: Send + Sync {
    fn reveal(&self, path: &Path);
}

/// Flags the run loop observes at job boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunControl {
    paused: bool,
    stop: bool,
}

struct Inner {
    engine: ConversionEngine,
    validator: FileTypeValidator,
    thumbnails: Arc<ThumbnailCache>,
    import_batch_size: usize,
    default_output_dir: String,
    state: watch::Sender<OrchestratorState>,
    control: watch::Sender<RunControl>,
    /// Bumped per drop so an outdated discovery stops publishing
    generation: AtomicU64,
}

/// Owns the job list and drives batch runs.
///
/// Cheap to clone; clones share state. Methods that start background work
/// must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct ConversionOrchestrator {
    inner: Arc<Inner>,
}

impl ConversionOrchestrator {
    pub fn new(
        engine: ConversionEngine,
        thumbnails: Arc<ThumbnailCache>,
        import_batch_size: usize,
        default_output_dir: impl Into<String>,
        initial_form: ConversionForm,
    ) -> Self {
        let (state, _) = watch::channel(OrchestratorState {
            form: initial_form,
            ..OrchestratorState::default()
        });
        let (control, _) = watch::channel(RunControl::default());

        Self {
            inner: Arc::new(Inner {
                engine,
                validator: FileTypeValidator::default(),
                thumbnails,
                import_batch_size: import_batch_size.max(1),
                default_output_dir: default_output_dir.into(),
                state,
                control,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Receive a notification on every state change.
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> OrchestratorState {
        self.inner.state.borrow().clone()
    }

    /// Whether a run is converting or paused.
    pub fn is_active(&self) -> bool {
        self.inner.state.borrow().is_converting
    }

    pub fn engine(&self) -> &ConversionEngine {
        &self.inner.engine
    }

    // -- Form and presets --

    pub fn update_form(&self, edit: impl FnOnce(&mut ConversionForm)) {
        self.inner.state.send_modify(|s| edit(&mut s.form));
    }

    pub fn set_output_directory(&self, path: impl Into<String>) {
        let path = path.into();
        self.update_form(|form| form.output_directory_path = path);
    }

    /// Replace the form with `preset`'s. Returns `false` without touching
    /// the form when `preset` is already selected, so manual edits survive.
    pub fn apply_preset(&self, preset: &Preset) -> bool {
        let default_dir = &self.inner.default_output_dir;
        self.inner.state.send_if_modified(|s| {
            if s.selected_preset == Some(preset.id) {
                return false;
            }
            s.selected_preset = Some(preset.id);
            s.form = preset.make_form(default_dir);
            true
        })
    }

    // -- Drops --

    /// Replace the job list with the acceptable files under `inputs`.
    ///
    /// Entries may be plain paths or `file://` URLs. Discovery runs on a
    /// blocking thread and appends jobs in chunks; the handle resolves to
    /// the number of jobs found. Rejected while a run is active.
    pub fn register_drop(
        &self,
        inputs: Vec<String>,
    ) -> Result<JoinHandle<usize>, OrchestratorError> {
        if self.is_active() {
            return Err(OrchestratorError::AlreadyRunning);
        }

        self.inner.thumbnails.clear();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|s| {
            s.jobs.clear();
            s.drop_error = None;
            s.is_importing = true;
            s.import_found_count = 0;
            s.import_status_message = Some("Scanning…".to_string());
            s.status_message = None;
            s.last_result = None;
            s.summary = None;
        });
        tracing::debug!("Registering drop of {} input(s)", inputs.len());

        let inner = Arc::clone(&self.inner);
        Ok(tokio::task::spawn_blocking(move || inner.import(inputs, generation)))
    }

    // -- Runs --

    /// Start converting every pending job with a copy of the current form.
    ///
    /// The handle resolves to the run's summary, `None` if nothing
    /// completed.
    pub fn start_conversion(
        &self,
    ) -> Result<JoinHandle<Option<ConversionSummary>>, OrchestratorError> {
        let mut rejected = None;
        let mut snapshot = None;

        self.inner.state.send_if_modified(|s| {
            if s.is_converting {
                rejected = Some(OrchestratorError::AlreadyRunning);
                return false;
            }
            let jobs: Vec<(Uuid, InputItem)> = s
                .jobs
                .iter()
                .filter(|j| j.status().is_pending())
                .map(|j| (j.id, j.item.clone()))
                .collect();
            if jobs.is_empty() {
                s.drop_error = Some(DropError::NoUsableFiles);
                rejected = Some(DropError::NoUsableFiles.into());
                return true;
            }

            s.is_converting = true;
            s.is_paused = false;
            s.stop_requested = false;
            s.status_message = Some(format!("Converting 0/{}…", jobs.len()));
            s.last_result = None;
            s.summary = None;
            self.inner.control.send_replace(RunControl::default());
            snapshot = Some((jobs, s.form.clone()));
            true
        });

        if let Some(err) = rejected {
            return Err(err);
        }
        let Some((jobs, form)) = snapshot else {
            return Err(OrchestratorError::AlreadyRunning);
        };

        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(async move { inner.run(jobs, form).await }))
    }

    /// Hold the run before its next job. No-op when idle.
    pub fn pause(&self) {
        self.signal_run(|c| c.paused = true, |s| s.is_paused = true);
    }

    /// No-op when idle.
    pub fn resume(&self) {
        self.signal_run(|c| c.paused = false, |s| s.is_paused = false);
    }

    /// End the run before its next job, waking it if paused. No-op when idle.
    pub fn stop(&self) {
        self.signal_run(
            |c| {
                c.stop = true;
                c.paused = false;
            },
            |s| {
                s.stop_requested = true;
                s.is_paused = false;
            },
        );
    }

    /// Apply a control change while a run is active. The activity check and
    /// both writes happen under the state lock, so a run that is finishing
    /// can't have its reset overwritten.
    fn signal_run(
        &self,
        control: impl FnOnce(&mut RunControl),
        state: impl FnOnce(&mut OrchestratorState),
    ) {
        let inner = &self.inner;
        inner.state.send_if_modified(|s| {
            if !s.is_converting {
                return false;
            }
            inner.control.send_modify(control);
            state(s);
            true
        });
    }

    pub fn latest_output_path(&self) -> Option<PathBuf> {
        self.inner
            .state
            .borrow()
            .latest_output_path()
            .map(Path::to_path_buf)
    }

    /// Reveal the latest output. Returns `false` if nothing was converted yet.
    pub fn reveal_latest_output(&self, revealer: &dyn PathRevealer) -> bool {
        match self.latest_output_path() {
            Some(path) => {
                revealer.reveal(&path);
                true
            }
            None => false,
        }
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Discover and validate a drop, publishing jobs in chunks.
    fn import(&self, inputs: Vec<String>, generation: u64) -> usize {
        let paths: Vec<PathBuf> = inputs
            .iter()
            .filter_map(|raw| {
                let local = FileTypeValidator::local_path(raw);
                if local.is_none() {
                    tracing::debug!("Skipping non-local drop input {}", raw);
                }
                local
            })
            .collect();
        let candidates = FileDiscovery::flatten(&paths);

        let mut chunk = Vec::new();
        let mut found = 0;
        for path in candidates {
            if !self.is_current(generation) {
                tracing::debug!("Drop superseded after {} file(s)", found);
                return found;
            }
            let Some(media_type) = self.validator.accepted_type(&path) else {
                tracing::trace!("Rejected {:?}", path);
                continue;
            };
            chunk.push(Job::new(InputItem::new(path, Some(media_type))));
            found += 1;

            if found % self.import_batch_size == 0 {
                let jobs = std::mem::take(&mut chunk);
                self.state.send_if_modified(|s| {
                    if !self.is_current(generation) {
                        return false;
                    }
                    s.jobs.extend(jobs);
                    s.import_found_count = found;
                    s.import_status_message = Some(format!("Found {found} image(s)…"));
                    true
                });
            }
        }

        self.state.send_if_modified(|s| {
            if !self.is_current(generation) {
                return false;
            }
            s.jobs.extend(chunk);
            s.import_found_count = found;
            s.is_importing = false;
            if found == 0 {
                s.drop_error = Some(DropError::NoUsableFiles);
                s.import_status_message = None;
            } else {
                s.import_status_message = Some(format!("Ready: {found} image(s)"));
            }
            true
        });
        tracing::info!("Drop ready: {} image(s)", found);
        found
    }

    fn set_status(&self, id: Uuid, status: JobStatus) {
        self.state.send_modify(|s| {
            if let Some(job) = s.job_mut(id) {
                job.advance(status);
            }
        });
    }

    async fn run(
        self: Arc<Self>,
        jobs: Vec<(Uuid, InputItem)>,
        form: ConversionForm,
    ) -> Option<ConversionSummary> {
        let total = jobs.len();
        let start = Instant::now();
        let mut control = self.control.subscribe();
        let mut completed = 0usize;
        let mut failed = 0usize;
        let mut total_original_size = 0u64;
        let mut total_output_size = 0u64;

        tracing::info!("Converting {} file(s) to {}", total, form.format);

        for (id, item) in jobs {
            if control.borrow_and_update().stop {
                break;
            }
            if control.borrow_and_update().paused {
                tracing::debug!("Paused before {}", item.display_name);
                if control.wait_for(|c| !c.paused || c.stop).await.is_err() {
                    break;
                }
            }
            if control.borrow_and_update().stop {
                break;
            }

            self.set_status(id, JobStatus::InProgress(ConversionStage::LoadingInput));

            let engine = self.engine.clone();
            let job_form = form.clone();
            let job_item = item.clone();
            let outcome =
                tokio::task::spawn_blocking(move || engine.convert(&job_item, &job_form))
                    .await
                    .unwrap_or_else(|e| {
                        Err(ConversionError::ConversionFailed {
                            path: item.path.clone(),
                            message: format!("Conversion task failed: {e}"),
                        })
                    });

            match outcome {
                Ok(result) => {
                    completed += 1;
                    total_original_size += result.original_size;
                    total_output_size += result.output_size;
                    self.state.send_modify(|s| {
                        if let Some(job) = s.job_mut(id) {
                            job.advance(JobStatus::Completed(result.clone()));
                        }
                        s.last_result = Some(result);
                    });
                }
                Err(e) => {
                    failed += 1;
                    tracing::debug!("{} failed: {}", item.display_name, e);
                    self.set_status(id, JobStatus::Failed(e.to_string()));
                }
            }

            self.state.send_modify(|s| {
                s.status_message = Some(format!("Converting {}/{}…", completed + failed, total));
            });
        }

        let duration = start.elapsed();
        let stopped = self.control.borrow().stop;
        let message = if stopped {
            format!(
                "Stopped: {} completed, {} skipped",
                completed,
                total - completed - failed
            )
        } else if failed > 0 {
            format!("Completed {completed}, failed {failed}")
        } else {
            format!("Completed all {completed} file(s)")
        };

        let summary = (completed > 0).then(|| ConversionSummary {
            total_files: total,
            completed_count: completed,
            failed_count: failed,
            total_original_size,
            total_output_size,
            duration,
        });

        self.state.send_modify(|s| {
            self.control.send_replace(RunControl::default());
            s.status_message = Some(message.clone());
            s.summary = summary.clone();
            s.is_converting = false;
            s.is_paused = false;
            s.stop_requested = false;
        });
        tracing::info!("{} in {:?}", message, duration);

        summary
    }
}
