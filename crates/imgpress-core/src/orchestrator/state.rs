//! Observable orchestrator state.

use std::path::Path;
use uuid::Uuid;

use super::job::{Job, JobStatus};
use crate::error::DropError;
use crate::types::{ConversionForm, ConversionResult, ConversionSummary};

/// Everything a presentation layer renders, published as one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestratorState {
    /// Jobs of the current drop, in discovery order
    pub jobs: Vec<Job>,

    /// Form the next run will snapshot
    pub form: ConversionForm,

    /// Preset the form was last taken from
    pub selected_preset: Option<Uuid>,

    /// Set when a drop yielded nothing usable
    pub drop_error: Option<DropError>,

    pub is_importing: bool,
    pub import_found_count: usize,
    pub import_status_message: Option<String>,

    /// "Converting N/M…" during a run, the outcome afterwards
    pub status_message: Option<String>,

    /// Most recent successful conversion
    pub last_result: Option<ConversionResult>,

    /// Aggregate of the last run, only if something completed
    pub summary: Option<ConversionSummary>,

    pub is_converting: bool,
    pub is_paused: bool,
    pub stop_requested: bool,
}

impl OrchestratorState {
    pub fn job(&self, id: Uuid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub(crate) fn job_mut(&mut self, id: Uuid) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.count(JobStatus::is_pending)
    }

    pub fn completed_count(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Completed(_)))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Failed(_)))
    }

    /// Output path of the latest completed conversion.
    pub fn latest_output_path(&self) -> Option<&Path> {
        self.last_result.as_ref().map(|r| r.output_path.as_path())
    }

    fn count(&self, predicate: impl Fn(&JobStatus) -> bool) -> usize {
        self.jobs.iter().filter(|j| predicate(j.status())).count()
    }
}
