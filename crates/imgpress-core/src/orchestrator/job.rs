//! Jobs and their status lifecycle.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::pipeline::MediaType;
use crate::types::{ConversionResult, ConversionStage};

/// One resolved candidate file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    /// Absolute path of the input
    pub path: PathBuf,

    /// File name shown to the user
    pub display_name: String,

    /// Detected media type, if detection succeeded
    pub media_type: Option<MediaType>,
}

impl InputItem {
    pub fn new(path: PathBuf, media_type: Option<MediaType>) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            path,
            display_name,
            media_type,
        }
    }

    /// Reverse-DNS identifier of the detected type.
    pub fn type_identifier(&self) -> Option<&'static str> {
        self.media_type.map(MediaType::identifier)
    }
}

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress(ConversionStage),
    Completed(ConversionResult),
    Failed(String),
}

impl JobStatus {
    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InProgress(_) => 1,
            Self::Completed(_) | Self::Failed(_) => 2,
        }
    }

    /// Whether moving to `next` keeps the lifecycle monotonic.
    ///
    /// Stage changes within `InProgress` are allowed; nothing leaves a
    /// terminal state.
    pub fn can_transition_to(&self, next: &JobStatus) -> bool {
        match (self, next) {
            (Self::InProgress(_), Self::InProgress(_)) => true,
            _ => next.rank() > self.rank(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress(stage) => stage.label(),
            Self::Completed(_) => "Completed",
            Self::Failed(_) => "Failed",
        }
    }
}

/// One file's unit of work within a drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub item: InputItem,
    status: JobStatus,
}

impl Job {
    pub fn new(item: InputItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            item,
            status: JobStatus::Pending,
        }
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    /// Move to `next`, refusing regressions. Returns whether the status changed.
    pub(crate) fn advance(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(&next) {
            tracing::warn!(
                "Ignoring status regression for {}: {} -> {}",
                self.item.display_name,
                self.status.label(),
                next.label()
            );
            return false;
        }
        self.status = next;
        true
    }

    pub fn result(&self) -> Option<&ConversionResult> {
        match &self.status {
            JobStatus::Completed(result) => Some(result),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn completed() -> JobStatus {
        JobStatus::Completed(ConversionResult {
            original_size: 10,
            output_size: 5,
            output_path: PathBuf::from("/out/a.jpg"),
            duration: Duration::from_millis(5),
        })
    }

    fn job() -> Job {
        Job::new(InputItem::new(PathBuf::from("/in/a.jpg"), Some(MediaType::Jpeg)))
    }

    #[test]
    fn test_input_item_display_name_and_identifier() {
        let item = InputItem::new(PathBuf::from("/photos/IMG_001.CR2"), Some(MediaType::CanonCr2));
        assert_eq!(item.display_name, "IMG_001.CR2");
        assert_eq!(item.type_identifier(), Some("com.canon.cr2-raw-image"));
        assert_eq!(InputItem::new(PathBuf::from("/x"), None).type_identifier(), None);
    }

    #[test]
    fn test_job_ids_are_unique() {
        assert_ne!(job().id, job().id);
    }

    #[test]
    fn test_forward_transitions() {
        let mut job = job();
        assert!(job.advance(JobStatus::InProgress(ConversionStage::LoadingInput)));
        assert!(job.advance(JobStatus::InProgress(ConversionStage::WritingOutput)));
        assert!(job.advance(completed()));
        assert!(job.result().is_some());
    }

    #[test]
    fn test_pending_may_fail_directly() {
        assert!(JobStatus::Pending.can_transition_to(&JobStatus::Failed("x".into())));
    }

    #[test]
    fn test_regressions_are_refused() {
        let mut job = job();
        job.advance(JobStatus::InProgress(ConversionStage::LoadingInput));
        job.advance(completed());

        assert!(!job.advance(JobStatus::InProgress(ConversionStage::LoadingInput)));
        assert!(!job.advance(JobStatus::Pending));
        assert!(!job.advance(JobStatus::Failed("late".into())));
        assert_eq!(job.status(), &completed());
    }

    #[test]
    fn test_in_progress_cannot_return_to_pending() {
        let status = JobStatus::InProgress(ConversionStage::Resizing);
        assert!(!status.can_transition_to(&JobStatus::Pending));
        assert!(!status.is_terminal());
        assert!(JobStatus::Failed("x".into()).is_terminal());
    }
}
