//! Explicit state of one analysis run: `Idle -> Running -> Succeeded | Failed`.

use crate::error::{Result, UnloopError};
use crate::reconcile::ReconciliationResult;
use crate::types::{Profile, RelationCollection, SubjectId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running {
        subject: SubjectId,
        started_at: DateTime<Utc>,
    },
    Succeeded {
        subject: SubjectId,
        finished_at: DateTime<Utc>,
    },
    Failed {
        subject: SubjectId,
        message: String,
    },
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running { .. } => "running",
            RunState::Succeeded { .. } => "succeeded",
            RunState::Failed { .. } => "failed",
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunArtifacts {
    pub profile: Option<Profile>,
    pub following: RelationCollection,
    pub followers: RelationCollection,
    pub result: ReconciliationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRun {
    state: RunState,
    profile: Option<Profile>,
    following: Option<RelationCollection>,
    followers: Option<RelationCollection>,
    result: ReconciliationResult,
}

impl Default for AnalysisRun {
    fn default() -> Self {
        Self::idle()
    }
}

impl AnalysisRun {
    pub fn idle() -> Self {
        Self {
            state: RunState::Idle,
            profile: None,
            following: None,
            followers: None,
            result: ReconciliationResult::default(),
        }
    }

    /// Begins a run for `subject`, discarding everything from the previous one.
    pub fn start(&mut self, subject: SubjectId) -> Result<()> {
        if let RunState::Running { subject, .. } = self.state {
            return Err(UnloopError::RunInProgress(subject.get()));
        }
        *self = Self::idle();
        self.state = RunState::Running {
            subject,
            started_at: Utc::now(),
        };
        Ok(())
    }

    pub fn succeed(&mut self, artifacts: RunArtifacts) -> Result<()> {
        let subject = self.running_subject("succeeded")?;
        self.profile = artifacts.profile;
        self.following = Some(artifacts.following);
        self.followers = Some(artifacts.followers);
        self.result = artifacts.result;
        self.state = RunState::Succeeded {
            subject,
            finished_at: Utc::now(),
        };
        Ok(())
    }

    /// Terminal failure. Derived lists are cleared; the profile is kept if one
    /// was resolved before the failure.
    pub fn fail(&mut self, profile: Option<Profile>, message: impl Into<String>) -> Result<()> {
        let subject = self.running_subject("failed")?;
        self.profile = profile;
        self.following = None;
        self.followers = None;
        self.result = ReconciliationResult::default();
        self.state = RunState::Failed {
            subject,
            message: message.into(),
        };
        Ok(())
    }

    fn running_subject(&self, to: &'static str) -> Result<SubjectId> {
        match self.state {
            RunState::Running { subject, .. } => Ok(subject),
            ref other => Err(UnloopError::InvalidTransition {
                from: other.name(),
                to,
            }),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running { .. })
    }

    pub fn subject(&self) -> Option<SubjectId> {
        match self.state {
            RunState::Idle => None,
            RunState::Running { subject, .. }
            | RunState::Succeeded { subject, .. }
            | RunState::Failed { subject, .. } => Some(subject),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            RunState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn following(&self) -> Option<&RelationCollection> {
        self.following.as_ref()
    }

    pub fn followers(&self) -> Option<&RelationCollection> {
        self.followers.as_ref()
    }

    pub fn result(&self) -> &ReconciliationResult {
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;
    use crate::types::{RelationDirection, UserRecord};

    fn subject(raw: u64) -> SubjectId {
        SubjectId::new(raw).unwrap()
    }

    fn artifacts() -> RunArtifacts {
        let following = vec![UserRecord::new(1, "a"), UserRecord::new(2, "b")];
        let followers = vec![UserRecord::new(2, "b")];
        RunArtifacts {
            profile: None,
            result: reconcile(&following, &followers),
            following: RelationCollection::from_records(RelationDirection::Following, following),
            followers: RelationCollection::from_records(RelationDirection::Followers, followers),
        }
    }

    #[test]
    fn happy_path_transitions() {
        let mut run = AnalysisRun::idle();
        run.start(subject(3)).unwrap();
        assert!(run.is_running());
        run.succeed(artifacts()).unwrap();

        assert_eq!(run.state().name(), "succeeded");
        assert_eq!(run.result().mutual.len(), 1);
        assert_eq!(run.following().map(|c| c.len()), Some(2));
    }

    #[test]
    fn rejects_reentrant_start() {
        let mut run = AnalysisRun::idle();
        run.start(subject(3)).unwrap();
        let err = run.start(subject(4)).unwrap_err();
        assert!(matches!(err, UnloopError::RunInProgress(3)));
    }

    #[test]
    fn new_run_discards_previous_result() {
        let mut run = AnalysisRun::idle();
        run.start(subject(3)).unwrap();
        run.succeed(artifacts()).unwrap();

        run.start(subject(9)).unwrap();
        assert!(run.result().is_empty());
        assert!(run.following().is_none());
        assert_eq!(run.subject(), Some(subject(9)));
    }

    #[test]
    fn failure_clears_lists() {
        let mut run = AnalysisRun::idle();
        run.start(subject(3)).unwrap();
        run.fail(None, "boom").unwrap();

        assert_eq!(run.error_message(), Some("boom"));
        assert!(run.result().mutual.is_empty());
        assert!(run.followers().is_none());
    }

    #[test]
    fn finishing_an_idle_run_is_invalid() {
        let mut run = AnalysisRun::idle();
        let err = run.succeed(artifacts()).unwrap_err();
        assert!(matches!(
            err,
            UnloopError::InvalidTransition {
                from: "idle",
                to: "succeeded"
            }
        ));
    }
}
