//! Runs one full analysis: profile lookup, following and followers
//! collection, then reconciliation.

use crate::api::SocialGraphApi;
use crate::collector::{Collector, CollectorOptions, NoProgress, Progress, ProgressSink};
use crate::envelope::decode_profile;
use crate::error::UpstreamError;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use unloop_core::{
    reconcile_with_recent, AnalysisRun, CollectionStatus, Profile, RelationCollection,
    RelationDirection, Result, RunArtifacts, SessionLog, SubjectId, UnloopConfig,
    RECENT_FOLLOWERS_LIMIT,
};

/// Owns the [`AnalysisRun`] and sequences every step of it.
///
/// Only one run is active at a time; [`Orchestrator::analyze`] rejects a
/// second call while the first is still running. A stale run can be stopped
/// with [`Orchestrator::cancel`].
pub struct Orchestrator {
    api: Arc<dyn SocialGraphApi>,
    options: CollectorOptions,
    recent_limit: usize,
    log: SessionLog,
    progress: Arc<dyn ProgressSink>,
    run: Mutex<AnalysisRun>,
    cancel: Mutex<Option<CancellationToken>>,
}

struct Failure {
    profile: Option<Profile>,
    message: String,
}

/// Settles a started run if the `analyze` future is dropped before finishing.
struct ActiveRun<'a> {
    orchestrator: &'a Orchestrator,
    token: CancellationToken,
    settled: bool,
}

impl ActiveRun<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.token.cancel();
        *self.orchestrator.cancel.lock() = None;

        let mut run = self.orchestrator.run.lock();
        if run.is_running() {
            warn!("Analysis future dropped before completion");
            self.orchestrator
                .log
                .error(format!("CRITICAL FAILURE: {}", ABORTED));
            if let Err(e) = run.fail(None, ABORTED) {
                error!(error = %e, "Could not settle aborted run");
            }
        }
    }
}

const ABORTED: &str = "Analysis aborted";

impl Orchestrator {
    pub fn new(api: Arc<dyn SocialGraphApi>, options: CollectorOptions) -> Self {
        Self {
            api,
            options,
            recent_limit: RECENT_FOLLOWERS_LIMIT,
            log: SessionLog::new(),
            progress: Arc::new(NoProgress),
            run: Mutex::new(AnalysisRun::idle()),
            cancel: Mutex::new(None),
        }
    }

    pub fn from_config(api: Arc<dyn SocialGraphApi>, config: &UnloopConfig) -> Self {
        Self::new(api, CollectorOptions::from(&config.collector))
            .with_recent_limit(config.recent_followers)
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_recent_limit(mut self, recent_limit: usize) -> Self {
        self.recent_limit = recent_limit;
        self
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    /// Read-only snapshot of the current run.
    pub fn snapshot(&self) -> AnalysisRun {
        self.run.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.run.lock().is_running()
    }

    /// Cancels the active run, if any. Returns whether there was one.
    pub fn cancel(&self) -> bool {
        match self.cancel.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Runs a complete analysis for `subject` and returns the finished run.
    ///
    /// The only error is [`unloop_core::UnloopError::RunInProgress`]; every
    /// other problem is recorded in the returned run (degraded collections or
    /// a `Failed` state).
    #[instrument(skip_all, fields(subject = subject.get()))]
    pub async fn analyze(&self, subject: SubjectId) -> Result<AnalysisRun> {
        let token = CancellationToken::new();
        {
            let mut run = self.run.lock();
            run.start(subject)?;
            *self.cancel.lock() = Some(token.clone());
        }
        let active = ActiveRun {
            orchestrator: self,
            token: token.clone(),
            settled: false,
        };

        self.log.clear();
        self.log
            .info(format!("Deep scan analysis started for FID: {}...", subject));

        let outcome = AssertUnwindSafe(self.execute(subject, &token))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(Failure {
                    profile: None,
                    message: panic_message(panic),
                })
            });

        *self.cancel.lock() = None;

        let mut run = self.run.lock();
        match outcome {
            Ok(artifacts) => {
                self.log.info(format!(
                    "Analysis complete! Mutuals: {}",
                    artifacts.result.mutual.len()
                ));
                run.succeed(artifacts)?;
            }
            Err(failure) => {
                error!(cause = %failure.message, "Analysis failed");
                self.log
                    .error(format!("CRITICAL FAILURE: {}", failure.message));
                run.fail(failure.profile, failure.message)?;
            }
        }
        active.settle();
        Ok(run.clone())
    }

    async fn execute(
        &self,
        subject: SubjectId,
        token: &CancellationToken,
    ) -> std::result::Result<RunArtifacts, Failure> {
        self.status("Connecting...");
        let profile = self.lookup_profile(subject, token).await;

        let collector = Collector::new(
            self.api.clone(),
            self.options.clone(),
            self.log.clone(),
            self.progress.clone(),
        );

        self.status("Scanning Following list...");
        let following = collector
            .collect(RelationDirection::Following, subject, token)
            .await;

        self.status("Scanning Followers list...");
        let followers = collector
            .collect(RelationDirection::Followers, subject, token)
            .await;

        if token.is_cancelled() {
            return Err(Failure {
                profile,
                message: "Analysis cancelled".to_string(),
            });
        }
        if let Some(cause) = nothing_usable(&following, &followers) {
            return Err(Failure {
                profile,
                message: format!("No data could be fetched for FID {}: {}", subject, cause),
            });
        }

        self.status("Calculating analytics...");
        self.log.info("Crunching numbers...");
        let result = reconcile_with_recent(
            following.records(),
            followers.records(),
            self.recent_limit,
        );
        info!(
            following = result.total_following,
            followers = result.total_followers,
            mutual = result.mutual.len(),
            ratio = result.ratio,
            "Reconciled"
        );

        Ok(RunArtifacts {
            profile,
            following,
            followers,
            result,
        })
    }

    /// Profile lookup never fails the run; problems leave the profile unknown.
    async fn lookup_profile(
        &self,
        subject: SubjectId,
        token: &CancellationToken,
    ) -> Option<Profile> {
        let body = tokio::select! {
            biased;
            _ = token.cancelled() => Err(UpstreamError::Cancelled),
            body = self.api.lookup_profile(subject) => body,
        };

        match body.and_then(|b| decode_profile(&b)) {
            Ok(Some(profile)) => {
                self.log
                    .info(format!("Target user: @{}", profile.user.handle));
                Some(profile)
            }
            Ok(None) => {
                self.log.info(format!(
                    "No profile returned for FID {}; continuing with unknown profile",
                    subject
                ));
                None
            }
            Err(e) => {
                self.log.error(format!(
                    "Profile lookup failed: {}; continuing with unknown profile",
                    e
                ));
                None
            }
        }
    }

    fn status(&self, message: &str) {
        self.progress
            .on_progress(&Progress::Status(message.to_string()));
    }
}

/// Both directions failed before yielding a single record.
fn nothing_usable(following: &RelationCollection, followers: &RelationCollection) -> Option<String> {
    match (following.status(), followers.status()) {
        (CollectionStatus::Failed(cause), CollectionStatus::Failed(_))
            if following.is_empty() && followers.is_empty() =>
        {
            Some(cause.clone())
        }
        _ => None,
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected internal error".to_string()
    }
}
