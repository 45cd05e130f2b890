use crate::api::{PageRequest, SocialGraphApi};
use crate::envelope::decode_page;
use crate::error::{UpstreamError, UpstreamResult};
use crate::pager::Pager;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use unloop_core::{
    CollectionStatus, CollectorConfig, RelationCollection, RelationDirection, SessionLog, SubjectId,
};

/// Incremental status for whoever renders the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Coarse step of the analysis, e.g. `Scanning Followers list...`.
    Status(String),
    /// Records accumulated so far for one direction.
    Collected {
        direction: RelationDirection,
        count: usize,
    },
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Progress::Status(message) => f.write_str(message),
            Progress::Collected { direction, count } => {
                write!(f, "Scanning {}... ({} users)", direction, count)
            }
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: &Progress);
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _progress: &Progress) {}
}

#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub page_size: u32,
    pub max_pages: usize,
    pub page_delay: Duration,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self::from(&CollectorConfig::default())
    }
}

impl From<&CollectorConfig> for CollectorOptions {
    fn from(config: &CollectorConfig) -> Self {
        Self {
            page_size: config.effective_page_size(),
            max_pages: config.max_pages,
            page_delay: config.page_delay(),
        }
    }
}

/// Gathers one relation direction page by page.
///
/// Request failures never escape: pagination stops, the cause goes to the
/// session log, and whatever was accumulated is returned with a
/// [`CollectionStatus::Failed`] status.
#[derive(Clone)]
pub struct Collector {
    api: Arc<dyn SocialGraphApi>,
    options: CollectorOptions,
    log: SessionLog,
    progress: Arc<dyn ProgressSink>,
}

impl Collector {
    pub fn new(
        api: Arc<dyn SocialGraphApi>,
        options: CollectorOptions,
        log: SessionLog,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            api,
            options,
            log,
            progress,
        }
    }

    pub fn options(&self) -> &CollectorOptions {
        &self.options
    }

    pub async fn collect(
        &self,
        direction: RelationDirection,
        subject: SubjectId,
        cancel: &CancellationToken,
    ) -> RelationCollection {
        let mut pager = Pager::new(self.options.max_pages);
        let mut collection = RelationCollection::new(direction);

        self.log
            .info(format!("Starting {} fetch for FID: {}...", direction, subject));

        while let Some(cursor) = pager.next_cursor() {
            if cancel.is_cancelled() {
                pager.cancel();
                break;
            }

            let request = PageRequest {
                direction,
                subject,
                limit: self.options.page_size,
                cursor,
            };

            match self.fetch(&request, cancel).await {
                Ok(page) => {
                    if page.discarded > 0 {
                        debug!(
                            %direction,
                            discarded = page.discarded,
                            "Dropped records without an id"
                        );
                    }
                    collection.extend_page(page.records);
                    pager.advance(page.next_cursor);

                    debug!(
                        %direction,
                        subject = subject.get(),
                        page = pager.pages_fetched(),
                        count = collection.len(),
                        "Fetched page"
                    );
                    self.progress.on_progress(&Progress::Collected {
                        direction,
                        count: collection.len(),
                    });

                    if !pager.is_done() && !self.options.page_delay.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => pager.cancel(),
                            _ = tokio::time::sleep(self.options.page_delay) => {}
                        }
                    }
                }
                Err(UpstreamError::Cancelled) => pager.cancel(),
                Err(e) => {
                    self.log
                        .error(format!("Error fetching {}: {}", direction, e));
                    pager.fail(e.to_string());
                }
            }
        }

        let status = pager
            .status()
            .cloned()
            .unwrap_or(CollectionStatus::Cancelled);
        match &status {
            CollectionStatus::PageLimit => warn!(
                %direction,
                max_pages = self.options.max_pages,
                "Stopped at page ceiling; collection may be incomplete"
            ),
            CollectionStatus::Cancelled => {
                self.log.info(format!("{} fetch cancelled", direction))
            }
            _ => {}
        }
        info!(
            %direction,
            subject = subject.get(),
            pages = collection.pages(),
            count = collection.len(),
            "Collection finished"
        );

        collection.finish(status)
    }

    async fn fetch(
        &self,
        request: &PageRequest,
        cancel: &CancellationToken,
    ) -> UpstreamResult<crate::envelope::Page> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpstreamError::Cancelled),
            body = self.api.fetch_page(request) => body?,
        };
        decode_page(&body)
    }
}
