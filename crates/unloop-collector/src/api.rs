use crate::error::UpstreamResult;
use async_trait::async_trait;
use serde_json::Value;
use unloop_core::{RelationDirection, SubjectId};

/// One page request against a follow-list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub direction: RelationDirection,
    pub subject: SubjectId,
    pub limit: u32,
    /// Opaque cursor from the previous page; `None` for the first page.
    pub cursor: Option<String>,
}

/// Read-only access to the social-graph API.
///
/// Implementations return the raw JSON body; turning it into records is the
/// job of [`crate::envelope`], so every transport shares the same shape rules.
#[async_trait]
pub trait SocialGraphApi: Send + Sync {
    async fn lookup_profile(&self, subject: SubjectId) -> UpstreamResult<Value>;

    async fn fetch_page(&self, request: &PageRequest) -> UpstreamResult<Value>;
}
