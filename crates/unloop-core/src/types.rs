use crate::error::{Result, UnloopError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Base URL used to build external profile links.
pub const PROFILE_BASE_URL: &str = "https://warpcast.com";

/// Positive account identifier (FID) of the subject being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct SubjectId(u64);

impl SubjectId {
    pub fn new(raw: u64) -> Result<Self> {
        if raw == 0 {
            return Err(UnloopError::InvalidSubject(
                "FID must be a positive integer".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for SubjectId {
    type Error = UnloopError;

    fn try_from(raw: u64) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<SubjectId> for u64 {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl FromStr for SubjectId {
    type Err = UnloopError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s
            .trim()
            .parse::<u64>()
            .map_err(|_| UnloopError::InvalidSubject(format!("'{}' is not a valid FID", s)))?;
        Self::new(raw)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the social graph a collection describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationDirection {
    /// Accounts the subject follows.
    Following,
    /// Accounts following the subject.
    Followers,
}

impl RelationDirection {
    pub fn endpoint_path(self) -> &'static str {
        match self {
            RelationDirection::Following => "farcaster/following",
            RelationDirection::Followers => "farcaster/followers",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RelationDirection::Following => "Following",
            RelationDirection::Followers => "Followers",
        }
    }
}

impl fmt::Display for RelationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical account shape. Identity is `id`; the other fields are display data
/// and may differ between pages for the same account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl UserRecord {
    pub fn new(id: u64, handle: impl Into<String>) -> Self {
        Self {
            id,
            handle: handle.into(),
            display_name: None,
            avatar_url: None,
            bio: None,
        }
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }

    /// External profile link for this account.
    pub fn profile_url(&self) -> String {
        profile_url(&self.handle)
    }
}

pub fn profile_url(handle: &str) -> String {
    format!(
        "{}/{}",
        PROFILE_BASE_URL,
        handle.trim_start_matches('@')
    )
}

/// Subject profile as returned by the bulk lookup endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: UserRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follower_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following_count: Option<u64>,
}

/// How a collector run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "cause", rename_all = "snake_case")]
pub enum CollectionStatus {
    /// The upstream reported no further pages.
    Complete,
    /// The page ceiling was reached while a next cursor was still offered.
    PageLimit,
    /// A request failed; the collection holds the pages gathered before it.
    Failed(String),
    Cancelled,
}

impl CollectionStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, CollectionStatus::Complete)
    }
}

/// Ordered records produced by one collector run, in API page order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationCollection {
    pub direction: RelationDirection,
    records: Vec<UserRecord>,
    pages: usize,
    status: CollectionStatus,
}

impl RelationCollection {
    pub fn new(direction: RelationDirection) -> Self {
        Self {
            direction,
            records: Vec::new(),
            pages: 0,
            status: CollectionStatus::Complete,
        }
    }

    pub fn from_records(direction: RelationDirection, records: Vec<UserRecord>) -> Self {
        Self {
            direction,
            records,
            pages: 1,
            status: CollectionStatus::Complete,
        }
    }

    pub fn extend_page(&mut self, records: Vec<UserRecord>) {
        self.records.extend(records);
        self.pages += 1;
    }

    pub fn finish(mut self, status: CollectionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn records(&self) -> &[UserRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<UserRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn status(&self) -> &CollectionStatus {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_id_rejects_zero_and_garbage() {
        assert!(SubjectId::new(0).is_err());
        assert!("abc".parse::<SubjectId>().is_err());
        assert!("-4".parse::<SubjectId>().is_err());
        assert_eq!(" 19267 ".parse::<SubjectId>().unwrap().get(), 19267);
    }

    #[test]
    fn subject_id_deserialize_validates() {
        assert!(serde_json::from_str::<SubjectId>("0").is_err());
        assert_eq!(serde_json::from_str::<SubjectId>("7").unwrap().get(), 7);
    }

    #[test]
    fn profile_url_strips_at_sign() {
        assert_eq!(profile_url("@dwr"), "https://warpcast.com/dwr");
        assert_eq!(UserRecord::new(3, "v").profile_url(), "https://warpcast.com/v");
    }

    #[test]
    fn collection_tracks_pages_and_status() {
        let mut collection = RelationCollection::new(RelationDirection::Followers);
        collection.extend_page(vec![UserRecord::new(1, "a"), UserRecord::new(2, "b")]);
        collection.extend_page(vec![UserRecord::new(3, "c")]);
        let collection = collection.finish(CollectionStatus::Failed("API Error (500)".into()));

        assert_eq!(collection.len(), 3);
        assert_eq!(collection.pages(), 2);
        assert!(!collection.status().is_complete());
    }
}
