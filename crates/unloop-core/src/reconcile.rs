//! Set-based classification of a subject's following and followers collections.
//!
//! Everything here is pure: inputs are borrowed, nothing is logged, and the
//! same two collections always produce the same result.

use crate::types::UserRecord;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Number of followers exposed through the "newest followers" view.
pub const RECENT_FOLLOWERS_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Followed by the subject, not following back.
    pub one_directional_outbound: Vec<UserRecord>,
    /// Following the subject, not followed back.
    pub one_directional_inbound: Vec<UserRecord>,
    pub mutual: Vec<UserRecord>,
    pub total_following: usize,
    pub total_followers: usize,
    /// Followers per following, two decimals; 0 when nothing is followed.
    pub ratio: f64,
    /// Prefix of the followers collection as fetched. Display only.
    pub recent_followers: Vec<UserRecord>,
}

impl ReconciliationResult {
    pub fn is_empty(&self) -> bool {
        self.total_following == 0 && self.total_followers == 0
    }

    pub fn composition(&self) -> NetworkComposition {
        NetworkComposition::from(self)
    }
}

/// Dashboard breakdown of a reconciled network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkComposition {
    /// Followers as a percentage of followers + following.
    pub followers_share: f64,
    /// Mutuals as a percentage of the larger of the two collections.
    pub mutual_share: f64,
    /// Outbound-only plus inbound-only accounts.
    pub one_sided: usize,
}

impl From<&ReconciliationResult> for NetworkComposition {
    fn from(result: &ReconciliationResult) -> Self {
        let combined = result.total_followers + result.total_following;
        let widest = result.total_followers.max(result.total_following);
        Self {
            followers_share: percentage(result.total_followers, combined),
            mutual_share: percentage(result.mutual.len(), widest),
            one_sided: result.one_directional_outbound.len() + result.one_directional_inbound.len(),
        }
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Keeps the first occurrence of every id, preserving order.
pub fn dedup_by_id(records: &[UserRecord]) -> Vec<&UserRecord> {
    let mut seen = FxHashSet::default();
    records.iter().filter(|r| seen.insert(r.id)).collect()
}

pub fn reconcile(following: &[UserRecord], followers: &[UserRecord]) -> ReconciliationResult {
    reconcile_with_recent(following, followers, RECENT_FOLLOWERS_LIMIT)
}

pub fn reconcile_with_recent(
    following: &[UserRecord],
    followers: &[UserRecord],
    recent_limit: usize,
) -> ReconciliationResult {
    let following = dedup_by_id(following);
    let deduped_followers = dedup_by_id(followers);

    let following_lookup: FxHashMap<u64, &UserRecord> =
        following.iter().map(|u| (u.id, *u)).collect();
    let followers_lookup: FxHashMap<u64, &UserRecord> =
        deduped_followers.iter().map(|u| (u.id, *u)).collect();

    let (mutual, outbound): (Vec<&UserRecord>, Vec<&UserRecord>) = following
        .iter()
        .copied()
        .partition(|u| followers_lookup.contains_key(&u.id));

    let inbound: Vec<UserRecord> = deduped_followers
        .iter()
        .filter(|u| !following_lookup.contains_key(&u.id))
        .map(|u| (*u).clone())
        .collect();

    let total_following = following.len();
    let total_followers = deduped_followers.len();
    let ratio = if total_following == 0 {
        0.0
    } else {
        round2(total_followers as f64 / total_following as f64)
    };

    ReconciliationResult {
        one_directional_outbound: outbound.into_iter().cloned().collect(),
        one_directional_inbound: inbound,
        mutual: mutual.into_iter().cloned().collect(),
        total_following,
        total_followers,
        ratio,
        recent_followers: followers.iter().take(recent_limit).cloned().collect(),
    }
}
