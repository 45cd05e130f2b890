//! Adapter from raw upstream JSON to canonical records.
//!
//! The follow-list endpoints have been seen returning two envelopes:
//!
//! - flat: `{ "users": [...], "next": { "cursor": "..." } }`
//! - nested: `{ "result": { "users": [...], "next": { "cursor": "..." } } }`
//!
//! Anything else is reported as [`UpstreamError::UnsupportedShape`] instead of
//! being read as an empty page.

use crate::error::{UpstreamError, UpstreamResult};
use serde_json::Value;
use unloop_core::{Profile, UserRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    Flat,
    Nested,
}

pub const SUPPORTED_SHAPES: [EnvelopeShape; 2] = [EnvelopeShape::Flat, EnvelopeShape::Nested];

impl EnvelopeShape {
    fn users(self, body: &Value) -> Option<&Vec<Value>> {
        let users = match self {
            EnvelopeShape::Flat => body.get("users"),
            EnvelopeShape::Nested => body.get("result").and_then(|r| r.get("users")),
        };
        users.and_then(Value::as_array)
    }
}

/// One decoded page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub shape: EnvelopeShape,
    pub records: Vec<UserRecord>,
    /// Raw entries that did not normalize to a record.
    pub discarded: usize,
    pub next_cursor: Option<String>,
}

/// Reads a raw user entry field by field.
///
/// Only `fid` and `username` decide whether an entry is kept; display fields
/// with an unexpected type are treated as absent.
struct RawUser<'a> {
    value: &'a Value,
}

impl<'a> RawUser<'a> {
    fn parse(value: &'a Value) -> Option<Self> {
        value.is_object().then_some(Self { value })
    }

    fn id(&self) -> Option<u64> {
        self.value
            .get("fid")
            .and_then(Value::as_u64)
            .filter(|fid| *fid > 0)
    }

    fn handle(&self) -> Option<&'a str> {
        self.text("username")
    }

    fn has_handle(&self) -> bool {
        self.handle().is_some()
    }

    fn text(&self, key: &str) -> Option<&'a str> {
        text_at(self.value, &[key])
    }

    fn count(&self, key: &str) -> Option<u64> {
        self.value.get(key).and_then(Value::as_u64)
    }

    fn into_record(self, id: u64) -> UserRecord {
        UserRecord {
            id,
            handle: self.handle().unwrap_or_default().to_string(),
            display_name: self.text("display_name").map(str::to_owned),
            avatar_url: self.text("pfp_url").map(str::to_owned),
            bio: text_at(self.value, &["profile", "bio", "text"]).map(str::to_owned),
        }
    }
}

/// Non-empty string at `path`, or `None` when any step is missing or mistyped.
fn text_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |node, key| node.get(*key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Normalizes one raw entry.
///
/// Accepted: an object carrying `fid` and `username` directly, or an object
/// wrapping a user one level down in `user` (an `fid` is enough there).
pub fn normalize_user(raw: &Value) -> Option<UserRecord> {
    if let Some(direct) = RawUser::parse(raw) {
        if let (Some(id), true) = (direct.id(), direct.has_handle()) {
            return Some(direct.into_record(id));
        }
    }

    let wrapped = RawUser::parse(raw.get("user")?)?;
    let id = wrapped.id()?;
    Some(wrapped.into_record(id))
}

fn next_cursor(body: &Value) -> Option<String> {
    let flat = body.get("next").and_then(|n| n.get("cursor"));
    let nested = body
        .get("result")
        .and_then(|r| r.get("next"))
        .and_then(|n| n.get("cursor"));

    [flat, nested]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|c| !c.is_empty())
        .map(str::to_owned)
}

fn describe(body: &Value) -> String {
    match body {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().take(8).map(String::as_str).map(preview).collect();
            let more = if map.len() > keys.len() { ", ..." } else { "" };
            format!("object with keys [{}{}]", keys.join(", "), more)
        }
        Value::Array(_) => "array".to_string(),
        Value::Null => "null".to_string(),
        Value::String(text) => format!("string {:?}", preview(text)),
        other => format!("scalar {}", other),
    }
}

const PREVIEW_CHARS: usize = 64;

fn preview(text: &str) -> String {
    let mut cut: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        cut.push_str("...");
    }
    cut
}

pub fn decode_page(body: &Value) -> UpstreamResult<Page> {
    let (shape, raw_users) = SUPPORTED_SHAPES
        .iter()
        .find_map(|shape| shape.users(body).map(|users| (*shape, users)))
        .ok_or_else(|| UpstreamError::UnsupportedShape(describe(body)))?;

    let records: Vec<UserRecord> = raw_users.iter().filter_map(normalize_user).collect();

    Ok(Page {
        shape,
        discarded: raw_users.len() - records.len(),
        records,
        next_cursor: next_cursor(body),
    })
}

/// Decodes the bulk lookup response. `Ok(None)` means the lookup succeeded
/// but returned no usable user.
pub fn decode_profile(body: &Value) -> UpstreamResult<Option<Profile>> {
    let users = body
        .get("users")
        .and_then(Value::as_array)
        .ok_or_else(|| UpstreamError::UnsupportedShape(describe(body)))?;

    let Some(first) = users.first() else {
        return Ok(None);
    };
    let Some(raw) = RawUser::parse(first) else {
        return Ok(None);
    };
    let Some(id) = raw.id() else {
        return Ok(None);
    };

    let follower_count = raw.count("follower_count");
    let following_count = raw.count("following_count");
    Ok(Some(Profile {
        user: raw.into_record(id),
        follower_count,
        following_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapped_record_normalizes() {
        let record = normalize_user(&json!({ "user": { "fid": 7, "username": "x" } })).unwrap();
        assert_eq!(record, UserRecord::new(7, "x"));
    }

    #[test]
    fn record_without_id_is_dropped() {
        assert!(normalize_user(&json!({ "username": "ghost" })).is_none());
        assert!(normalize_user(&json!({ "user": { "username": "ghost" } })).is_none());
        assert!(normalize_user(&json!({ "fid": 0, "username": "zero" })).is_none());
        assert!(normalize_user(&json!("just a string")).is_none());
        assert!(normalize_user(&Value::Null).is_none());
    }

    #[test]
    fn direct_record_keeps_display_fields() {
        let raw = json!({
            "object": "user",
            "fid": 3,
            "username": "dwr",
            "display_name": "Dan",
            "pfp_url": "https://img.example/dwr.png",
            "profile": { "bio": { "text": "gm" } }
        });
        let record = normalize_user(&raw).unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.handle, "dwr");
        assert_eq!(record.display_name.as_deref(), Some("Dan"));
        assert_eq!(record.avatar_url.as_deref(), Some("https://img.example/dwr.png"));
        assert_eq!(record.bio.as_deref(), Some("gm"));
    }

    #[test]
    fn direct_record_without_handle_falls_back_to_wrapper() {
        let raw = json!({ "fid": 5, "user": { "fid": 6, "username": "inner" } });
        assert_eq!(normalize_user(&raw).unwrap().id, 6);
    }

    #[test]
    fn decodes_flat_envelope() {
        let body = json!({
            "users": [
                { "user": { "fid": 1, "username": "a" } },
                { "user": { "fid": 2, "username": "b" } },
                { "object": "follow" }
            ],
            "next": { "cursor": "abc" }
        });
        let page = decode_page(&body).unwrap();
        assert_eq!(page.shape, EnvelopeShape::Flat);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.discarded, 1);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn decodes_nested_envelope() {
        let body = json!({
            "result": {
                "users": [{ "fid": 9, "username": "n" }],
                "next": { "cursor": "def" }
            }
        });
        let page = decode_page(&body).unwrap();
        assert_eq!(page.shape, EnvelopeShape::Nested);
        assert_eq!(page.records, vec![UserRecord::new(9, "n")]);
        assert_eq!(page.next_cursor.as_deref(), Some("def"));
    }

    #[test]
    fn null_or_empty_cursor_ends_pagination() {
        let page = decode_page(&json!({ "users": [], "next": { "cursor": null } })).unwrap();
        assert!(page.next_cursor.is_none());

        let page = decode_page(&json!({ "users": [], "next": { "cursor": "" } })).unwrap();
        assert!(page.next_cursor.is_none());

        let page = decode_page(&json!({ "users": [] })).unwrap();
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn unknown_envelope_is_typed_error() {
        let err = decode_page(&json!({ "data": [] })).unwrap_err();
        assert!(matches!(err, UpstreamError::UnsupportedShape(ref s) if s.contains("data")));

        let err = decode_page(&json!({ "users": null })).unwrap_err();
        assert!(matches!(err, UpstreamError::UnsupportedShape(_)));
    }

    #[test]
    fn mistyped_display_fields_do_not_drop_record() {
        let record = normalize_user(&json!({
            "fid": 7,
            "username": "x",
            "profile": { "bio": "gm" },
            "pfp_url": { "url": "https://img.example/x.png" }
        }))
        .unwrap();
        assert_eq!(record, UserRecord::new(7, "x"));

        let record = normalize_user(&json!({
            "user": { "fid": 8, "username": "y", "display_name": 5 }
        }))
        .unwrap();
        assert_eq!(record.id, 8);
        assert_eq!(record.handle, "y");
        assert!(record.display_name.is_none());

        let page = decode_page(&json!({
            "users": [
                { "user": { "fid": 1, "username": "a", "profile": [] } },
                { "user": { "fid": 2, "username": "b", "pfp_url": false } }
            ]
        }))
        .unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.discarded, 0);
    }

    #[test]
    fn mistyped_identity_still_drops_record() {
        assert!(normalize_user(&json!({ "fid": "7", "username": "x" })).is_none());
        assert!(normalize_user(&json!({ "user": { "fid": -1, "username": "y" } })).is_none());
    }

    #[test]
    fn scalar_body_is_described_by_prefix() {
        let html = format!("<html>{}</html>", "x".repeat(10_000));
        let err = decode_page(&Value::String(html)).unwrap_err();
        let UpstreamError::UnsupportedShape(cause) = err else {
            panic!("expected unsupported shape");
        };
        assert!(cause.starts_with("string \"<html>"));
        assert!(cause.len() < 100);
    }

    #[test]
    fn profile_decoding() {
        let body = json!({
            "users": [{ "fid": 19267, "username": "me", "follower_count": 10, "following_count": 4 }]
        });
        let profile = decode_profile(&body).unwrap().unwrap();
        assert_eq!(profile.user.handle, "me");
        assert_eq!(profile.follower_count, Some(10));
        assert_eq!(profile.following_count, Some(4));

        assert!(decode_profile(&json!({ "users": [] })).unwrap().is_none());
        assert!(decode_profile(&json!({ "message": "nope" })).is_err());

        let body = json!({
            "users": [{ "fid": 5, "username": "m", "follower_count": "many", "following_count": 2 }]
        });
        let profile = decode_profile(&body).unwrap().unwrap();
        assert_eq!(profile.follower_count, None);
        assert_eq!(profile.following_count, Some(2));
    }
}
