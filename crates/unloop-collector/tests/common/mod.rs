#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use unloop_collector::{PageRequest, Progress, ProgressSink, SocialGraphApi, UpstreamError, UpstreamResult};
use unloop_core::{RelationDirection, SubjectId};

#[derive(Debug, Clone)]
pub enum Reply {
    Body(Value),
    Status(u16),
    Panic(&'static str),
    Hang,
}

/// In-memory upstream that replays scripted replies per endpoint.
pub struct ScriptedApi {
    profile: Mutex<Reply>,
    following: Mutex<VecDeque<Reply>>,
    followers: Mutex<VecDeque<Reply>>,
    /// Served once a direction's queue is exhausted.
    fallback: Mutex<Reply>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            profile: Mutex::new(Reply::Body(json!({ "users": [] }))),
            following: Mutex::new(VecDeque::new()),
            followers: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Reply::Body(json!({ "users": [] }))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_profile(self, reply: Reply) -> Self {
        *self.profile.lock() = reply;
        self
    }

    /// Replaces the profile reply on a shared instance.
    pub fn set_profile(&self, reply: Reply) {
        *self.profile.lock() = reply;
    }

    pub fn with_pages(self, direction: RelationDirection, replies: Vec<Reply>) -> Self {
        *self.queue(direction).lock() = replies.into();
        self
    }

    pub fn with_fallback(self, reply: Reply) -> Self {
        *self.fallback.lock() = reply;
        self
    }

    fn queue(&self, direction: RelationDirection) -> &Mutex<VecDeque<Reply>> {
        match direction {
            RelationDirection::Following => &self.following,
            RelationDirection::Followers => &self.followers,
        }
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, direction: RelationDirection) -> Vec<PageRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.direction == direction)
            .collect()
    }

    async fn serve(reply: Reply) -> UpstreamResult<Value> {
        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(code) => Err(UpstreamError::Status(code)),
            Reply::Panic(message) => panic!("{}", message),
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl SocialGraphApi for ScriptedApi {
    async fn lookup_profile(&self, _subject: SubjectId) -> UpstreamResult<Value> {
        let reply = self.profile.lock().clone();
        Self::serve(reply).await
    }

    async fn fetch_page(&self, request: &PageRequest) -> UpstreamResult<Value> {
        self.requests.lock().push(request.clone());
        let next = self.queue(request.direction).lock().pop_front();
        let reply = next.unwrap_or_else(|| self.fallback.lock().clone());
        Self::serve(reply).await
    }
}

/// Flat envelope with every user wrapped in a `user` field.
pub fn flat_page(ids: impl IntoIterator<Item = u64>, cursor: Option<&str>) -> Value {
    let users: Vec<Value> = ids
        .into_iter()
        .map(|id| json!({ "object": "follow", "user": { "fid": id, "username": handle(id) } }))
        .collect();
    json!({ "users": users, "next": { "cursor": cursor } })
}

/// Nested `result` envelope with bare users.
pub fn nested_page(ids: impl IntoIterator<Item = u64>, cursor: Option<&str>) -> Value {
    let users: Vec<Value> = ids
        .into_iter()
        .map(|id| json!({ "fid": id, "username": handle(id) }))
        .collect();
    json!({ "result": { "users": users, "next": { "cursor": cursor } } })
}

pub fn profile_body(fid: u64, username: &str) -> Value {
    json!({ "users": [{ "fid": fid, "username": username, "follower_count": 3, "following_count": 3 }] })
}

pub fn handle(id: u64) -> String {
    format!("user{}", id)
}

pub fn subject(raw: u64) -> SubjectId {
    SubjectId::new(raw).unwrap()
}

#[derive(Default)]
pub struct RecordingProgress {
    pub events: Mutex<Vec<Progress>>,
}

impl ProgressSink for RecordingProgress {
    fn on_progress(&self, progress: &Progress) {
        self.events.lock().push(progress.clone());
    }
}
