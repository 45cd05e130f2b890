use crate::types::SubjectId;
use serde::Serialize;

/// Supplies the authenticated subject, if the host environment has one.
pub trait IdentityContext: Send + Sync {
    fn authenticated_subject(&self) -> Option<SubjectId>;
}

/// Identity fixed at construction time.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity(pub Option<SubjectId>);

impl IdentityContext for StaticIdentity {
    fn authenticated_subject(&self) -> Option<SubjectId> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectSource {
    Authenticated,
    Fallback,
}

/// Picks the authenticated subject, or `fallback` when the context is empty.
pub fn resolve_subject(
    context: &dyn IdentityContext,
    fallback: SubjectId,
) -> (SubjectId, SubjectSource) {
    match context.authenticated_subject() {
        Some(subject) => (subject, SubjectSource::Authenticated),
        None => (fallback, SubjectSource::Fallback),
    }
}
