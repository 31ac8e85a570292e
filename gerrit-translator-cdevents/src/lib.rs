//! Minimal CDEvents envelope model.
//!
//! Covers the source-code-control events of the CDEvents specification:
//! repository, branch and change events. An event is created empty for its
//! kind, populated through setters and serialized with [`to_json_string`].

use std::fmt;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, TimeZone as _, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// CDEvents specification version emitted by default.
pub const SPEC_VERSION: &str = "0.3.0";

/// Specification versions whose event types this crate knows.
pub const SUPPORTED_SPEC_VERSIONS: &[&str] = &[SPEC_VERSION];

/// Namespace for event ids derived from the event content.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x8c1d_3f6a_52b4_4e0e_9a3d_27f1_c0de_e7e5);

#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("CDEvents spec version {version} is not supported")]
    UnsupportedSpecVersion { version: String },
    #[error("event timestamp {seconds} is out of range")]
    TimestampOutOfRange { seconds: u64 },
}

#[derive(Debug, Error)]
#[error("failed to serialize CDEvent: {0}")]
pub struct SerializationError(#[from] pub serde_json::Error);

#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    Repository,
    Branch,
    Change,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    RepositoryCreated,
    RepositoryModified,
    BranchCreated,
    BranchDeleted,
    ChangeCreated,
    ChangeUpdated,
    ChangeReviewed,
    ChangeMerged,
    ChangeAbandoned,
}

impl EventKind {
    /// Value of `context.type`.
    pub fn event_type(self) -> &'static str {
        match self {
            EventKind::RepositoryCreated => "dev.cdevents.repository.created.0.1.1",
            EventKind::RepositoryModified => "dev.cdevents.repository.modified.0.1.1",
            EventKind::BranchCreated => "dev.cdevents.branch.created.0.1.2",
            EventKind::BranchDeleted => "dev.cdevents.branch.deleted.0.1.2",
            EventKind::ChangeCreated => "dev.cdevents.change.created.0.1.2",
            EventKind::ChangeUpdated => "dev.cdevents.change.updated.0.1.2",
            EventKind::ChangeReviewed => "dev.cdevents.change.reviewed.0.1.2",
            EventKind::ChangeMerged => "dev.cdevents.change.merged.0.1.2",
            EventKind::ChangeAbandoned => "dev.cdevents.change.abandoned.0.1.2",
        }
    }

    pub fn subject_type(self) -> SubjectType {
        match self {
            EventKind::RepositoryCreated | EventKind::RepositoryModified => {
                SubjectType::Repository
            }
            EventKind::BranchCreated | EventKind::BranchDeleted => SubjectType::Branch,
            EventKind::ChangeCreated
            | EventKind::ChangeUpdated
            | EventKind::ChangeReviewed
            | EventKind::ChangeMerged
            | EventKind::ChangeAbandoned => SubjectType::Change,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_type())
    }
}

fn serialize_timestamp<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339())
}

#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Timestamp(#[serde(serialize_with = "serialize_timestamp")] DateTime<Utc>);

impl Timestamp {
    pub fn from_unix_seconds(seconds: u64) -> Result<Self, ConstructionError> {
        i64::try_from(seconds)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(Timestamp)
            .ok_or(ConstructionError::TimestampOutOfRange { seconds })
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp(DateTime::<Utc>::from(UNIX_EPOCH))
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Context {
    pub version: String,
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: Timestamp,
}

/// Reference to another subject, e.g. the repository a branch lives in.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: None,
        }
    }

    pub fn with_source(self, source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..self
        }
    }
}

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<Reference>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(rename = "type")]
    pub subject_type: SubjectType,
    pub content: Content,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CDEvent {
    pub context: Context,
    pub subject: Subject,
}

impl CDEvent {
    fn new(spec_version: &str, kind: EventKind) -> Self {
        Self {
            context: Context {
                version: spec_version.to_string(),
                id: String::new(),
                source: String::new(),
                event_type: kind.event_type().to_string(),
                timestamp: Timestamp::default(),
            },
            subject: Subject {
                id: String::new(),
                source: String::new(),
                subject_type: kind.subject_type(),
                content: Content::default(),
            },
        }
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.context.source = source.into();
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.context.timestamp = timestamp;
    }

    pub fn set_subject_id(&mut self, id: impl Into<String>) {
        self.subject.id = id.into();
    }

    pub fn set_subject_source(&mut self, source: impl Into<String>) {
        self.subject.source = source.into();
    }

    pub fn set_subject_name(&mut self, name: impl Into<String>) {
        self.subject.content.name = Some(name.into());
    }

    pub fn set_subject_url(&mut self, url: impl Into<String>) {
        self.subject.content.url = Some(url.into());
    }

    pub fn set_subject_repository(&mut self, repository: Reference) {
        self.subject.content.repository = Some(repository);
    }
}

/// Creates empty events for a fixed spec version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factory {
    spec_version: String,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new(SPEC_VERSION)
    }
}

impl Factory {
    pub fn new(spec_version: impl Into<String>) -> Self {
        Self {
            spec_version: spec_version.into(),
        }
    }

    pub fn create(&self, kind: EventKind) -> Result<CDEvent, ConstructionError> {
        if !SUPPORTED_SPEC_VERSIONS.contains(&self.spec_version.as_str()) {
            return Err(ConstructionError::UnsupportedSpecVersion {
                version: self.spec_version.clone(),
            });
        }
        Ok(CDEvent::new(&self.spec_version, kind))
    }
}

macro_rules! event_constructor {
    ($name:ident, $kind:ident) => {
        pub fn $name() -> Result<CDEvent, ConstructionError> {
            Factory::default().create(EventKind::$kind)
        }
    };
}

event_constructor!(new_repository_created, RepositoryCreated);
event_constructor!(new_repository_modified, RepositoryModified);
event_constructor!(new_branch_created, BranchCreated);
event_constructor!(new_branch_deleted, BranchDeleted);
event_constructor!(new_change_created, ChangeCreated);
event_constructor!(new_change_updated, ChangeUpdated);
event_constructor!(new_change_reviewed, ChangeReviewed);
event_constructor!(new_change_merged, ChangeMerged);
event_constructor!(new_change_abandoned, ChangeAbandoned);

/// Serialize an event to compact JSON.
///
/// An event without an id is given a UUIDv5 derived from its serialized
/// content, so equal events always serialize to equal text.
pub fn to_json_string(event: &CDEvent) -> Result<String, SerializationError> {
    if !event.context.id.is_empty() {
        return Ok(serde_json::to_string(event)?);
    }

    let content = serde_json::to_vec(event)?;
    let mut event = event.clone();
    event.context.id = Uuid::new_v5(&EVENT_ID_NAMESPACE, &content).to_string();
    Ok(serde_json::to_string(&event)?)
}

#[cfg(test)]
mod test {
    use super::*;

    use serde_json::{json, Value};
    use spectral::prelude::*;

    fn to_value(event: &CDEvent) -> Value {
        let json = to_json_string(event).expect("failed to serialize event");
        serde_json::from_str(&json).expect("serialized event is not json")
    }

    #[test]
    fn test_branch_created_shape() {
        let mut event = new_branch_created().expect("failed to create event");
        event.set_source("http://gerrit.local");
        event.set_subject_id("0bbc81cd2a5b5d2ea1cb3b0a2ac4d5dbd2f6b8e1");
        event.set_subject_source("demo");
        event.set_subject_repository(Reference::new("feature").with_source("demo"));
        event.set_timestamp(Timestamp::from_unix_seconds(1_710_000_000).unwrap());

        let value = to_value(&event);
        assert_that!(value["context"]["version"]).is_equal_to(json!("0.3.0"));
        assert_that!(value["context"]["type"])
            .is_equal_to(json!("dev.cdevents.branch.created.0.1.2"));
        assert_that!(value["context"]["source"]).is_equal_to(json!("http://gerrit.local"));
        assert_that!(value["context"]["timestamp"]).is_equal_to(json!("2024-03-09T16:00:00+00:00"));
        assert_that!(value["subject"]).is_equal_to(json!({
            "id": "0bbc81cd2a5b5d2ea1cb3b0a2ac4d5dbd2f6b8e1",
            "source": "demo",
            "type": "branch",
            "content": {"repository": {"id": "feature", "source": "demo"}}
        }));
    }

    #[test]
    fn test_empty_optional_fields_are_omitted() {
        let mut event = new_repository_created().expect("failed to create event");
        event.set_subject_id("refs/heads/master");
        event.set_subject_name("demo");

        let value = to_value(&event);
        assert_that!(value["subject"]).is_equal_to(json!({
            "id": "refs/heads/master",
            "type": "repository",
            "content": {"name": "demo"}
        }));
    }

    #[test]
    fn test_derived_id_is_stable() {
        let mut event = new_change_merged().expect("failed to create event");
        event.set_subject_id("master");

        let first = to_json_string(&event).unwrap();
        let second = to_json_string(&event).unwrap();
        assert_that!(first).is_equal_to(second);

        let id = to_value(&event)["context"]["id"].as_str().unwrap().to_string();
        assert_that!(Uuid::parse_str(&id)).is_ok();

        event.set_subject_id("develop");
        let other_id = to_value(&event)["context"]["id"].as_str().unwrap().to_string();
        assert_ne!(other_id, id);
    }

    #[test]
    fn test_explicit_id_is_kept() {
        let mut event = new_change_created().expect("failed to create event");
        event.context.id = "271069a8-fc18-44f1-b38f-9d70a1695819".to_string();
        assert_that!(to_value(&event)["context"]["id"])
            .is_equal_to(json!("271069a8-fc18-44f1-b38f-9d70a1695819"));
    }

    #[test]
    fn test_unsupported_spec_version() {
        let result = Factory::new("9.9.9").create(EventKind::ChangeReviewed);
        match result {
            Err(ConstructionError::UnsupportedSpecVersion { version }) => {
                assert_that!(version).is_equal_to("9.9.9".to_string())
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_timestamp_out_of_range() {
        assert_that!(Timestamp::from_unix_seconds(u64::MAX)).is_err();
    }

    #[test]
    fn test_subject_types() {
        assert_that!(EventKind::RepositoryModified.subject_type())
            .is_equal_to(SubjectType::Repository);
        assert_that!(EventKind::BranchDeleted.subject_type()).is_equal_to(SubjectType::Branch);
        assert_that!(EventKind::ChangeAbandoned.subject_type()).is_equal_to(SubjectType::Change);
    }
}
