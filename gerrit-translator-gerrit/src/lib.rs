//! Gerrit webhook and `stream-events` payloads.
//!
//! Every supported event is a flat JSON object carrying a `type`
//! discriminator. The records here decode the full shape of one event kind;
//! picking the kind is left to the caller (see [`EventKind`]).

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Revision reported for the side of a ref update where the ref does not
/// exist.
pub const NULL_REVISION: &str = "0000000000000000000000000000000000000000";

/// Ref namespace Gerrit uses for patch set revisions of open changes.
pub const CHANGE_REF_MARKER: &str = "refs/changes";

/// Gerrit username
pub type Username = String;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub name: Option<String>,
    pub username: Option<Username>,
    pub email: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    #[serde(rename = "type")]
    pub approval_type: String,
    #[serde(default)]
    pub description: String,
    pub value: String,
    pub old_value: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Patchset {
    pub number: u32,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub uploader: User,
    #[serde(default)]
    pub created_on: u64,
    #[serde(default)]
    pub author: User,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub size_insertions: i32,
    #[serde(default)]
    pub size_deletions: i32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeStatus {
    New,
    Draft,
    Merged,
    Abandoned,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(default)]
    pub project: String,
    pub branch: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub subject: String,
    pub topic: Option<String>,
    #[serde(default)]
    pub owner: User,
    pub url: String,
    #[serde(default)]
    pub commit_message: String,
    pub created_on: Option<u64>,
    pub status: Option<ChangeStatus>,
}

/// Project a change event belongs to.
///
/// Stream events send the bare project name, the webhooks plugin wraps it in
/// an object. Both decode to the same value.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "ProjectRepr")]
pub struct Project {
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProjectRepr {
    Name(String),
    Object { name: String },
}

impl From<ProjectRepr> for Project {
    fn from(repr: ProjectRepr) -> Self {
        match repr {
            ProjectRepr::Name(name) | ProjectRepr::Object { name } => Project { name },
        }
    }
}

#[derive(Deserialize, Debug, Eq, PartialEq, Hash, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChangeKey {
    #[serde(alias = "key")]
    pub id: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefUpdate {
    pub old_rev: String,
    pub new_rev: String,
    pub ref_name: String,
    pub project: String,
}

impl RefUpdate {
    /// Whether the ref is one of the per-patch-set refs of a change.
    pub fn is_change_ref(&self) -> bool {
        self.ref_name.contains(CHANGE_REF_MARKER)
    }

    pub fn is_creation(&self) -> bool {
        self.old_rev == NULL_REVISION
    }

    pub fn is_deletion(&self) -> bool {
        self.new_rev == NULL_REVISION
    }
}

/// Fields present on every event.
#[derive(Deserialize, Debug, Clone)]
pub struct CommonFields {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "eventCreatedOn")]
    pub created_on: u64,
    /// URL of the Gerrit instance the event originated from. Not part of the
    /// payload; filled in from request metadata after decoding.
    #[serde(skip_deserializing)]
    pub repo_url: String,
}

/// Fields shared by all change events.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFields {
    #[serde(rename = "patchSet")]
    pub patchset: Patchset,
    pub change: Change,
    pub project: Project,
    #[serde(default)]
    pub ref_name: String,
    pub change_key: Option<ChangeKey>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreatedEvent {
    pub project_name: String,
    pub head_name: String,
    #[serde(flatten)]
    pub common: CommonFields,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectHeadUpdatedEvent {
    pub project_name: String,
    #[serde(default)]
    pub old_head: String,
    pub new_head: String,
    #[serde(flatten)]
    pub common: CommonFields,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RefUpdatedEvent {
    #[serde(default)]
    pub submitter: User,
    pub ref_update: RefUpdate,
    #[serde(flatten)]
    pub common: CommonFields,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PatchsetCreatedEvent {
    #[serde(default, alias = "submitter")]
    pub uploader: User,
    #[serde(flatten)]
    pub change: ChangeFields,
    #[serde(flatten)]
    pub common: CommonFields,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CommentAddedEvent {
    #[serde(default)]
    pub author: User,
    #[serde(default)]
    pub approvals: Vec<Approval>,
    #[serde(default)]
    pub comment: String,
    #[serde(flatten)]
    pub change: ChangeFields,
    #[serde(flatten)]
    pub common: CommonFields,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMergedEvent {
    #[serde(default)]
    pub submitter: User,
    #[serde(default)]
    pub new_rev: String,
    #[serde(flatten)]
    pub change: ChangeFields,
    #[serde(flatten)]
    pub common: CommonFields,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChangeAbandonedEvent {
    #[serde(default)]
    pub abandoner: User,
    #[serde(default)]
    pub reason: String,
    #[serde(flatten)]
    pub change: ChangeFields,
    #[serde(flatten)]
    pub common: CommonFields,
}

/// Value of the `type` discriminator for every supported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ProjectCreated,
    ProjectHeadUpdated,
    RefUpdated,
    PatchsetCreated,
    CommentAdded,
    ChangeMerged,
    ChangeAbandoned,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::ProjectCreated,
        EventKind::ProjectHeadUpdated,
        EventKind::RefUpdated,
        EventKind::PatchsetCreated,
        EventKind::CommentAdded,
        EventKind::ChangeMerged,
        EventKind::ChangeAbandoned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ProjectCreated => "project-created",
            EventKind::ProjectHeadUpdated => "project-head-updated",
            EventKind::RefUpdated => "ref-updated",
            EventKind::PatchsetCreated => "patchset-created",
            EventKind::CommentAdded => "comment-added",
            EventKind::ChangeMerged => "change-merged",
            EventKind::ChangeAbandoned => "change-abandoned",
        }
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully decoded event of one kind.
pub trait GerritEvent: DeserializeOwned {
    const KIND: EventKind;

    fn common_mut(&mut self) -> &mut CommonFields;

    /// Name of the project the event is about.
    fn project_name(&self) -> &str;
}

macro_rules! impl_change_event {
    ($event:ty, $kind:expr) => {
        impl GerritEvent for $event {
            const KIND: EventKind = $kind;

            fn common_mut(&mut self) -> &mut CommonFields {
                &mut self.common
            }

            fn project_name(&self) -> &str {
                &self.change.project.name
            }
        }
    };
}

impl_change_event!(PatchsetCreatedEvent, EventKind::PatchsetCreated);
impl_change_event!(CommentAddedEvent, EventKind::CommentAdded);
impl_change_event!(ChangeMergedEvent, EventKind::ChangeMerged);
impl_change_event!(ChangeAbandonedEvent, EventKind::ChangeAbandoned);

impl GerritEvent for ProjectCreatedEvent {
    const KIND: EventKind = EventKind::ProjectCreated;

    fn common_mut(&mut self) -> &mut CommonFields {
        &mut self.common
    }

    fn project_name(&self) -> &str {
        &self.project_name
    }
}

impl GerritEvent for ProjectHeadUpdatedEvent {
    const KIND: EventKind = EventKind::ProjectHeadUpdated;

    fn common_mut(&mut self) -> &mut CommonFields {
        &mut self.common
    }

    fn project_name(&self) -> &str {
        &self.project_name
    }
}

impl GerritEvent for RefUpdatedEvent {
    const KIND: EventKind = EventKind::RefUpdated;

    fn common_mut(&mut self) -> &mut CommonFields {
        &mut self.common
    }

    fn project_name(&self) -> &str {
        &self.ref_update.project
    }
}

/// Decode `raw` as an event of kind `E` and attach the origin URL.
pub fn decode<E: GerritEvent>(raw: &str, repo_url: &str) -> Result<E, serde_json::Error> {
    let mut event: E = serde_json::from_str(raw)?;
    event.common_mut().repo_url = repo_url.to_string();
    Ok(event)
}
