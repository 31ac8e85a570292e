//! Routing of decoded Gerrit events to CDEvent kinds and the field mapping
//! for each of them.

use gerrit_translator_cdevents as cdevents;
use gerrit_translator_gerrit as gerrit;

use cdevents::{EventKind, Reference};

/// Outcome of routing a single Gerrit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Route {
    Translate(Mapping),
    Ignore(&'static str),
}

/// Field values of the CDEvent an event translates into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mapping {
    pub kind: EventKind,
    pub source: String,
    pub created_on: u64,
    pub subject_id: String,
    pub subject_source: Option<String>,
    pub subject_name: Option<String>,
    pub subject_url: Option<String>,
    pub repository: Option<Reference>,
}

impl Mapping {
    fn new(kind: EventKind, common: &gerrit::CommonFields, subject_id: &str) -> Self {
        Self {
            kind,
            source: common.repo_url.clone(),
            created_on: common.created_on,
            subject_id: subject_id.to_string(),
            subject_source: None,
            subject_name: None,
            subject_url: None,
            repository: None,
        }
    }

    fn with_subject_source(self, source: &str) -> Self {
        Self {
            subject_source: Some(source.to_string()),
            ..self
        }
    }

    fn with_subject_name(self, name: &str) -> Self {
        Self {
            subject_name: Some(name.to_string()),
            ..self
        }
    }

    fn with_subject_url(self, url: &str) -> Self {
        Self {
            subject_url: Some(url.to_string()),
            ..self
        }
    }

    fn with_repository(self, repository: Reference) -> Self {
        Self {
            repository: Some(repository),
            ..self
        }
    }

    /// Copy the mapped values into a freshly created event.
    pub fn apply(self, event: &mut cdevents::CDEvent) -> Result<(), cdevents::ConstructionError> {
        event.set_timestamp(cdevents::Timestamp::from_unix_seconds(self.created_on)?);
        event.set_source(self.source);
        event.set_subject_id(self.subject_id);
        if let Some(source) = self.subject_source {
            event.set_subject_source(source);
        }
        if let Some(name) = self.subject_name {
            event.set_subject_name(name);
        }
        if let Some(url) = self.subject_url {
            event.set_subject_url(url);
        }
        if let Some(repository) = self.repository {
            event.set_subject_repository(repository);
        }
        Ok(())
    }
}

pub(crate) fn project_created(event: &gerrit::ProjectCreatedEvent) -> Route {
    Route::Translate(
        Mapping::new(EventKind::RepositoryCreated, &event.common, &event.head_name)
            .with_subject_name(&event.project_name)
            .with_subject_url(&event.common.repo_url),
    )
}

pub(crate) fn project_head_updated(event: &gerrit::ProjectHeadUpdatedEvent) -> Route {
    Route::Translate(
        Mapping::new(EventKind::RepositoryModified, &event.common, &event.new_head)
            .with_subject_name(&event.project_name)
            .with_subject_url(&event.new_head),
    )
}

/// Branch creation and deletion. Change refs are skipped here even when they
/// carry a null revision: the patchset and change events describe them.
pub(crate) fn ref_updated(event: &gerrit::RefUpdatedEvent) -> Route {
    let update = &event.ref_update;

    let (kind, subject_id) = if update.is_change_ref() {
        return Route::Ignore("change refs are covered by patchset and change events");
    } else if update.is_creation() {
        (EventKind::BranchCreated, &update.new_rev)
    } else if update.is_deletion() {
        (EventKind::BranchDeleted, &update.old_rev)
    } else {
        return Route::Ignore("branch updates are not translated");
    };

    Route::Translate(
        Mapping::new(kind, &event.common, subject_id)
            .with_subject_source(&update.project)
            .with_repository(Reference::new(&update.ref_name).with_source(&update.project)),
    )
}

pub(crate) fn patchset_created(event: &gerrit::PatchsetCreatedEvent) -> Route {
    let kind = if event.change.patchset.number == 1 {
        EventKind::ChangeCreated
    } else {
        EventKind::ChangeUpdated
    };
    Route::Translate(change(kind, &event.common, &event.change))
}

pub(crate) fn comment_added(event: &gerrit::CommentAddedEvent) -> Route {
    Route::Translate(change(EventKind::ChangeReviewed, &event.common, &event.change))
}

pub(crate) fn change_merged(event: &gerrit::ChangeMergedEvent) -> Route {
    Route::Translate(change(EventKind::ChangeMerged, &event.common, &event.change))
}

pub(crate) fn change_abandoned(event: &gerrit::ChangeAbandonedEvent) -> Route {
    Route::Translate(change(EventKind::ChangeAbandoned, &event.common, &event.change))
}

// The subject id of change events is the target branch, not the change id.
fn change(
    kind: EventKind,
    common: &gerrit::CommonFields,
    fields: &gerrit::ChangeFields,
) -> Mapping {
    Mapping::new(kind, common, &fields.change.branch)
        .with_subject_source(&fields.change.url)
        .with_repository(Reference::new(&fields.project.name))
}
