use thiserror::Error;

use gerrit_translator_cdevents as cdevents;
use gerrit_translator_gerrit::EventKind;

#[derive(Debug, Error)]
pub enum TranslateError {
    /// The payload is not JSON, or does not have the shape of its event kind.
    /// `kind` is `None` when the payload could not be read as a JSON object
    /// at all.
    #[error(
        "failed to decode {} payload: {source}",
        .kind.map_or("gerrit event", EventKind::as_str)
    )]
    Decode {
        kind: Option<EventKind>,
        #[source]
        source: serde_json::Error,
    },
    #[error("gerrit event type {kind:?}, not supported for translation")]
    UnsupportedKind { kind: String },
    #[error("ignoring {kind} gerrit event: {reason}")]
    Ignored {
        kind: EventKind,
        reason: &'static str,
    },
    #[error(transparent)]
    EnvelopeConstruction(#[from] cdevents::ConstructionError),
    #[error(transparent)]
    Serialization(#[from] cdevents::SerializationError),
}

impl TranslateError {
    /// Expected outcome for events that have no CDEvent counterpart. Callers
    /// usually skip these silently.
    pub fn is_ignored(&self) -> bool {
        matches!(
            self,
            TranslateError::Ignored { .. } | TranslateError::UnsupportedKind { .. }
        )
    }

    pub fn is_fatal(&self) -> bool {
        !self.is_ignored()
    }
}
