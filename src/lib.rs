//! Translation of Gerrit events into CDEvents.
//!
//! A [`Translator`] takes the raw JSON body of a Gerrit event, picks the
//! event kind from its `type` field, decodes the payload into the record of
//! that kind and emits the matching CDEvent as JSON text.

use std::collections::HashMap;

use serde_json::{Map, Value};

use gerrit_translator_cdevents as cdevents;
use gerrit_translator_gerrit as gerrit;

pub mod args;
mod error;
mod logger;
mod mapping;

pub use error::TranslateError;
pub use logger::Logger;

use gerrit::{EventKind, GerritEvent};
use mapping::Route;

/// Request header carrying the URL of the Gerrit instance.
pub const ORIGIN_URL_HEADER: &str = "X-Origin-Url";

/// Creates and serializes the outbound events.
pub trait EnvelopeFactory {
    fn create(
        &self,
        kind: cdevents::EventKind,
    ) -> Result<cdevents::CDEvent, cdevents::ConstructionError>;

    fn to_json_string(
        &self,
        event: &cdevents::CDEvent,
    ) -> Result<String, cdevents::SerializationError>;
}

impl EnvelopeFactory for cdevents::Factory {
    fn create(
        &self,
        kind: cdevents::EventKind,
    ) -> Result<cdevents::CDEvent, cdevents::ConstructionError> {
        cdevents::Factory::create(self, kind)
    }

    fn to_json_string(
        &self,
        event: &cdevents::CDEvent,
    ) -> Result<String, cdevents::SerializationError> {
        cdevents::to_json_string(event)
    }
}

#[derive(Debug, Default)]
pub struct Builder {
    logger: Logger,
    default_origin_url: String,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger(self, logger: Logger) -> Self {
        Self { logger, ..self }
    }

    /// Origin URL used for requests without an `X-Origin-Url` header.
    pub fn with_default_origin_url(self, default_origin_url: String) -> Self {
        Self {
            default_origin_url,
            ..self
        }
    }

    pub fn build<F>(self, factory: F) -> Translator<F> {
        let Self {
            logger,
            default_origin_url,
        } = self;

        Translator {
            factory,
            logger,
            default_origin_url,
        }
    }
}

#[derive(Debug)]
pub struct Translator<F = cdevents::Factory> {
    factory: F,
    logger: Logger,
    default_origin_url: String,
}

impl<F> Translator<F> {
    pub fn factory(&self) -> &F {
        &self.factory
    }
}

impl<F> Translator<F>
where
    F: EnvelopeFactory,
{
    /// Translate a Gerrit event delivered with the given request headers.
    pub fn translate(
        &self,
        event_body: &str,
        headers: &HashMap<String, String>,
    ) -> Result<String, TranslateError> {
        let origin_url = headers
            .get(ORIGIN_URL_HEADER)
            .or_else(|| {
                headers
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(ORIGIN_URL_HEADER))
                    .map(|(_, value)| value)
            })
            .map_or(self.default_origin_url.as_str(), String::as_str);
        self.translate_event(event_body, origin_url)
    }

    /// Classify a raw Gerrit event by its `type` field and translate it.
    pub fn translate_event(&self, raw: &str, origin_url: &str) -> Result<String, TranslateError> {
        self.logger
            .info(format_args!("translating gerrit event from {:?}", origin_url));

        let fields: Map<String, Value> = serde_json::from_str(raw).map_err(|source| {
            self.logger
                .error(format_args!("failed to decode gerrit event: {}", source));
            TranslateError::Decode { kind: None, source }
        })?;

        let event_type = match fields.get("type") {
            Some(Value::String(event_type)) => event_type.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let kind: EventKind = match event_type.parse() {
            Ok(kind) => kind,
            Err(()) => {
                self.logger.info(format_args!(
                    "not translating gerrit event of type {:?}",
                    event_type
                ));
                return Err(TranslateError::UnsupportedKind { kind: event_type });
            }
        };

        let result = match kind {
            EventKind::ProjectCreated => self.handle(raw, origin_url, mapping::project_created),
            EventKind::ProjectHeadUpdated => {
                self.handle(raw, origin_url, mapping::project_head_updated)
            }
            EventKind::RefUpdated => self.handle(raw, origin_url, mapping::ref_updated),
            EventKind::PatchsetCreated => self.handle(raw, origin_url, mapping::patchset_created),
            EventKind::CommentAdded => self.handle(raw, origin_url, mapping::comment_added),
            EventKind::ChangeMerged => self.handle(raw, origin_url, mapping::change_merged),
            EventKind::ChangeAbandoned => self.handle(raw, origin_url, mapping::change_abandoned),
        };

        match &result {
            Ok(cdevent) => self.logger.debug(format_args!("CDEvent: {}", cdevent)),
            Err(e) if e.is_ignored() => self.logger.info(format_args!("{}", e)),
            Err(e) => self.logger.error(format_args!(
                "failed to translate {} gerrit event: {}",
                kind, e
            )),
        }
        result
    }

    /// Decode `raw` as an event of type `E`, route it and build the CDEvent.
    fn handle<E>(
        &self,
        raw: &str,
        origin_url: &str,
        route: fn(&E) -> Route,
    ) -> Result<String, TranslateError>
    where
        E: GerritEvent,
    {
        let event: E = gerrit::decode(raw, origin_url).map_err(|source| TranslateError::Decode {
            kind: Some(E::KIND),
            source,
        })?;
        self.logger.info(format_args!(
            "received {} gerrit event for project {:?}",
            E::KIND,
            event.project_name()
        ));

        let mapping = match route(&event) {
            Route::Translate(mapping) => mapping,
            Route::Ignore(reason) => {
                return Err(TranslateError::Ignored {
                    kind: E::KIND,
                    reason,
                })
            }
        };

        let output_kind = mapping.kind;
        let mut cdevent = self.factory.create(output_kind)?;
        mapping.apply(&mut cdevent)?;
        let json = self.factory.to_json_string(&cdevent)?;

        self.logger.info(format_args!(
            "translated {} gerrit event into {}",
            E::KIND,
            output_kind
        ));
        Ok(json)
    }
}
