use std::collections::BTreeMap;
use std::time::Duration;

use super::component::{Action, AlwaysCondition, Condition, Input, NoneInput, Transform, Trigger};
use super::document::{Document, DocumentBuilder, DocumentFormatError, Emit, WireFormat};
use super::watch::fields;

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("failed to build watch source: no trigger defined")]
    NoTrigger,
    #[error("failed to build watch source: {0}")]
    Emit(#[from] DocumentFormatError),
    #[error("failed to encode watch source: {source}")]
    Encode {
        #[source]
        source: DocumentFormatError,
    },
}

/// Assembles a watch definition and emits it as a document.
///
/// Setters overwrite (last write wins); `add_action` accumulates by id, and
/// re-adding an id replaces that entry. `emit` does not consume or mutate the
/// builder, so the same configuration can be emitted repeatedly.
pub struct WatchSourceBuilder {
    trigger: Option<Box<dyn Trigger>>,
    input: Box<dyn Input>,
    condition: Box<dyn Condition>,
    transform: Option<Box<dyn Transform>>,
    throttle_period: Option<Duration>,
    actions: BTreeMap<String, TransformedAction>,
    metadata: Option<Document>,
}

impl WatchSourceBuilder {
    pub fn new() -> Self {
        Self {
            trigger: None,
            input: Box::new(NoneInput),
            condition: Box::new(AlwaysCondition),
            transform: None,
            throttle_period: None,
            actions: BTreeMap::new(),
            metadata: None,
        }
    }

    pub fn trigger(mut self, trigger: impl Trigger + 'static) -> Self {
        self.trigger = Some(Box::new(trigger));
        self
    }

    pub fn input(mut self, input: impl Input + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn condition(mut self, condition: impl Condition + 'static) -> Self {
        self.condition = Box::new(condition);
        self
    }

    pub fn transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn throttle_period(mut self, period: Duration) -> Self {
        self.throttle_period = Some(period);
        self
    }

    pub fn add_action(self, id: &str, action: impl Action + 'static) -> Self {
        self.put_action(id, None, Box::new(action))
    }

    pub fn add_action_with_transform(
        self,
        id: &str,
        transform: impl Transform + 'static,
        action: impl Action + 'static,
    ) -> Self {
        self.put_action(id, Some(Box::new(transform)), Box::new(action))
    }

    pub fn metadata(mut self, metadata: Document) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn put_action(
        mut self,
        id: &str,
        transform: Option<Box<dyn Transform>>,
        action: Box<dyn Action>,
    ) -> Self {
        self.actions.insert(
            id.to_string(),
            TransformedAction {
                action,
                transform,
            },
        );
        self
    }

    /// Emits the configured watch as a document. Fails fast if no trigger was
    /// set; everything else is optional or defaulted.
    pub fn emit(&self) -> Result<Document, BuilderError> {
        let trigger = self.trigger.as_deref().ok_or(BuilderError::NoTrigger)?;

        let mut b = DocumentBuilder::new();
        b.start_object()?;

        b.object_field(fields::TRIGGER)?
            .component(trigger.kind(), trigger)?
            .end_object()?;

        b.object_field(fields::INPUT)?
            .component(self.input.kind(), self.input.as_ref())?
            .end_object()?;

        b.object_field(fields::CONDITION)?
            .component(self.condition.kind(), self.condition.as_ref())?
            .end_object()?;

        if let Some(transform) = &self.transform {
            b.object_field(fields::TRANSFORM)?
                .component(transform.kind(), transform.as_ref())?
                .end_object()?;
        }

        if let Some(period) = self.throttle_period {
            b.field(fields::THROTTLE_PERIOD, period.as_millis() as i64)?;
        }

        b.object_field(fields::ACTIONS)?;
        for (id, entry) in &self.actions {
            b.component(id, entry)?;
        }
        b.end_object()?;

        if let Some(metadata) = &self.metadata {
            b.raw_field(fields::METADATA, metadata.clone())?;
        }

        b.end_object()?;
        Ok(b.finish()?)
    }

    /// Emits and encodes in one step; encoding failures keep their cause.
    pub fn build_as_bytes(&self, format: WireFormat) -> Result<Vec<u8>, BuilderError> {
        let doc = self.emit()?;
        format
            .encode(&doc)
            .map_err(|source| BuilderError::Encode { source })
    }
}

impl Default for WatchSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One builder-side action entry: the action plus its optional per-action
/// transform, emitted as `{transform?: {...}, <action-kind>: {...}}`.
struct TransformedAction {
    action: Box<dyn Action>,
    transform: Option<Box<dyn Transform>>,
}

impl Emit for TransformedAction {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        builder.start_object()?;
        if let Some(transform) = &self.transform {
            builder
                .object_field(fields::TRANSFORM)?
                .component(transform.kind(), transform.as_ref())?
                .end_object()?;
        }
        builder.component(self.action.kind(), self.action.as_ref())?;
        builder.end_object()?;
        Ok(())
    }
}
