use std::any::Any;

use super::document::{DocumentBuilder, DocumentFormatError, Emit};
use super::parser::DocumentParser;

/// Schema violation inside a component's sub-document. Always carries the
/// owning watch id; action-scoped failures carry the action id as well.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("watch [{watch_id}]: could not parse [{kind}] {family}: {reason}")]
    Component {
        watch_id: String,
        family: &'static str,
        kind: String,
        reason: String,
    },
    #[error("watch [{watch_id}] action [{action_id}]: could not parse [{kind}] action: {reason}")]
    Action {
        watch_id: String,
        action_id: String,
        kind: String,
        reason: String,
    },
    #[error("watch [{watch_id}]: missing required field [{field}]")]
    MissingField { watch_id: String, field: &'static str },
    #[error("watch [{watch_id}]: unexpected field [{field}]")]
    UnexpectedField { watch_id: String, field: String },
    #[error("watch [{watch_id}]: unknown {family} type [{kind}]")]
    UnknownComponentType {
        watch_id: String,
        family: &'static str,
        kind: String,
    },
    #[error("watch [{watch_id}] action [{action_id}]: unknown action type [{kind}]")]
    UnknownActionType {
        watch_id: String,
        action_id: String,
        kind: String,
    },
    #[error("watch [{watch_id}]: malformed watch source: {source}")]
    Document {
        watch_id: String,
        #[source]
        source: DocumentFormatError,
    },
}

impl ParseError {
    pub fn component(
        watch_id: &str,
        family: &'static str,
        kind: &str,
        reason: impl Into<String>,
    ) -> Self {
        ParseError::Component {
            watch_id: watch_id.to_string(),
            family,
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    pub fn action(
        watch_id: &str,
        action_id: &str,
        kind: &str,
        reason: impl Into<String>,
    ) -> Self {
        ParseError::Action {
            watch_id: watch_id.to_string(),
            action_id: action_id.to_string(),
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    pub fn document(watch_id: &str, source: DocumentFormatError) -> Self {
        ParseError::Document {
            watch_id: watch_id.to_string(),
            source,
        }
    }
}

/// When the watch should be checked.
pub trait Trigger: Emit + Send + Sync {
    fn kind(&self) -> &'static str;
}

/// What data the watch evaluation loads as its payload.
pub trait Input: Emit + Send + Sync {
    fn kind(&self) -> &'static str;
}

/// Whether the watch's actions should run for a given payload.
pub trait Condition: Emit + Send + Sync {
    fn kind(&self) -> &'static str;
}

/// Reshapes the payload before the watch (or one action) consumes it.
pub trait Transform: Emit + Send + Sync {
    fn kind(&self) -> &'static str;
}

/// Declarative side of an action. The runtime side is built from it by the
/// registered factory; `as_any` lets that factory recover the concrete type.
pub trait Action: Emit + Send + Sync {
    fn kind(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

macro_rules! impl_debug_by_kind {
    ($($trait_:ident),+ $(,)?) => {
        $(
            impl std::fmt::Debug for dyn $trait_ + '_ {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.debug_struct(stringify!($trait_))
                        .field("kind", &self.kind())
                        .finish()
                }
            }
        )+
    };
}

impl_debug_by_kind!(Trigger, Input, Condition, Transform, Action);

pub trait TriggerFactory: Send + Sync {
    fn kind(&self) -> &'static str;
    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Trigger>, ParseError>;
}

pub trait InputFactory: Send + Sync {
    fn kind(&self) -> &'static str;
    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Input>, ParseError>;
}

pub trait ConditionFactory: Send + Sync {
    fn kind(&self) -> &'static str;
    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Condition>, ParseError>;
}

pub trait TransformFactory: Send + Sync {
    fn kind(&self) -> &'static str;
    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Transform>, ParseError>;
}

/// Default input: loads nothing, the payload stays empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoneInput;

impl NoneInput {
    pub const KIND: &'static str = "none";
}

impl Emit for NoneInput {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        builder.start_object()?.end_object()?;
        Ok(())
    }
}

impl Input for NoneInput {
    fn kind(&self) -> &'static str {
        Self::KIND
    }
}

pub struct NoneInputFactory;

impl InputFactory for NoneInputFactory {
    fn kind(&self) -> &'static str {
        NoneInput::KIND
    }

    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Input>, ParseError> {
        consume_empty_body(watch_id, "input", NoneInput::KIND, parser)?;
        Ok(Box::new(NoneInput))
    }
}

/// Default condition: the actions always run.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysCondition;

impl AlwaysCondition {
    pub const KIND: &'static str = "always";
}

impl Emit for AlwaysCondition {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        builder.start_object()?.end_object()?;
        Ok(())
    }
}

impl Condition for AlwaysCondition {
    fn kind(&self) -> &'static str {
        Self::KIND
    }
}

pub struct AlwaysConditionFactory;

impl ConditionFactory for AlwaysConditionFactory {
    fn kind(&self) -> &'static str {
        AlwaysCondition::KIND
    }

    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Condition>, ParseError> {
        consume_empty_body(watch_id, "condition", AlwaysCondition::KIND, parser)?;
        Ok(Box::new(AlwaysCondition))
    }
}

fn consume_empty_body(
    watch_id: &str,
    family: &'static str,
    kind: &'static str,
    parser: &mut DocumentParser,
) -> Result<(), ParseError> {
    parser
        .expect_object_start()
        .map_err(|e| ParseError::component(watch_id, family, kind, e.to_string()))?;
    match parser
        .next_field()
        .map_err(|e| ParseError::component(watch_id, family, kind, e.to_string()))?
    {
        None => Ok(()),
        Some(field) => Err(ParseError::component(
            watch_id,
            family,
            kind,
            format!("unexpected field [{field}]"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::Document;

    #[test]
    fn none_input_round_trips_an_empty_body() {
        let mut b = DocumentBuilder::new();
        NoneInput.emit(&mut b).unwrap();
        let doc = b.finish().unwrap();
        assert_eq!(doc, Document::empty_object());

        let mut p = DocumentParser::new(&doc);
        let input = NoneInputFactory.parse("w1", &mut p).unwrap();
        assert_eq!(input.kind(), "none");
    }

    #[test]
    fn always_condition_rejects_fields() {
        let doc = Document::Object(vec![("x".to_string(), Document::Int(1))]);
        let mut p = DocumentParser::new(&doc);
        let err = AlwaysConditionFactory.parse("w1", &mut p).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("watch [w1]"), "{msg}");
        assert!(msg.contains("unexpected field [x]"), "{msg}");
    }
}
