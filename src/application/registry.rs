use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    fields, Action, AlwaysCondition, Condition, ConditionFactory, Document, DocumentParser,
    Input, InputFactory, NoneInput, ParseError, Transform, TransformFactory, Trigger,
    TriggerFactory, Watch, WatchAction, Wid, WireFormat,
};

use super::executable::{ActionResult, ExecutableAction};

/// Startup wiring failure. Registration happens once at process start, so
/// these never surface at watch-evaluation time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("duplicate {family} type [{kind}] registered")]
    DuplicateType {
        family: &'static str,
        kind: &'static str,
    },
    #[error("[{kind}] action factory received an action of a different type")]
    ActionTypeMismatch { kind: &'static str },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A discriminator with no registered action factory.
#[derive(Debug, thiserror::Error)]
#[error("unknown action type [{kind}] referenced by action [{action_id}]")]
pub struct UnknownActionTypeError {
    pub kind: String,
    pub action_id: String,
}

/// One registered action type: parses definitions, parses persisted results,
/// and binds definitions to shared services as executables. Stateless apart
/// from those injected services; shared across all watches.
pub trait ActionFactory: Send + Sync {
    fn kind(&self) -> &'static str;

    fn parse_action(
        &self,
        watch_id: &str,
        action_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Action>, ParseError>;

    fn parse_result(
        &self,
        wid: &Wid,
        action_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn ActionResult>, ParseError>;

    /// Pure construction; no I/O happens until the executable runs.
    fn create_executable(
        &self,
        action: &dyn Action,
    ) -> Result<Box<dyn ExecutableAction>, ConfigError>;
}

impl std::fmt::Debug for dyn ActionFactory + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionFactory")
            .field("kind", &self.kind())
            .finish()
    }
}

/// Discriminator → factory mapping for all five component families.
/// Populated once at startup, then shared read-only across evaluations.
#[derive(Default)]
pub struct WatchRegistry {
    triggers: HashMap<&'static str, Arc<dyn TriggerFactory>>,
    inputs: HashMap<&'static str, Arc<dyn InputFactory>>,
    conditions: HashMap<&'static str, Arc<dyn ConditionFactory>>,
    transforms: HashMap<&'static str, Arc<dyn TransformFactory>>,
    actions: HashMap<&'static str, Arc<dyn ActionFactory>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_trigger(&mut self, factory: Arc<dyn TriggerFactory>) -> Result<(), ConfigError> {
        let kind = factory.kind();
        if self.triggers.insert(kind, factory).is_some() {
            return Err(ConfigError::DuplicateType {
                family: "trigger",
                kind,
            });
        }
        Ok(())
    }

    pub fn register_input(&mut self, factory: Arc<dyn InputFactory>) -> Result<(), ConfigError> {
        let kind = factory.kind();
        if self.inputs.insert(kind, factory).is_some() {
            return Err(ConfigError::DuplicateType {
                family: "input",
                kind,
            });
        }
        Ok(())
    }

    pub fn register_condition(
        &mut self,
        factory: Arc<dyn ConditionFactory>,
    ) -> Result<(), ConfigError> {
        let kind = factory.kind();
        if self.conditions.insert(kind, factory).is_some() {
            return Err(ConfigError::DuplicateType {
                family: "condition",
                kind,
            });
        }
        Ok(())
    }

    pub fn register_transform(
        &mut self,
        factory: Arc<dyn TransformFactory>,
    ) -> Result<(), ConfigError> {
        let kind = factory.kind();
        if self.transforms.insert(kind, factory).is_some() {
            return Err(ConfigError::DuplicateType {
                family: "transform",
                kind,
            });
        }
        Ok(())
    }

    pub fn register_action(&mut self, factory: Arc<dyn ActionFactory>) -> Result<(), ConfigError> {
        let kind = factory.kind();
        if self.actions.insert(kind, factory).is_some() {
            return Err(ConfigError::DuplicateType {
                family: "action",
                kind,
            });
        }
        Ok(())
    }

    pub fn lookup_action(
        &self,
        kind: &str,
        action_id: &str,
    ) -> Result<&dyn ActionFactory, UnknownActionTypeError> {
        self.actions
            .get(kind)
            .map(Arc::as_ref)
            .ok_or_else(|| UnknownActionTypeError {
                kind: kind.to_string(),
                action_id: action_id.to_string(),
            })
    }

    /// Re-hydrates a watch definition document into typed components.
    /// Missing input/condition fall back to the model defaults; a missing
    /// trigger aborts.
    pub fn parse_watch(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Watch, ParseError> {
        parser
            .expect_object_start()
            .map_err(|e| ParseError::document(watch_id, e))?;

        let mut trigger: Option<Box<dyn Trigger>> = None;
        let mut input: Option<Box<dyn Input>> = None;
        let mut condition: Option<Box<dyn Condition>> = None;
        let mut transform: Option<Box<dyn Transform>> = None;
        let mut throttle_period: Option<Duration> = None;
        let mut actions: Vec<WatchAction> = Vec::new();
        let mut metadata: Option<Document> = None;

        while let Some(field) = self.next_field(watch_id, parser)? {
            match field.as_str() {
                fields::TRIGGER => trigger = Some(self.parse_trigger(watch_id, parser)?),
                fields::INPUT => input = Some(self.parse_input(watch_id, parser)?),
                fields::CONDITION => condition = Some(self.parse_condition(watch_id, parser)?),
                fields::TRANSFORM => transform = Some(self.parse_transform(watch_id, parser)?),
                fields::THROTTLE_PERIOD => {
                    let millis = parser
                        .read_i64()
                        .map_err(|e| ParseError::document(watch_id, e))?;
                    if millis < 0 {
                        return Err(ParseError::component(
                            watch_id,
                            "field",
                            fields::THROTTLE_PERIOD,
                            "must be non-negative",
                        ));
                    }
                    throttle_period = Some(Duration::from_millis(millis as u64));
                }
                fields::ACTIONS => actions = self.parse_actions(watch_id, parser)?,
                fields::METADATA => {
                    metadata = Some(
                        parser
                            .read_value()
                            .map_err(|e| ParseError::document(watch_id, e))?,
                    )
                }
                other => {
                    return Err(ParseError::UnexpectedField {
                        watch_id: watch_id.to_string(),
                        field: other.to_string(),
                    })
                }
            }
        }

        let trigger = trigger.ok_or(ParseError::MissingField {
            watch_id: watch_id.to_string(),
            field: fields::TRIGGER,
        })?;

        Ok(Watch {
            id: watch_id.to_string(),
            trigger,
            input: input.unwrap_or_else(|| Box::new(NoneInput)),
            condition: condition.unwrap_or_else(|| Box::new(AlwaysCondition)),
            transform,
            throttle_period,
            actions,
            metadata,
        })
    }

    pub fn parse_watch_bytes(
        &self,
        watch_id: &str,
        bytes: &[u8],
        format: WireFormat,
    ) -> Result<Watch, ParseError> {
        let mut parser = DocumentParser::from_bytes(bytes, format)
            .map_err(|e| ParseError::document(watch_id, e))?;
        self.parse_watch(watch_id, &mut parser)
    }

    /// Parses a persisted action result document, `{<kind>: {body}}`,
    /// dispatching on the discriminator.
    pub fn parse_action_result(
        &self,
        wid: &Wid,
        action_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn ActionResult>, ParseError> {
        let watch_id = wid.watch_id().to_string();
        parser
            .expect_object_start()
            .map_err(|e| ParseError::document(&watch_id, e))?;
        let kind = self
            .next_field(&watch_id, parser)?
            .ok_or_else(|| ParseError::action(&watch_id, action_id, "?", "empty result document"))?;
        let factory =
            self.lookup_action(&kind, action_id)
                .map_err(|e| ParseError::UnknownActionType {
                    watch_id: watch_id.clone(),
                    action_id: e.action_id,
                    kind: e.kind,
                })?;
        let result = factory.parse_result(wid, action_id, parser)?;
        parser
            .expect_object_end()
            .map_err(|e| ParseError::document(&watch_id, e))?;
        Ok(result)
    }

    fn parse_trigger(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Trigger>, ParseError> {
        let kind = self.open_component(watch_id, parser, "trigger")?;
        let factory = self.triggers.get(kind.as_str()).ok_or_else(|| {
            ParseError::UnknownComponentType {
                watch_id: watch_id.to_string(),
                family: "trigger",
                kind: kind.clone(),
            }
        })?;
        let value = factory.parse(watch_id, parser)?;
        self.close_component(watch_id, parser)?;
        Ok(value)
    }

    fn parse_input(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Input>, ParseError> {
        let kind = self.open_component(watch_id, parser, "input")?;
        let factory =
            self.inputs
                .get(kind.as_str())
                .ok_or_else(|| ParseError::UnknownComponentType {
                    watch_id: watch_id.to_string(),
                    family: "input",
                    kind: kind.clone(),
                })?;
        let value = factory.parse(watch_id, parser)?;
        self.close_component(watch_id, parser)?;
        Ok(value)
    }

    fn parse_condition(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Condition>, ParseError> {
        let kind = self.open_component(watch_id, parser, "condition")?;
        let factory = self.conditions.get(kind.as_str()).ok_or_else(|| {
            ParseError::UnknownComponentType {
                watch_id: watch_id.to_string(),
                family: "condition",
                kind: kind.clone(),
            }
        })?;
        let value = factory.parse(watch_id, parser)?;
        self.close_component(watch_id, parser)?;
        Ok(value)
    }

    fn parse_transform(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Transform>, ParseError> {
        let kind = self.open_component(watch_id, parser, "transform")?;
        let factory = self.transforms.get(kind.as_str()).ok_or_else(|| {
            ParseError::UnknownComponentType {
                watch_id: watch_id.to_string(),
                family: "transform",
                kind: kind.clone(),
            }
        })?;
        let value = factory.parse(watch_id, parser)?;
        self.close_component(watch_id, parser)?;
        Ok(value)
    }

    fn parse_actions(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Vec<WatchAction>, ParseError> {
        parser
            .expect_object_start()
            .map_err(|e| ParseError::document(watch_id, e))?;

        let mut out = Vec::new();
        while let Some(action_id) = self.next_field(watch_id, parser)? {
            parser
                .expect_object_start()
                .map_err(|e| ParseError::document(watch_id, e))?;

            let mut transform: Option<Box<dyn Transform>> = None;
            let mut action: Option<Box<dyn Action>> = None;
            while let Some(field) = self.next_field(watch_id, parser)? {
                if field == fields::TRANSFORM {
                    transform = Some(self.parse_transform(watch_id, parser)?);
                } else {
                    // any other field name is the action's discriminator
                    let factory = self.lookup_action(&field, &action_id).map_err(|e| {
                        ParseError::UnknownActionType {
                            watch_id: watch_id.to_string(),
                            action_id: e.action_id,
                            kind: e.kind,
                        }
                    })?;
                    action = Some(factory.parse_action(watch_id, &action_id, parser)?);
                }
            }

            let action = action.ok_or_else(|| {
                ParseError::action(watch_id, &action_id, "?", "no action type defined")
            })?;
            out.push(WatchAction {
                id: action_id,
                action,
                transform,
            });
        }
        Ok(out)
    }

    /// Consumes the `{<kind>:` wrapper and returns the discriminator, leaving
    /// the parser positioned at the component body.
    fn open_component(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
        family: &'static str,
    ) -> Result<String, ParseError> {
        parser
            .expect_object_start()
            .map_err(|e| ParseError::document(watch_id, e))?;
        self.next_field(watch_id, parser)?.ok_or_else(|| {
            ParseError::component(watch_id, family, "?", "empty component object")
        })
    }

    fn close_component(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<(), ParseError> {
        parser
            .expect_object_end()
            .map_err(|e| ParseError::document(watch_id, e))
    }

    fn next_field(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Option<String>, ParseError> {
        parser
            .next_field()
            .map_err(|e| ParseError::document(watch_id, e))
    }
}
