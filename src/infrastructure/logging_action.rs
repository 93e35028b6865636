use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::{
    ActionFactory, ActionResult, ConfigError, ExecutableAction, ExecutionContext, Status,
    TemplateEngine,
};
use crate::domain::{
    Action, DocumentBuilder, DocumentFormatError, DocumentParser, Emit, ParseError, Wid,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Writes a rendered line to the log when the watch fires. Body:
/// `{"text": <template>, "level"?: "trace|debug|info|warn|error"}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingAction {
    text: String,
    level: LogLevel,
}

impl LoggingAction {
    pub const KIND: &'static str = "logging";

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: LogLevel::Info,
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Emit for LoggingAction {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        builder
            .start_object()?
            .field("text", self.text.as_str())?
            .field("level", self.level.as_str())?
            .end_object()?;
        Ok(())
    }
}

impl Action for LoggingAction {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoggingResult {
    Logged { text: String },
    Failure { reason: String },
    Throttled { reason: String },
}

impl Emit for LoggingResult {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        builder.start_object()?;
        builder.field("status", self.status().as_str())?;
        match self {
            LoggingResult::Logged { text } => builder.field("logged_text", text.as_str())?,
            LoggingResult::Failure { reason } | LoggingResult::Throttled { reason } => {
                builder.field("reason", reason.as_str())?
            }
        };
        builder.end_object()?;
        Ok(())
    }
}

impl ActionResult for LoggingResult {
    fn kind(&self) -> &'static str {
        LoggingAction::KIND
    }

    fn status(&self) -> Status {
        match self {
            LoggingResult::Logged { .. } => Status::Success,
            LoggingResult::Failure { .. } => Status::Failure,
            LoggingResult::Throttled { .. } => Status::Throttled,
        }
    }
}

pub struct LoggingActionFactory {
    templates: Arc<dyn TemplateEngine>,
}

impl LoggingActionFactory {
    pub fn new(templates: Arc<dyn TemplateEngine>) -> Self {
        Self { templates }
    }
}

impl ActionFactory for LoggingActionFactory {
    fn kind(&self) -> &'static str {
        LoggingAction::KIND
    }

    fn parse_action(
        &self,
        watch_id: &str,
        action_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Action>, ParseError> {
        let fail = |reason: String| {
            ParseError::action(watch_id, action_id, LoggingAction::KIND, reason)
        };

        parser.expect_object_start().map_err(|e| fail(e.to_string()))?;
        let mut text: Option<String> = None;
        let mut level = LogLevel::Info;
        while let Some(field) = parser.next_field().map_err(|e| fail(e.to_string()))? {
            match field.as_str() {
                "text" => text = Some(parser.read_string().map_err(|e| fail(e.to_string()))?),
                "level" => {
                    let raw = parser.read_string().map_err(|e| fail(e.to_string()))?;
                    level = LogLevel::parse(&raw).ok_or_else(|| {
                        fail(format!("field [level] has unknown value [{raw}]"))
                    })?;
                }
                other => return Err(fail(format!("unexpected field [{other}]"))),
            }
        }

        let text = text.ok_or_else(|| fail("missing field [text]".to_string()))?;
        Ok(Box::new(LoggingAction::new(text).level(level)))
    }

    fn parse_result(
        &self,
        wid: &Wid,
        action_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn ActionResult>, ParseError> {
        let fail = |reason: String| {
            ParseError::action(wid.watch_id(), action_id, LoggingAction::KIND, reason)
        };

        parser.expect_object_start().map_err(|e| fail(e.to_string()))?;
        let mut status: Option<Status> = None;
        let mut logged_text: Option<String> = None;
        let mut reason: Option<String> = None;
        while let Some(field) = parser.next_field().map_err(|e| fail(e.to_string()))? {
            match field.as_str() {
                "status" => {
                    let raw = parser.read_string().map_err(|e| fail(e.to_string()))?;
                    status = Some(Status::parse(&raw).ok_or_else(|| {
                        fail(format!("field [status] has unknown value [{raw}]"))
                    })?);
                }
                "logged_text" => {
                    logged_text = Some(parser.read_string().map_err(|e| fail(e.to_string()))?)
                }
                "reason" => reason = Some(parser.read_string().map_err(|e| fail(e.to_string()))?),
                other => return Err(fail(format!("unexpected field [{other}]"))),
            }
        }

        match status.ok_or_else(|| fail("missing field [status]".to_string()))? {
            Status::Success => Ok(Box::new(LoggingResult::Logged {
                text: logged_text
                    .ok_or_else(|| fail("missing field [logged_text]".to_string()))?,
            })),
            Status::Failure => Ok(Box::new(LoggingResult::Failure {
                reason: reason.ok_or_else(|| fail("missing field [reason]".to_string()))?,
            })),
            Status::Throttled => Ok(Box::new(LoggingResult::Throttled {
                reason: reason.ok_or_else(|| fail("missing field [reason]".to_string()))?,
            })),
        }
    }

    fn create_executable(
        &self,
        action: &dyn Action,
    ) -> Result<Box<dyn ExecutableAction>, ConfigError> {
        let action = action
            .as_any()
            .downcast_ref::<LoggingAction>()
            .ok_or(ConfigError::ActionTypeMismatch {
                kind: LoggingAction::KIND,
            })?;
        Ok(Box::new(ExecutableLoggingAction {
            action: action.clone(),
            templates: Arc::clone(&self.templates),
        }))
    }
}

pub struct ExecutableLoggingAction {
    action: LoggingAction,
    templates: Arc<dyn TemplateEngine>,
}

#[async_trait]
impl ExecutableAction for ExecutableLoggingAction {
    fn action_kind(&self) -> &'static str {
        LoggingAction::KIND
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Box<dyn ActionResult> {
        let text = match self.templates.render(&self.action.text, &ctx.payload) {
            Ok(text) => text,
            Err(e) => {
                return Box::new(LoggingResult::Failure {
                    reason: format!("failed to render log text: {e}"),
                })
            }
        };

        match self.action.level {
            LogLevel::Trace => tracing::trace!(wid = %ctx.wid, action_id = %ctx.action_id, "{text}"),
            LogLevel::Debug => tracing::debug!(wid = %ctx.wid, action_id = %ctx.action_id, "{text}"),
            LogLevel::Info => tracing::info!(wid = %ctx.wid, action_id = %ctx.action_id, "{text}"),
            LogLevel::Warn => tracing::warn!(wid = %ctx.wid, action_id = %ctx.action_id, "{text}"),
            LogLevel::Error => tracing::error!(wid = %ctx.wid, action_id = %ctx.action_id, "{text}"),
        }
        Box::new(LoggingResult::Logged { text })
    }
}
