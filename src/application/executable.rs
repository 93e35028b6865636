use async_trait::async_trait;

use crate::domain::{Document, DocumentBuilder, DocumentFormatError, Emit, Wid};

/// Outcome category of one action execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
    Throttled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Throttled => "throttled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Status::Success),
            "failure" => Some(Status::Failure),
            "throttled" => Some(Status::Throttled),
            _ => None,
        }
    }
}

/// Persisted outcome of one action execution. Emits its body under the same
/// discriminator convention as the action definition, so results round-trip
/// through the owning factory's `parse_result`.
pub trait ActionResult: Emit + Send + Sync {
    fn kind(&self) -> &'static str;
    fn status(&self) -> Status;
}

/// Wraps a result into its discriminator-scoped document form.
pub fn result_document(result: &dyn ActionResult) -> Result<Document, DocumentFormatError> {
    let mut b = DocumentBuilder::new();
    b.start_object()?;
    b.component(result.kind(), result)?;
    b.end_object()?;
    b.finish()
}

/// Everything an executable sees for one run: which execution it belongs to,
/// which action entry fired, and the (possibly transformed) payload.
pub struct ExecutionContext {
    pub wid: Wid,
    pub action_id: String,
    pub payload: Document,
}

impl ExecutionContext {
    pub fn new(wid: Wid, action_id: impl Into<String>, payload: Document) -> Self {
        Self {
            wid,
            action_id: action_id.into(),
            payload,
        }
    }
}

/// Runtime side of an action, bound to shared services by its factory.
///
/// `execute` never fails past this boundary: transport faults, template
/// faults and timeouts are converted into a `Status::Failure` result so the
/// orchestrator always has an outcome to persist.
#[async_trait]
pub trait ExecutableAction: Send + Sync {
    fn action_kind(&self) -> &'static str;
    async fn execute(&self, ctx: &ExecutionContext) -> Box<dyn ActionResult>;
}
