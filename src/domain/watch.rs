use chrono::{DateTime, TimeZone, Utc};

use super::component::{Action, Condition, Input, Transform, Trigger};
use super::document::Document;

/// Top-level field names of a watch definition document.
pub mod fields {
    pub const TRIGGER: &str = "trigger";
    pub const INPUT: &str = "input";
    pub const CONDITION: &str = "condition";
    pub const TRANSFORM: &str = "transform";
    pub const THROTTLE_PERIOD: &str = "throttle_period_in_millis";
    pub const ACTIONS: &str = "actions";
    pub const METADATA: &str = "metadata";
}

/// A watch definition re-hydrated from its document form. Independent of the
/// builder that emitted it; immutable once parsed.
pub struct Watch {
    pub id: String,
    pub trigger: Box<dyn Trigger>,
    pub input: Box<dyn Input>,
    pub condition: Box<dyn Condition>,
    pub transform: Option<Box<dyn Transform>>,
    pub throttle_period: Option<std::time::Duration>,
    pub actions: Vec<WatchAction>,
    pub metadata: Option<Document>,
}

impl Watch {
    pub fn action(&self, id: &str) -> Option<&WatchAction> {
        self.actions.iter().find(|a| a.id == id)
    }
}

impl std::fmt::Debug for Watch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watch")
            .field("id", &self.id)
            .field("trigger", &self.trigger.kind())
            .field("input", &self.input.kind())
            .field("condition", &self.condition.kind())
            .field("transform", &self.transform.as_ref().map(|t| t.kind()))
            .field("throttle_period", &self.throttle_period)
            .field("actions", &self.actions)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// One named action of a parsed watch, with its optional per-action
/// transform.
pub struct WatchAction {
    pub id: String,
    pub action: Box<dyn Action>,
    pub transform: Option<Box<dyn Transform>>,
}

impl std::fmt::Debug for WatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchAction")
            .field("id", &self.id)
            .field("action", &self.action.kind())
            .field("transform", &self.transform.as_ref().map(|t| t.kind()))
            .finish()
    }
}

/// Watch instance identifier: one execution run of a watch, used to correlate
/// persisted action results back to the run that produced them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wid {
    watch_id: String,
    execution_time: DateTime<Utc>,
}

impl Wid {
    pub fn new(watch_id: impl Into<String>, execution_time: DateTime<Utc>) -> Self {
        Self {
            watch_id: watch_id.into(),
            execution_time,
        }
    }

    pub fn watch_id(&self) -> &str {
        &self.watch_id
    }

    pub fn execution_time(&self) -> DateTime<Utc> {
        self.execution_time
    }

    /// Canonical form: `{watch_id}_{epoch_millis}`.
    pub fn value(&self) -> String {
        format!("{}_{}", self.watch_id, self.execution_time.timestamp_millis())
    }

    /// Parses the canonical form back. The watch id itself may contain
    /// underscores; the timestamp is everything after the last one.
    pub fn parse(value: &str) -> Option<Self> {
        let (watch_id, millis) = value.rsplit_once('_')?;
        if watch_id.is_empty() {
            return None;
        }
        let millis: i64 = millis.parse().ok()?;
        let execution_time = Utc.timestamp_millis_opt(millis).single()?;
        Some(Self::new(watch_id, execution_time))
    }
}

impl std::fmt::Display for Wid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}
