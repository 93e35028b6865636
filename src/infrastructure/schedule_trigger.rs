use std::time::Duration;

use crate::domain::{
    DocumentBuilder, DocumentFormatError, DocumentParser, Emit, ParseError, Trigger,
    TriggerFactory,
};

/// Fires on a fixed interval. Body: `{"interval_in_millis": <i64>}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleTrigger {
    interval: Duration,
}

impl ScheduleTrigger {
    pub const KIND: &'static str = "schedule";

    pub fn every(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Emit for ScheduleTrigger {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        builder
            .start_object()?
            .field("interval_in_millis", self.interval.as_millis() as i64)?
            .end_object()?;
        Ok(())
    }
}

impl Trigger for ScheduleTrigger {
    fn kind(&self) -> &'static str {
        Self::KIND
    }
}

pub struct ScheduleTriggerFactory;

impl TriggerFactory for ScheduleTriggerFactory {
    fn kind(&self) -> &'static str {
        ScheduleTrigger::KIND
    }

    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Trigger>, ParseError> {
        let fail = |reason: String| {
            ParseError::component(watch_id, "trigger", ScheduleTrigger::KIND, reason)
        };

        parser.expect_object_start().map_err(|e| fail(e.to_string()))?;
        let mut interval: Option<i64> = None;
        while let Some(field) = parser.next_field().map_err(|e| fail(e.to_string()))? {
            match field.as_str() {
                "interval_in_millis" => {
                    interval = Some(parser.read_i64().map_err(|e| fail(e.to_string()))?)
                }
                other => return Err(fail(format!("unexpected field [{other}]"))),
            }
        }

        let interval = interval.ok_or_else(|| fail("missing field [interval_in_millis]".to_string()))?;
        if interval <= 0 {
            return Err(fail(format!(
                "field [interval_in_millis] must be positive, got [{interval}]"
            )));
        }
        Ok(Box::new(ScheduleTrigger::every(Duration::from_millis(
            interval as u64,
        ))))
    }
}
