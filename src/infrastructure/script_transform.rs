use crate::domain::{
    DocumentBuilder, DocumentFormatError, DocumentParser, Emit, ParseError, Transform,
    TransformFactory,
};

/// Declarative script transform. Body: `{"script": "<source>"}`. Evaluation
/// belongs to the orchestrator's script runtime; this crate only carries the
/// definition through the document model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptTransform {
    script: String,
}

impl ScriptTransform {
    pub const KIND: &'static str = "script";

    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}

impl Emit for ScriptTransform {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        builder
            .start_object()?
            .field("script", self.script.as_str())?
            .end_object()?;
        Ok(())
    }
}

impl Transform for ScriptTransform {
    fn kind(&self) -> &'static str {
        Self::KIND
    }
}

pub struct ScriptTransformFactory;

impl TransformFactory for ScriptTransformFactory {
    fn kind(&self) -> &'static str {
        ScriptTransform::KIND
    }

    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Transform>, ParseError> {
        let fail = |reason: String| {
            ParseError::component(watch_id, "transform", ScriptTransform::KIND, reason)
        };

        parser.expect_object_start().map_err(|e| fail(e.to_string()))?;
        let mut script: Option<String> = None;
        while let Some(field) = parser.next_field().map_err(|e| fail(e.to_string()))? {
            match field.as_str() {
                "script" => script = Some(parser.read_string().map_err(|e| fail(e.to_string()))?),
                other => return Err(fail(format!("unexpected field [{other}]"))),
            }
        }

        let script = script.ok_or_else(|| fail("missing field [script]".to_string()))?;
        if script.trim().is_empty() {
            return Err(fail("field [script] must not be empty".to_string()));
        }
        Ok(Box::new(ScriptTransform::new(script)))
    }
}
