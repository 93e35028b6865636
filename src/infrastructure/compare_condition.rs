use std::cmp::Ordering;

use crate::domain::{
    Condition, ConditionFactory, Document, DocumentBuilder, DocumentFormatError, DocumentParser,
    Emit, ParseError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "gt" => Some(CompareOp::Gt),
            "gte" => Some(CompareOp::Gte),
            "lt" => Some(CompareOp::Lt),
            "lte" => Some(CompareOp::Lte),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
        }
    }
}

/// Compares a dotted payload path against a fixed value. Body:
/// `{"path": "...", "op": "eq|ne|gt|gte|lt|lte", "value": <scalar>}`.
#[derive(Clone, Debug, PartialEq)]
pub struct CompareCondition {
    path: String,
    op: CompareOp,
    value: Document,
}

impl CompareCondition {
    pub const KIND: &'static str = "compare";

    pub fn new(path: impl Into<String>, op: CompareOp, value: Document) -> Self {
        Self {
            path: path.into(),
            op,
            value,
        }
    }

    /// True when the payload value at `path` satisfies the comparison.
    /// A missing path never matches (not even `ne`): an absent field says
    /// nothing about the value.
    pub fn evaluate(&self, payload: &Document) -> bool {
        let Some(actual) = payload.path(&self.path) else {
            return false;
        };
        let Some(ordering) = compare(actual, &self.value) else {
            return false;
        };
        match self.op {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }
}

fn compare(left: &Document, right: &Document) -> Option<Ordering> {
    match (left, right) {
        (Document::Int(a), Document::Int(b)) => Some(a.cmp(b)),
        (Document::Int(a), Document::Float(b)) => (*a as f64).partial_cmp(b),
        (Document::Float(a), Document::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Document::Float(a), Document::Float(b)) => a.partial_cmp(b),
        (Document::Str(a), Document::Str(b)) => Some(a.cmp(b)),
        (Document::Bool(a), Document::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

impl Emit for CompareCondition {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        builder
            .start_object()?
            .field("path", self.path.as_str())?
            .field("op", self.op.as_str())?
            .raw_field("value", self.value.clone())?
            .end_object()?;
        Ok(())
    }
}

impl Condition for CompareCondition {
    fn kind(&self) -> &'static str {
        Self::KIND
    }
}

pub struct CompareConditionFactory;

impl ConditionFactory for CompareConditionFactory {
    fn kind(&self) -> &'static str {
        CompareCondition::KIND
    }

    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Condition>, ParseError> {
        let fail = |reason: String| {
            ParseError::component(watch_id, "condition", CompareCondition::KIND, reason)
        };

        parser.expect_object_start().map_err(|e| fail(e.to_string()))?;
        let mut path: Option<String> = None;
        let mut op: Option<CompareOp> = None;
        let mut value: Option<Document> = None;
        while let Some(field) = parser.next_field().map_err(|e| fail(e.to_string()))? {
            match field.as_str() {
                "path" => path = Some(parser.read_string().map_err(|e| fail(e.to_string()))?),
                "op" => {
                    let raw = parser.read_string().map_err(|e| fail(e.to_string()))?;
                    op = Some(CompareOp::parse(&raw).ok_or_else(|| {
                        fail(format!("field [op] has unknown operator [{raw}]"))
                    })?);
                }
                "value" => value = Some(parser.read_value().map_err(|e| fail(e.to_string()))?),
                other => return Err(fail(format!("unexpected field [{other}]"))),
            }
        }

        let path = path.ok_or_else(|| fail("missing field [path]".to_string()))?;
        let op = op.ok_or_else(|| fail("missing field [op]".to_string()))?;
        let value = value.ok_or_else(|| fail("missing field [value]".to_string()))?;
        Ok(Box::new(CompareCondition::new(path, op, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(total: i64) -> Document {
        Document::Object(vec![(
            "hits".to_string(),
            Document::Object(vec![("total".to_string(), Document::Int(total))]),
        )])
    }

    #[test]
    fn evaluates_numeric_comparisons() {
        let cond = CompareCondition::new("hits.total", CompareOp::Gt, Document::Int(5));
        assert!(cond.evaluate(&payload(6)));
        assert!(!cond.evaluate(&payload(5)));

        let cond = CompareCondition::new("hits.total", CompareOp::Lte, Document::Float(5.5));
        assert!(cond.evaluate(&payload(5)));
        assert!(!cond.evaluate(&payload(6)));
    }

    #[test]
    fn missing_path_never_matches() {
        let cond = CompareCondition::new("missing.field", CompareOp::Ne, Document::Int(1));
        assert!(!cond.evaluate(&payload(1)));
    }

    #[test]
    fn round_trips_through_its_body() {
        let cond = CompareCondition::new("hits.total", CompareOp::Gte, Document::Int(10));
        let mut b = DocumentBuilder::new();
        cond.emit(&mut b).unwrap();
        let doc = b.finish().unwrap();

        let mut p = DocumentParser::new(&doc);
        let parsed = CompareConditionFactory.parse("w1", &mut p).unwrap();
        assert_eq!(parsed.kind(), "compare");
    }

    #[test]
    fn rejects_an_unknown_operator() {
        let doc = Document::Object(vec![
            ("path".to_string(), Document::Str("x".to_string())),
            ("op".to_string(), Document::Str("contains".to_string())),
            ("value".to_string(), Document::Int(1)),
        ]);
        let mut p = DocumentParser::new(&doc);
        let err = CompareConditionFactory.parse("w1", &mut p).unwrap_err();
        assert!(err.to_string().contains("unknown operator [contains]"));
    }
}
