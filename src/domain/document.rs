use serde_json::Value as JsonValue;

/// Ordered, nested document value. The wire/storage shape of every
/// declarative entity: watch definitions, component bodies, action results.
///
/// Object fields keep insertion order so an emitted watch is byte-stable
/// across repeated emissions.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    Object(Vec<(String, Document)>),
    Array(Vec<Document>),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
}

impl Document {
    pub fn empty_object() -> Self {
        Document::Object(Vec::new())
    }

    /// Field lookup on an object; `None` for non-objects and missing keys.
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Object(fields) => {
                fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// Dotted-path lookup, e.g. `payload.response.status`.
    pub fn path(&self, path: &str) -> Option<&Document> {
        let mut current = self;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Document::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Scalar rendered as text, used for template substitution.
    pub fn render_scalar(&self) -> Option<String> {
        match self {
            Document::Str(s) => Some(s.clone()),
            Document::Int(n) => Some(n.to_string()),
            Document::Float(n) => Some(n.to_string()),
            Document::Bool(b) => Some(b.to_string()),
            Document::Null => Some(String::new()),
            _ => None,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Document::Object(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Document::Array(items) => {
                JsonValue::Array(items.iter().map(Document::to_json).collect())
            }
            Document::Str(s) => JsonValue::String(s.clone()),
            Document::Int(n) => JsonValue::from(*n),
            Document::Float(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Document::Bool(b) => JsonValue::Bool(*b),
            // text formats have no raw byte scalar
            Document::Bytes(b) => {
                JsonValue::Array(b.iter().map(|x| JsonValue::from(*x)).collect())
            }
            Document::Null => JsonValue::Null,
        }
    }

    fn from_json(value: &JsonValue) -> Document {
        match value {
            JsonValue::Object(map) => Document::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Document::from_json(v)))
                    .collect(),
            ),
            JsonValue::Array(items) => {
                Document::Array(items.iter().map(Document::from_json).collect())
            }
            JsonValue::String(s) => Document::Str(s.clone()),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Document::Int(i),
                None => Document::Float(n.as_f64().unwrap_or(0.0)),
            },
            JsonValue::Bool(b) => Document::Bool(*b),
            JsonValue::Null => Document::Null,
        }
    }
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Document::Str(s.to_string())
    }
}

impl From<String> for Document {
    fn from(s: String) -> Self {
        Document::Str(s)
    }
}

impl From<i64> for Document {
    fn from(n: i64) -> Self {
        Document::Int(n)
    }
}

impl From<u16> for Document {
    fn from(n: u16) -> Self {
        Document::Int(i64::from(n))
    }
}

impl From<f64> for Document {
    fn from(n: f64) -> Self {
        Document::Float(n)
    }
}

impl From<bool> for Document {
    fn from(b: bool) -> Self {
        Document::Bool(b)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentFormatError {
    #[error("unexpected token {found} (expected {expected})")]
    UnexpectedToken { expected: &'static str, found: String },
    #[error("unexpected end of document")]
    UnexpectedEnd,
    #[error("unbalanced document structure: {0}")]
    Unbalanced(String),
    #[error("{format} codec error: {message}")]
    Codec { format: &'static str, message: String },
}

/// Wire encodings for an emitted document tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Yaml,
}

impl WireFormat {
    pub fn encode(&self, doc: &Document) -> Result<Vec<u8>, DocumentFormatError> {
        let json = doc.to_json();
        match self {
            WireFormat::Json => serde_json::to_vec(&json).map_err(|e| {
                DocumentFormatError::Codec {
                    format: "json",
                    message: e.to_string(),
                }
            }),
            WireFormat::Yaml => serde_yaml::to_string(&json)
                .map(String::into_bytes)
                .map_err(|e| DocumentFormatError::Codec {
                    format: "yaml",
                    message: e.to_string(),
                }),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Document, DocumentFormatError> {
        let json: JsonValue = match self {
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| DocumentFormatError::Codec {
                    format: "json",
                    message: e.to_string(),
                })?
            }
            WireFormat::Yaml => {
                serde_yaml::from_slice(bytes).map_err(|e| DocumentFormatError::Codec {
                    format: "yaml",
                    message: e.to_string(),
                })?
            }
        };
        Ok(Document::from_json(&json))
    }
}

/// A value that writes its own body (a complete object) into a builder.
/// Components implement this; the container nests the emission under the
/// component's discriminator via [`DocumentBuilder::component`].
pub trait Emit {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError>;
}

enum Frame {
    Object {
        fields: Vec<(String, Document)>,
        // field name this container will occupy in its parent object
        owner_field: Option<String>,
    },
    Array {
        items: Vec<Document>,
        owner_field: Option<String>,
    },
}

/// Incremental writer for a [`Document`] tree.
pub struct DocumentBuilder {
    stack: Vec<Frame>,
    pending_field: Option<String>,
    root: Option<Document>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            pending_field: None,
            root: None,
        }
    }

    pub fn start_object(&mut self) -> Result<&mut Self, DocumentFormatError> {
        self.check_placement("object")?;
        let owner_field = self.pending_field.take();
        self.stack.push(Frame::Object {
            fields: Vec::new(),
            owner_field,
        });
        Ok(self)
    }

    pub fn end_object(&mut self) -> Result<&mut Self, DocumentFormatError> {
        match self.stack.pop() {
            Some(Frame::Object {
                fields,
                owner_field,
            }) => {
                self.pending_field = owner_field;
                self.place(Document::Object(fields))?;
                Ok(self)
            }
            other => {
                // put it back so finish() still reports the imbalance
                if let Some(frame) = other {
                    self.stack.push(frame);
                }
                Err(DocumentFormatError::Unbalanced(
                    "end_object without matching start_object".to_string(),
                ))
            }
        }
    }

    pub fn start_array(&mut self) -> Result<&mut Self, DocumentFormatError> {
        self.check_placement("array")?;
        let owner_field = self.pending_field.take();
        self.stack.push(Frame::Array {
            items: Vec::new(),
            owner_field,
        });
        Ok(self)
    }

    pub fn end_array(&mut self) -> Result<&mut Self, DocumentFormatError> {
        match self.stack.pop() {
            Some(Frame::Array { items, owner_field }) => {
                self.pending_field = owner_field;
                self.place(Document::Array(items))?;
                Ok(self)
            }
            other => {
                if let Some(frame) = other {
                    self.stack.push(frame);
                }
                Err(DocumentFormatError::Unbalanced(
                    "end_array without matching start_array".to_string(),
                ))
            }
        }
    }

    /// Opens an object nested under `name`, mirroring `field` + `start_object`.
    pub fn object_field(&mut self, name: &str) -> Result<&mut Self, DocumentFormatError> {
        self.field_name(name)?;
        self.start_object()
    }

    pub fn field<T: Into<Document>>(
        &mut self,
        name: &str,
        value: T,
    ) -> Result<&mut Self, DocumentFormatError> {
        self.field_name(name)?;
        self.place(value.into())?;
        Ok(self)
    }

    /// Writes a pre-built document verbatim under `name`.
    pub fn raw_field(
        &mut self,
        name: &str,
        value: Document,
    ) -> Result<&mut Self, DocumentFormatError> {
        self.field_name(name)?;
        self.place(value)?;
        Ok(self)
    }

    /// Writes a typed component nested under its discriminator:
    /// `name` becomes the field key, the value emits its own body.
    pub fn component<E: Emit + ?Sized>(
        &mut self,
        name: &str,
        value: &E,
    ) -> Result<&mut Self, DocumentFormatError> {
        self.field_name(name)?;
        value.emit(self)?;
        Ok(self)
    }

    pub fn value<T: Into<Document>>(&mut self, value: T) -> Result<&mut Self, DocumentFormatError> {
        self.place(value.into())?;
        Ok(self)
    }

    pub fn finish(mut self) -> Result<Document, DocumentFormatError> {
        if !self.stack.is_empty() {
            return Err(DocumentFormatError::Unbalanced(format!(
                "{} container(s) left open",
                self.stack.len()
            )));
        }
        self.root
            .take()
            .ok_or_else(|| DocumentFormatError::Unbalanced("empty builder".to_string()))
    }

    fn field_name(&mut self, name: &str) -> Result<(), DocumentFormatError> {
        if self.pending_field.is_some() {
            return Err(DocumentFormatError::Unbalanced(format!(
                "field [{name}] written while another field awaits a value"
            )));
        }
        match self.stack.last() {
            Some(Frame::Object { .. }) => {
                self.pending_field = Some(name.to_string());
                Ok(())
            }
            _ => Err(DocumentFormatError::Unbalanced(format!(
                "field [{name}] written outside an object"
            ))),
        }
    }

    fn check_placement(&self, what: &str) -> Result<(), DocumentFormatError> {
        match self.stack.last() {
            None if self.root.is_some() => Err(DocumentFormatError::Unbalanced(format!(
                "{what} started after the root value was closed"
            ))),
            Some(Frame::Object { .. }) if self.pending_field.is_none() => {
                Err(DocumentFormatError::Unbalanced(format!(
                    "{what} started inside an object without a field name"
                )))
            }
            _ => Ok(()),
        }
    }

    fn place(&mut self, value: Document) -> Result<(), DocumentFormatError> {
        let field = self.pending_field.take();
        match self.stack.last_mut() {
            Some(Frame::Object { fields, .. }) => match field {
                Some(name) => {
                    // last write wins, matching map semantics
                    fields.retain(|(k, _)| *k != name);
                    fields.push((name, value));
                    Ok(())
                }
                None => Err(DocumentFormatError::Unbalanced(
                    "value written inside an object without a field name".to_string(),
                )),
            },
            Some(Frame::Array { items, .. }) => {
                items.push(value);
                Ok(())
            }
            None => {
                if self.root.is_some() {
                    return Err(DocumentFormatError::Unbalanced(
                        "more than one root value".to_string(),
                    ));
                }
                self.root = Some(value);
                Ok(())
            }
        }
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_object_in_order() {
        let mut b = DocumentBuilder::new();
        b.start_object()
            .unwrap()
            .field("name", "ops")
            .unwrap()
            .object_field("nested")
            .unwrap()
            .field("count", 3i64)
            .unwrap()
            .end_object()
            .unwrap()
            .end_object()
            .unwrap();
        let doc = b.finish().unwrap();

        assert_eq!(doc.get("name").and_then(Document::as_str), Some("ops"));
        assert_eq!(doc.path("nested.count").and_then(Document::as_i64), Some(3));
        match &doc {
            Document::Object(fields) => {
                assert_eq!(fields[0].0, "name");
                assert_eq!(fields[1].0, "nested");
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unbalanced_structure() {
        let mut b = DocumentBuilder::new();
        b.start_object().unwrap();
        assert!(matches!(
            b.finish(),
            Err(DocumentFormatError::Unbalanced(_))
        ));

        let mut b = DocumentBuilder::new();
        assert!(b.end_object().is_err());
    }

    #[test]
    fn rejects_field_outside_object() {
        let mut b = DocumentBuilder::new();
        assert!(b.field("x", 1i64).is_err());
    }

    #[test]
    fn overwrites_repeated_field() {
        let mut b = DocumentBuilder::new();
        b.start_object().unwrap();
        b.field("x", 1i64).unwrap();
        b.field("x", 2i64).unwrap();
        b.end_object().unwrap();
        let doc = b.finish().unwrap();
        assert_eq!(doc.get("x").and_then(Document::as_i64), Some(2));
        match &doc {
            Document::Object(fields) => assert_eq!(fields.len(), 1),
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn json_round_trip_keeps_content() {
        let mut b = DocumentBuilder::new();
        b.start_object().unwrap();
        b.field("s", "text").unwrap();
        b.field("n", 42i64).unwrap();
        b.field("f", 1.5f64).unwrap();
        b.field("b", true).unwrap();
        b.raw_field("nil", Document::Null).unwrap();
        b.end_object().unwrap();
        let doc = b.finish().unwrap();

        let bytes = WireFormat::Json.encode(&doc).unwrap();
        let back = WireFormat::Json.decode(&bytes).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn bytes_encode_as_integer_array() {
        let doc = Document::Object(vec![(
            "raw".to_string(),
            Document::Bytes(vec![1, 2, 255]),
        )]);
        let bytes = WireFormat::Json.encode(&doc).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("[1,2,255]"));
    }

    #[test]
    fn yaml_round_trip_keeps_content() {
        let doc = Document::Object(vec![
            ("a".to_string(), Document::Str("x".to_string())),
            ("b".to_string(), Document::Int(7)),
        ]);
        let bytes = WireFormat::Yaml.encode(&doc).unwrap();
        let back = WireFormat::Yaml.decode(&bytes).unwrap();
        assert_eq!(doc, back);
    }
}
