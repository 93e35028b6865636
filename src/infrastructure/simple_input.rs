use crate::domain::{
    Document, DocumentBuilder, DocumentFormatError, DocumentParser, Emit, Input, InputFactory,
    ParseError,
};

/// Static input: the declared object becomes the execution payload verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct SimpleInput {
    payload: Document,
}

impl SimpleInput {
    pub const KIND: &'static str = "simple";

    /// The payload must be an object; anything else is rejected on parse, so
    /// construction mirrors that.
    pub fn new(payload: Document) -> Option<Self> {
        match payload {
            Document::Object(_) => Some(Self { payload }),
            _ => None,
        }
    }

    pub fn payload(&self) -> &Document {
        &self.payload
    }
}

impl Emit for SimpleInput {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        // the body is the payload itself
        let fields = match &self.payload {
            Document::Object(fields) => fields,
            _ => return Err(DocumentFormatError::Unbalanced("payload is not an object".into())),
        };
        builder.start_object()?;
        for (name, value) in fields {
            builder.raw_field(name, value.clone())?;
        }
        builder.end_object()?;
        Ok(())
    }
}

impl Input for SimpleInput {
    fn kind(&self) -> &'static str {
        Self::KIND
    }
}

pub struct SimpleInputFactory;

impl InputFactory for SimpleInputFactory {
    fn kind(&self) -> &'static str {
        SimpleInput::KIND
    }

    fn parse(
        &self,
        watch_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Input>, ParseError> {
        let payload = parser.read_value().map_err(|e| {
            ParseError::component(watch_id, "input", SimpleInput::KIND, e.to_string())
        })?;
        match SimpleInput::new(payload) {
            Some(input) => Ok(Box::new(input)),
            None => Err(ParseError::component(
                watch_id,
                "input",
                SimpleInput::KIND,
                "payload must be an object",
            )),
        }
    }
}
