use super::document::{Document, DocumentFormatError, WireFormat};

/// One step of a streaming traversal over a [`Document`] tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    Field(String),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::ObjectStart => "object start".to_string(),
            Token::ObjectEnd => "object end".to_string(),
            Token::ArrayStart => "array start".to_string(),
            Token::ArrayEnd => "array end".to_string(),
            Token::Field(name) => format!("field [{name}]"),
            Token::Str(_) => "string".to_string(),
            Token::Int(_) => "integer".to_string(),
            Token::Float(_) => "float".to_string(),
            Token::Bool(_) => "boolean".to_string(),
            Token::Bytes(_) => "bytes".to_string(),
            Token::Null => "null".to_string(),
        }
    }
}

/// Token cursor over a document. Component parsers receive the cursor
/// positioned at their own body and must consume exactly that sub-document,
/// leaving the cursor on the token after it.
pub struct DocumentParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl DocumentParser {
    pub fn new(doc: &Document) -> Self {
        let mut tokens = Vec::new();
        flatten(doc, &mut tokens);
        Self { tokens, pos: 0 }
    }

    pub fn from_bytes(bytes: &[u8], format: WireFormat) -> Result<Self, DocumentFormatError> {
        Ok(Self::new(&format.decode(bytes)?))
    }

    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn next(&mut self) -> Result<Token, DocumentFormatError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(DocumentFormatError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    pub fn expect_object_start(&mut self) -> Result<(), DocumentFormatError> {
        match self.next()? {
            Token::ObjectStart => Ok(()),
            other => Err(unexpected("object start", &other)),
        }
    }

    pub fn expect_object_end(&mut self) -> Result<(), DocumentFormatError> {
        match self.next()? {
            Token::ObjectEnd => Ok(()),
            other => Err(unexpected("object end", &other)),
        }
    }

    /// Next field name inside the current object, or `None` once the object
    /// closes. Any other token is a format error.
    pub fn next_field(&mut self) -> Result<Option<String>, DocumentFormatError> {
        match self.next()? {
            Token::Field(name) => Ok(Some(name)),
            Token::ObjectEnd => Ok(None),
            other => Err(unexpected("field name or object end", &other)),
        }
    }

    pub fn read_string(&mut self) -> Result<String, DocumentFormatError> {
        match self.next()? {
            Token::Str(s) => Ok(s),
            other => Err(unexpected("string", &other)),
        }
    }

    pub fn read_i64(&mut self) -> Result<i64, DocumentFormatError> {
        match self.next()? {
            Token::Int(n) => Ok(n),
            other => Err(unexpected("integer", &other)),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, DocumentFormatError> {
        match self.next()? {
            Token::Bool(b) => Ok(b),
            other => Err(unexpected("boolean", &other)),
        }
    }

    /// Rebuilds the next complete value (scalar or container) as a document.
    pub fn read_value(&mut self) -> Result<Document, DocumentFormatError> {
        match self.next()? {
            Token::ObjectStart => {
                let mut fields = Vec::new();
                while let Some(name) = self.next_field()? {
                    fields.push((name, self.read_value()?));
                }
                Ok(Document::Object(fields))
            }
            Token::ArrayStart => {
                let mut items = Vec::new();
                loop {
                    match self.current() {
                        Some(Token::ArrayEnd) => {
                            self.pos += 1;
                            return Ok(Document::Array(items));
                        }
                        Some(_) => items.push(self.read_value()?),
                        None => return Err(DocumentFormatError::UnexpectedEnd),
                    }
                }
            }
            Token::Str(s) => Ok(Document::Str(s)),
            Token::Int(n) => Ok(Document::Int(n)),
            Token::Float(n) => Ok(Document::Float(n)),
            Token::Bool(b) => Ok(Document::Bool(b)),
            Token::Bytes(b) => Ok(Document::Bytes(b)),
            Token::Null => Ok(Document::Null),
            other @ (Token::ObjectEnd | Token::ArrayEnd | Token::Field(_)) => {
                Err(unexpected("value", &other))
            }
        }
    }

    pub fn skip_value(&mut self) -> Result<(), DocumentFormatError> {
        self.read_value().map(|_| ())
    }
}

fn unexpected(expected: &'static str, found: &Token) -> DocumentFormatError {
    DocumentFormatError::UnexpectedToken {
        expected,
        found: found.describe(),
    }
}

fn flatten(doc: &Document, out: &mut Vec<Token>) {
    match doc {
        Document::Object(fields) => {
            out.push(Token::ObjectStart);
            for (name, value) in fields {
                out.push(Token::Field(name.clone()));
                flatten(value, out);
            }
            out.push(Token::ObjectEnd);
        }
        Document::Array(items) => {
            out.push(Token::ArrayStart);
            for item in items {
                flatten(item, out);
            }
            out.push(Token::ArrayEnd);
        }
        Document::Str(s) => out.push(Token::Str(s.clone())),
        Document::Int(n) => out.push(Token::Int(*n)),
        Document::Float(n) => out.push(Token::Float(*n)),
        Document::Bool(b) => out.push(Token::Bool(*b)),
        Document::Bytes(b) => out.push(Token::Bytes(b.clone())),
        Document::Null => out.push(Token::Null),
    }
}
