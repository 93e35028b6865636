use crate::application::{TemplateEngine, TemplateError};
use crate::domain::Document;

/// Minimal `{{dotted.path}}` substitution against the execution payload.
/// Strict: an unknown path or a non-scalar value is an error, which the
/// executable converts into a failure result.
pub struct VarTemplateEngine;

impl VarTemplateEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VarTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for VarTemplateEngine {
    fn render(&self, template: &str, payload: &Document) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        loop {
            let Some(open) = rest.find("{{") else {
                if rest.contains("}}") {
                    return Err(TemplateError::Malformed {
                        reason: "closing braces without an opening pair".to_string(),
                    });
                }
                out.push_str(rest);
                return Ok(out);
            };
            out.push_str(&rest[..open]);
            rest = &rest[open + 2..];

            let Some(close) = rest.find("}}") else {
                return Err(TemplateError::Malformed {
                    reason: "unclosed placeholder".to_string(),
                });
            };
            let path = rest[..close].trim();
            if path.is_empty() {
                return Err(TemplateError::Malformed {
                    reason: "empty placeholder".to_string(),
                });
            }
            let value = payload
                .path(path)
                .ok_or_else(|| TemplateError::UnknownVariable {
                    path: path.to_string(),
                })?;
            let rendered = value
                .render_scalar()
                .ok_or_else(|| TemplateError::NotAScalar {
                    path: path.to_string(),
                })?;
            out.push_str(&rendered);
            rest = &rest[close + 2..];
        }
    }
}
