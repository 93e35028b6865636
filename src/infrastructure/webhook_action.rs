use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::{
    ActionFactory, ActionResult, BasicAuth, ConfigError, ExecutableAction, ExecutionContext,
    HttpMethod, HttpRequest, HttpTransport, Status, TemplateEngine, TemplateError,
};
use crate::domain::{
    Action, Document, DocumentBuilder, DocumentFormatError, DocumentParser, Emit, ParseError, Wid,
};

/// Declarative shape of the HTTP call a webhook action makes. URL, header
/// values and body are template strings rendered against the payload at
/// execution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequestTemplate {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub auth: Option<BasicAuth>,
}

impl HttpRequestTemplate {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            auth: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn render(
        &self,
        engine: &dyn TemplateEngine,
        payload: &Document,
    ) -> Result<HttpRequest, TemplateError> {
        let url = engine.render(&self.url, payload)?;
        let mut headers = Vec::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            headers.push((name.clone(), engine.render(value, payload)?));
        }
        let body = match &self.body {
            Some(body) => Some(engine.render(body, payload)?),
            None => None,
        };
        Ok(HttpRequest {
            method: self.method.clone(),
            url,
            headers,
            body,
            auth: self.auth.clone(),
        })
    }
}

/// `{{ }}` placeholders must pair up and must not nest.
fn validate_template(template: &str) -> Result<(), String> {
    let mut rest = template;
    loop {
        match (rest.find("{{"), rest.find("}}")) {
            (None, None) => return Ok(()),
            (Some(open), Some(close)) if open < close => {
                let inner = &rest[open + 2..close];
                if inner.contains("{{") {
                    return Err("nested placeholder".to_string());
                }
                if inner.trim().is_empty() {
                    return Err("empty placeholder".to_string());
                }
                rest = &rest[close + 2..];
            }
            _ => return Err("unbalanced placeholder braces".to_string()),
        }
    }
}

/// Calls an HTTP endpoint when the watch fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookAction {
    request: HttpRequestTemplate,
}

impl WebhookAction {
    pub const KIND: &'static str = "webhook";

    pub fn new(request: HttpRequestTemplate) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &HttpRequestTemplate {
        &self.request
    }
}

impl Emit for WebhookAction {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        let req = &self.request;
        builder.start_object()?;
        builder.field("method", req.method.as_str())?;
        builder.field("url", req.url.as_str())?;
        if !req.headers.is_empty() {
            builder.object_field("headers")?;
            for (name, value) in &req.headers {
                builder.field(name, value.as_str())?;
            }
            builder.end_object()?;
        }
        if let Some(body) = &req.body {
            builder.field("body", body.as_str())?;
        }
        if let Some(auth) = &req.auth {
            builder
                .object_field("auth")?
                .object_field("basic")?
                .field("username", auth.username.as_str())?
                .field("password", auth.password.as_str())?
                .end_object()?
                .end_object()?;
        }
        builder.end_object()?;
        Ok(())
    }
}

impl Action for WebhookAction {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Persisted outcome of one webhook call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookResult {
    Executed {
        request: HttpRequest,
        response_status: u16,
        response_body: String,
    },
    Failure {
        reason: String,
    },
    Throttled {
        reason: String,
    },
}

impl Emit for WebhookResult {
    fn emit(&self, builder: &mut DocumentBuilder) -> Result<(), DocumentFormatError> {
        builder.start_object()?;
        builder.field("status", self.status().as_str())?;
        match self {
            WebhookResult::Executed {
                request,
                response_status,
                response_body,
            } => {
                builder.object_field("request")?;
                builder.field("method", request.method.as_str())?;
                builder.field("url", request.url.as_str())?;
                if !request.headers.is_empty() {
                    builder.object_field("headers")?;
                    for (name, value) in &request.headers {
                        builder.field(name, value.as_str())?;
                    }
                    builder.end_object()?;
                }
                if let Some(body) = &request.body {
                    builder.field("body", body.as_str())?;
                }
                // credentials are never persisted
                builder.end_object()?;

                builder
                    .object_field("response")?
                    .field("status", *response_status)?
                    .field("body", response_body.as_str())?
                    .end_object()?;
            }
            WebhookResult::Failure { reason } | WebhookResult::Throttled { reason } => {
                builder.field("reason", reason.as_str())?;
            }
        }
        builder.end_object()?;
        Ok(())
    }
}

impl ActionResult for WebhookResult {
    fn kind(&self) -> &'static str {
        WebhookAction::KIND
    }

    fn status(&self) -> Status {
        match self {
            WebhookResult::Executed { .. } => Status::Success,
            WebhookResult::Failure { .. } => Status::Failure,
            WebhookResult::Throttled { .. } => Status::Throttled,
        }
    }
}

/// Parses webhook action definitions and results, and binds definitions to
/// the shared HTTP transport and template engine.
pub struct WebhookActionFactory {
    transport: Arc<dyn HttpTransport>,
    templates: Arc<dyn TemplateEngine>,
}

impl WebhookActionFactory {
    pub fn new(transport: Arc<dyn HttpTransport>, templates: Arc<dyn TemplateEngine>) -> Self {
        Self {
            transport,
            templates,
        }
    }
}

impl ActionFactory for WebhookActionFactory {
    fn kind(&self) -> &'static str {
        WebhookAction::KIND
    }

    fn parse_action(
        &self,
        watch_id: &str,
        action_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn Action>, ParseError> {
        let fail = |reason: String| {
            ParseError::action(watch_id, action_id, WebhookAction::KIND, reason)
        };

        parser.expect_object_start().map_err(|e| fail(e.to_string()))?;
        let mut method: Option<HttpMethod> = None;
        let mut url: Option<String> = None;
        let mut headers: Vec<(String, String)> = Vec::new();
        let mut body: Option<String> = None;
        let mut auth: Option<BasicAuth> = None;

        while let Some(field) = parser.next_field().map_err(|e| fail(e.to_string()))? {
            match field.as_str() {
                "method" => {
                    let raw = parser.read_string().map_err(|e| fail(e.to_string()))?;
                    method = Some(HttpMethod::parse(&raw).ok_or_else(|| {
                        fail(format!("field [method] has unsupported value [{raw}]"))
                    })?);
                }
                "url" => {
                    let raw = parser.read_string().map_err(|e| fail(e.to_string()))?;
                    if raw.trim().is_empty() {
                        return Err(fail("field [url] must not be empty".to_string()));
                    }
                    validate_template(&raw).map_err(|reason| {
                        fail(format!("field [url] has an invalid template: {reason}"))
                    })?;
                    url = Some(raw);
                }
                "headers" => {
                    parser.expect_object_start().map_err(|e| fail(e.to_string()))?;
                    while let Some(name) = parser.next_field().map_err(|e| fail(e.to_string()))? {
                        let value = parser.read_string().map_err(|e| fail(e.to_string()))?;
                        validate_template(&value).map_err(|reason| {
                            fail(format!(
                                "header [{name}] has an invalid template: {reason}"
                            ))
                        })?;
                        headers.push((name, value));
                    }
                }
                "body" => {
                    let raw = parser.read_string().map_err(|e| fail(e.to_string()))?;
                    validate_template(&raw).map_err(|reason| {
                        fail(format!("field [body] has an invalid template: {reason}"))
                    })?;
                    body = Some(raw);
                }
                "auth" => auth = Some(parse_auth(parser).map_err(fail)?),
                other => return Err(fail(format!("unexpected field [{other}]"))),
            }
        }

        let method = method.ok_or_else(|| fail("missing field [method]".to_string()))?;
        let url = url.ok_or_else(|| fail("missing field [url]".to_string()))?;
        let request = HttpRequestTemplate {
            method,
            url,
            headers,
            body,
            auth,
        };
        Ok(Box::new(WebhookAction::new(request)))
    }

    fn parse_result(
        &self,
        wid: &Wid,
        action_id: &str,
        parser: &mut DocumentParser,
    ) -> Result<Box<dyn ActionResult>, ParseError> {
        let fail = |reason: String| {
            ParseError::action(wid.watch_id(), action_id, WebhookAction::KIND, reason)
        };

        parser.expect_object_start().map_err(|e| fail(e.to_string()))?;
        let mut status: Option<Status> = None;
        let mut reason: Option<String> = None;
        let mut request: Option<HttpRequest> = None;
        let mut response: Option<(u16, String)> = None;

        while let Some(field) = parser.next_field().map_err(|e| fail(e.to_string()))? {
            match field.as_str() {
                "status" => {
                    let raw = parser.read_string().map_err(|e| fail(e.to_string()))?;
                    status = Some(Status::parse(&raw).ok_or_else(|| {
                        fail(format!("field [status] has unknown value [{raw}]"))
                    })?);
                }
                "reason" => reason = Some(parser.read_string().map_err(|e| fail(e.to_string()))?),
                "request" => request = Some(parse_request(parser).map_err(fail)?),
                "response" => response = Some(parse_response(parser).map_err(fail)?),
                other => return Err(fail(format!("unexpected field [{other}]"))),
            }
        }

        let status = status.ok_or_else(|| fail("missing field [status]".to_string()))?;
        match status {
            Status::Success => {
                let request = request.ok_or_else(|| fail("missing field [request]".to_string()))?;
                let (response_status, response_body) =
                    response.ok_or_else(|| fail("missing field [response]".to_string()))?;
                Ok(Box::new(WebhookResult::Executed {
                    request,
                    response_status,
                    response_body,
                }))
            }
            Status::Failure => Ok(Box::new(WebhookResult::Failure {
                reason: reason.ok_or_else(|| fail("missing field [reason]".to_string()))?,
            })),
            Status::Throttled => Ok(Box::new(WebhookResult::Throttled {
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
            .downcast_ref::<WebhookAction>()
            .ok_or(ConfigError::ActionTypeMismatch {
                kind: WebhookAction::KIND,
            })?;
        Ok(Box::new(ExecutableWebhookAction {
            action: action.clone(),
            transport: Arc::clone(&self.transport),
            templates: Arc::clone(&self.templates),
        }))
    }
}

fn parse_auth(parser: &mut DocumentParser) -> Result<BasicAuth, String> {
    let doc_err = |e: DocumentFormatError| e.to_string();
    parser.expect_object_start().map_err(doc_err)?;
    let mut auth: Option<BasicAuth> = None;
    while let Some(field) = parser.next_field().map_err(doc_err)? {
        match field.as_str() {
            "basic" => {
                parser.expect_object_start().map_err(doc_err)?;
                let mut username: Option<String> = None;
                let mut password: Option<String> = None;
                while let Some(inner) = parser.next_field().map_err(doc_err)? {
                    match inner.as_str() {
                        "username" => username = Some(parser.read_string().map_err(doc_err)?),
                        "password" => password = Some(parser.read_string().map_err(doc_err)?),
                        other => return Err(format!("unexpected auth field [{other}]")),
                    }
                }
                auth = Some(BasicAuth {
                    username: username.ok_or("missing field [auth.basic.username]")?,
                    password: password.ok_or("missing field [auth.basic.password]")?,
                });
            }
            other => return Err(format!("unsupported auth scheme [{other}]")),
        }
    }
    auth.ok_or_else(|| "empty [auth] object".to_string())
}

fn parse_request(parser: &mut DocumentParser) -> Result<HttpRequest, String> {
    let doc_err = |e: DocumentFormatError| e.to_string();
    parser.expect_object_start().map_err(doc_err)?;
    let mut method: Option<HttpMethod> = None;
    let mut url: Option<String> = None;
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut body: Option<String> = None;
    while let Some(field) = parser.next_field().map_err(doc_err)? {
        match field.as_str() {
            "method" => {
                let raw = parser.read_string().map_err(doc_err)?;
                method = Some(
                    HttpMethod::parse(&raw)
                        .ok_or_else(|| format!("request field [method] has unsupported value [{raw}]"))?,
                );
            }
            "url" => url = Some(parser.read_string().map_err(doc_err)?),
            "headers" => {
                parser.expect_object_start().map_err(doc_err)?;
                while let Some(name) = parser.next_field().map_err(doc_err)? {
                    headers.push((name, parser.read_string().map_err(doc_err)?));
                }
            }
            "body" => body = Some(parser.read_string().map_err(doc_err)?),
            other => return Err(format!("unexpected request field [{other}]")),
        }
    }
    Ok(HttpRequest {
        method: method.ok_or("missing field [request.method]")?,
        url: url.ok_or("missing field [request.url]")?,
        headers,
        body,
        auth: None,
    })
}

fn parse_response(parser: &mut DocumentParser) -> Result<(u16, String), String> {
    let doc_err = |e: DocumentFormatError| e.to_string();
    parser.expect_object_start().map_err(doc_err)?;
    let mut status: Option<u16> = None;
    let mut body: Option<String> = None;
    while let Some(field) = parser.next_field().map_err(doc_err)? {
        match field.as_str() {
            "status" => {
                let raw = parser.read_i64().map_err(doc_err)?;
                status = Some(
                    u16::try_from(raw)
                        .map_err(|_| format!("response field [status] out of range [{raw}]"))?,
                );
            }
            "body" => body = Some(parser.read_string().map_err(doc_err)?),
            other => return Err(format!("unexpected response field [{other}]")),
        }
    }
    Ok((
        status.ok_or("missing field [response.status]")?,
        body.unwrap_or_default(),
    ))
}

/// Runtime side of [`WebhookAction`]: renders the request and sends it. The
/// transport owns the timeout, so this never blocks indefinitely; every fault
/// becomes a failure result.
pub struct ExecutableWebhookAction {
    action: WebhookAction,
    transport: Arc<dyn HttpTransport>,
    templates: Arc<dyn TemplateEngine>,
}

#[async_trait]
impl ExecutableAction for ExecutableWebhookAction {
    fn action_kind(&self) -> &'static str {
        WebhookAction::KIND
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Box<dyn ActionResult> {
        let request = match self.action.request.render(self.templates.as_ref(), &ctx.payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(
                    wid = %ctx.wid,
                    action_id = %ctx.action_id,
                    error = %e,
                    "failed to render webhook request"
                );
                return Box::new(WebhookResult::Failure {
                    reason: format!("failed to render webhook request: {e}"),
                });
            }
        };

        match self.transport.send(request.clone()).await {
            Ok(response) if response.is_success() => {
                tracing::debug!(
                    wid = %ctx.wid,
                    action_id = %ctx.action_id,
                    status = response.status,
                    "webhook delivered"
                );
                Box::new(WebhookResult::Executed {
                    request,
                    response_status: response.status,
                    response_body: response.body,
                })
            }
            Ok(response) => {
                tracing::warn!(
                    wid = %ctx.wid,
                    action_id = %ctx.action_id,
                    status = response.status,
                    "webhook rejected"
                );
                Box::new(WebhookResult::Failure {
                    reason: format!(
                        "webhook [{}] returned status [{}]",
                        request.url, response.status
                    ),
                })
            }
            Err(e) => {
                tracing::warn!(
                    wid = %ctx.wid,
                    action_id = %ctx.action_id,
                    error = %e,
                    "webhook delivery failed"
                );
                Box::new(WebhookResult::Failure {
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Document;
    use chrono::Utc;

    struct NullTransport;

    #[async_trait]
    impl HttpTransport for NullTransport {
        async fn send(
            &self,
            request: HttpRequest,
        ) -> Result<crate::application::HttpResponse, crate::application::TransportError> {
            Err(crate::application::TransportError::Failed {
                url: request.url,
                reason: "null transport".to_string(),
            })
        }
    }

    struct PassthroughTemplates;

    impl TemplateEngine for PassthroughTemplates {
        fn render(&self, template: &str, _payload: &Document) -> Result<String, TemplateError> {
            Ok(template.to_string())
        }
    }

    fn factory() -> WebhookActionFactory {
        WebhookActionFactory::new(Arc::new(NullTransport), Arc::new(PassthroughTemplates))
    }

    fn action_doc(action: &WebhookAction) -> Document {
        let mut b = DocumentBuilder::new();
        action.emit(&mut b).unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn validates_template_placeholders() {
        assert!(validate_template("http://host/{{path}}").is_ok());
        assert!(validate_template("no placeholders").is_ok());
        assert!(validate_template("{{unclosed").is_err());
        assert!(validate_template("dangling}} {{x}}").is_err());
        assert!(validate_template("{{}}").is_err());
    }

    #[test]
    fn parses_its_own_emission() {
        let action = WebhookAction::new(
            HttpRequestTemplate::new(HttpMethod::Post, "http://hooks.example/{{channel}}")
                .header("Content-Type", "application/json")
                .body("{\"text\":\"{{message}}\"}")
                .basic_auth("ops", "secret"),
        );
        let doc = action_doc(&action);

        let mut p = DocumentParser::new(&doc);
        let parsed = factory().parse_action("w1", "notify", &mut p).unwrap();
        let parsed = parsed.as_any().downcast_ref::<WebhookAction>().unwrap();
        assert_eq!(parsed, &action);
    }

    #[test]
    fn rejects_an_unsupported_method() {
        let doc = Document::Object(vec![
            ("method".to_string(), Document::Str("PATCH".to_string())),
            ("url".to_string(), Document::Str("http://x".to_string())),
        ]);
        let mut p = DocumentParser::new(&doc);
        let err = factory().parse_action("w1", "notify", &mut p).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("watch [w1] action [notify]"), "{msg}");
        assert!(msg.contains("unsupported value [PATCH]"), "{msg}");
    }

    #[test]
    fn rejects_an_invalid_url_template() {
        let doc = Document::Object(vec![
            ("method".to_string(), Document::Str("GET".to_string())),
            ("url".to_string(), Document::Str("http://x/{{oops".to_string())),
        ]);
        let mut p = DocumentParser::new(&doc);
        let err = factory().parse_action("w1", "notify", &mut p).unwrap_err();
        assert!(err.to_string().contains("invalid template"));
    }

    #[test]
    fn result_round_trips_through_the_factory() {
        let result = WebhookResult::Executed {
            request: HttpRequest {
                method: HttpMethod::Post,
                url: "http://hooks.example/alert".to_string(),
                headers: vec![("Content-Type".to_string(), "application/json".to_string())],
                body: Some("{}".to_string()),
                auth: None,
            },
            response_status: 200,
            response_body: "ok".to_string(),
        };

        let mut b = DocumentBuilder::new();
        result.emit(&mut b).unwrap();
        let doc = b.finish().unwrap();

        let wid = Wid::new("w1", Utc::now());
        let mut p = DocumentParser::new(&doc);
        let parsed = factory().parse_result(&wid, "notify", &mut p).unwrap();
        assert_eq!(parsed.status(), Status::Success);
        assert_eq!(parsed.kind(), "webhook");
    }

    #[test]
    fn failure_result_round_trips() {
        let result = WebhookResult::Failure {
            reason: "request to http://x timed out".to_string(),
        };
        let mut b = DocumentBuilder::new();
        result.emit(&mut b).unwrap();
        let doc = b.finish().unwrap();

        let wid = Wid::new("w1", Utc::now());
        let mut p = DocumentParser::new(&doc);
        let parsed = factory().parse_result(&wid, "notify", &mut p).unwrap();
        assert_eq!(parsed.status(), Status::Failure);
    }
}
