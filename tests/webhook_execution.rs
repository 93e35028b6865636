use std::sync::Arc;

use chrono::Utc;
use watchpulse::application::{
    ActionFactory, ExecutionContext, HttpMethod, Status, result_document,
};
use watchpulse::domain::{Document, DocumentParser, Wid};
use watchpulse::infrastructure::fake_transport::FakeTransport;
use watchpulse::infrastructure::var_template::VarTemplateEngine;
use watchpulse::infrastructure::webhook_action::{
    HttpRequestTemplate, WebhookAction, WebhookActionFactory,
};
use watchpulse::interfaces::registry_with_services;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn webhook_factory(transport: FakeTransport) -> WebhookActionFactory {
    WebhookActionFactory::new(Arc::new(transport), Arc::new(VarTemplateEngine::new()))
}

fn alert_action() -> WebhookAction {
    WebhookAction::new(
        HttpRequestTemplate::new(HttpMethod::Post, "http://hooks.example/{{alert.channel}}")
            .body("{\"name\":\"{{alert.name}}\"}"),
    )
}

fn alert_payload() -> Document {
    Document::Object(vec![(
        "alert".to_string(),
        Document::Object(vec![
            ("channel".to_string(), Document::Str("ops".to_string())),
            ("name".to_string(), Document::Str("cpu".to_string())),
        ]),
    )])
}

fn ctx() -> ExecutionContext {
    ExecutionContext::new(Wid::new("w1", Utc::now()), "notify-ops", alert_payload())
}

#[test]
fn creating_executables_performs_no_io() {
    let transport = FakeTransport::respond_with(200, "ok");
    let factory = webhook_factory(transport.clone());
    let action = alert_action();

    for _ in 0..10 {
        factory.create_executable(&action).unwrap();
    }
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn a_2xx_response_is_a_success_result() {
    init_tracing();
    let transport = FakeTransport::respond_with(200, "accepted");
    let factory = webhook_factory(transport.clone());
    let executable = factory.create_executable(&alert_action()).unwrap();

    let result = executable.execute(&ctx()).await;
    assert_eq!(result.status(), Status::Success);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "http://hooks.example/ops");
    assert_eq!(requests[0].body.as_deref(), Some("{\"name\":\"cpu\"}"));
}

#[tokio::test]
async fn a_non_2xx_response_is_a_failure_result() {
    let transport = FakeTransport::respond_with(503, "unavailable");
    let factory = webhook_factory(transport);
    let executable = factory.create_executable(&alert_action()).unwrap();

    let result = executable.execute(&ctx()).await;
    assert_eq!(result.status(), Status::Failure);
}

#[tokio::test]
async fn a_transport_fault_becomes_a_failure_result() {
    let transport = FakeTransport::failing("connection refused");
    let factory = webhook_factory(transport);
    let executable = factory.create_executable(&alert_action()).unwrap();

    let result = executable.execute(&ctx()).await;
    assert_eq!(result.status(), Status::Failure);
}

#[tokio::test]
async fn a_template_fault_fails_without_sending_anything() {
    let transport = FakeTransport::respond_with(200, "ok");
    let factory = webhook_factory(transport.clone());
    let action = WebhookAction::new(HttpRequestTemplate::new(
        HttpMethod::Post,
        "http://hooks.example/{{not.a.field}}",
    ));
    let executable = factory.create_executable(&action).unwrap();

    let result = executable.execute(&ctx()).await;
    assert_eq!(result.status(), Status::Failure);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn an_execution_result_round_trips_through_the_registry() {
    let transport = FakeTransport::respond_with(201, "created");
    let registry = registry_with_services(
        Arc::new(transport),
        Arc::new(VarTemplateEngine::new()),
    )
    .unwrap();

    let factory = registry.lookup_action("webhook", "notify-ops").unwrap();
    let executable = factory.create_executable(&alert_action()).unwrap();

    let wid = Wid::new("w1", Utc::now());
    let ctx = ExecutionContext::new(wid.clone(), "notify-ops", alert_payload());
    let result = executable.execute(&ctx).await;
    assert_eq!(result.status(), Status::Success);

    let doc = result_document(result.as_ref()).unwrap();
    assert_eq!(
        doc.path("webhook.response.status").and_then(Document::as_i64),
        Some(201)
    );

    let mut parser = DocumentParser::new(&doc);
    let parsed = registry
        .parse_action_result(&wid, "notify-ops", &mut parser)
        .unwrap();
    assert_eq!(parsed.status(), Status::Success);
    assert_eq!(parsed.kind(), "webhook");
}
