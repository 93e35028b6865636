use std::sync::Arc;
use std::time::Duration;

use watchpulse::application::{ActionFactory as _, HttpMethod, WatchRegistry};
use watchpulse::domain::{
    Document, DocumentBuilder, DocumentParser, Emit, ParseError, WatchSourceBuilder, WireFormat,
};
use watchpulse::infrastructure::compare_condition::{CompareCondition, CompareOp};
use watchpulse::infrastructure::fake_transport::FakeTransport;
use watchpulse::infrastructure::logging_action::LoggingAction;
use watchpulse::infrastructure::schedule_trigger::ScheduleTrigger;
use watchpulse::infrastructure::script_transform::ScriptTransform;
use watchpulse::infrastructure::simple_input::SimpleInput;
use watchpulse::infrastructure::var_template::VarTemplateEngine;
use watchpulse::infrastructure::webhook_action::{HttpRequestTemplate, WebhookAction};
use watchpulse::interfaces::registry_with_services;

fn test_registry() -> WatchRegistry {
    registry_with_services(
        Arc::new(FakeTransport::respond_with(200, "ok")),
        Arc::new(VarTemplateEngine::new()),
    )
    .unwrap()
}

fn body_of<E: Emit + ?Sized>(component: &E) -> Document {
    let mut b = DocumentBuilder::new();
    component.emit(&mut b).unwrap();
    b.finish().unwrap()
}

#[test]
fn schedule_webhook_watch_emits_the_expected_document() {
    let builder = WatchSourceBuilder::new()
        .trigger(ScheduleTrigger::every(Duration::from_secs(60)))
        .add_action(
            "notify-ops",
            WebhookAction::new(HttpRequestTemplate::new(
                HttpMethod::Post,
                "http://hooks.example/alert",
            )),
        );

    let doc = builder.emit().unwrap();
    for key in ["trigger", "input", "condition", "actions"] {
        assert!(doc.get(key).is_some(), "missing top-level key [{key}]");
    }
    assert!(doc.get("throttle_period_in_millis").is_none());
    assert_eq!(
        doc.path("actions.notify-ops.webhook.method")
            .and_then(Document::as_str),
        Some("POST")
    );
    assert_eq!(
        doc.path("actions.notify-ops.webhook.url")
            .and_then(Document::as_str),
        Some("http://hooks.example/alert")
    );

    // the document re-hydrates into the same typed components
    let registry = test_registry();
    let mut parser = DocumentParser::new(&doc);
    let watch = registry.parse_watch("my-watch", &mut parser).unwrap();

    assert_eq!(watch.trigger.kind(), "schedule");
    assert_eq!(watch.input.kind(), "none");
    assert_eq!(watch.condition.kind(), "always");
    assert_eq!(watch.actions.len(), 1);

    let entry = watch.action("notify-ops").unwrap();
    assert_eq!(entry.action.kind(), "webhook");
    let webhook = entry
        .action
        .as_any()
        .downcast_ref::<WebhookAction>()
        .unwrap();
    assert_eq!(webhook.request().url, "http://hooks.example/alert");

    let factory = registry.lookup_action("webhook", "notify-ops").unwrap();
    factory.create_executable(entry.action.as_ref()).unwrap();
}

#[test]
fn throttle_period_round_trips_in_milliseconds() {
    let builder = WatchSourceBuilder::new()
        .trigger(ScheduleTrigger::every(Duration::from_secs(1)))
        .throttle_period(Duration::from_millis(5000));
    let doc = builder.emit().unwrap();
    assert_eq!(
        doc.get("throttle_period_in_millis").and_then(Document::as_i64),
        Some(5000)
    );

    let registry = test_registry();
    let mut parser = DocumentParser::new(&doc);
    let watch = registry.parse_watch("w", &mut parser).unwrap();
    assert_eq!(watch.throttle_period, Some(Duration::from_millis(5000)));
}

#[test]
fn every_component_survives_a_full_round_trip() {
    let trigger = ScheduleTrigger::every(Duration::from_secs(300));
    let input = SimpleInput::new(Document::Object(vec![(
        "severity".to_string(),
        Document::Str("high".to_string()),
    )]))
    .unwrap();
    let condition = CompareCondition::new("severity", CompareOp::Eq, Document::from("high"));
    let transform = ScriptTransform::new("return ctx.payload");
    let webhook = WebhookAction::new(
        HttpRequestTemplate::new(HttpMethod::Post, "http://hooks.example/{{severity}}")
            .header("Content-Type", "application/json")
            .body("{\"severity\":\"{{severity}}\"}"),
    );
    let logging = LoggingAction::new("severity is {{severity}}");
    let metadata = Document::Object(vec![(
        "owner".to_string(),
        Document::Str("ops-team".to_string()),
    )]);

    let builder = WatchSourceBuilder::new()
        .trigger(trigger.clone())
        .input(input.clone())
        .condition(condition.clone())
        .transform(transform.clone())
        .add_action_with_transform("page", transform.clone(), webhook.clone())
        .add_action("note", logging.clone())
        .metadata(metadata.clone());

    let bytes = builder.build_as_bytes(WireFormat::Json).unwrap();
    let registry = test_registry();
    let watch = registry
        .parse_watch_bytes("full-watch", &bytes, WireFormat::Json)
        .unwrap();

    assert_eq!(body_of(watch.trigger.as_ref()), body_of(&trigger));
    assert_eq!(body_of(watch.input.as_ref()), body_of(&input));
    assert_eq!(body_of(watch.condition.as_ref()), body_of(&condition));
    assert_eq!(
        body_of(watch.transform.as_ref().unwrap().as_ref()),
        body_of(&transform)
    );
    assert_eq!(watch.metadata, Some(metadata));
    assert_eq!(watch.actions.len(), 2);

    let page = watch.action("page").unwrap();
    assert_eq!(body_of(page.action.as_ref()), body_of(&webhook));
    assert_eq!(
        body_of(page.transform.as_ref().unwrap().as_ref()),
        body_of(&transform)
    );

    let note = watch.action("note").unwrap();
    assert_eq!(body_of(note.action.as_ref()), body_of(&logging));
    assert!(note.transform.is_none());
}

#[test]
fn unknown_action_type_fails_even_among_valid_actions() {
    let doc = WatchSourceBuilder::new()
        .trigger(ScheduleTrigger::every(Duration::from_secs(60)))
        .add_action(
            "ok-action",
            WebhookAction::new(HttpRequestTemplate::new(HttpMethod::Get, "http://x")),
        )
        .emit()
        .unwrap();

    // splice in an action whose discriminator nothing registered
    let mut fields = match doc {
        Document::Object(fields) => fields,
        other => panic!("expected object, got {other:?}"),
    };
    for (name, value) in &mut fields {
        if name == "actions" {
            if let Document::Object(actions) = value {
                actions.push((
                    "bad-action".to_string(),
                    Document::Object(vec![(
                        "pager_duty".to_string(),
                        Document::empty_object(),
                    )]),
                ));
            }
        }
    }
    let doc = Document::Object(fields);

    let registry = test_registry();
    let mut parser = DocumentParser::new(&doc);
    let err = registry.parse_watch("w", &mut parser).unwrap_err();
    match err {
        ParseError::UnknownActionType {
            action_id, kind, ..
        } => {
            assert_eq!(action_id, "bad-action");
            assert_eq!(kind, "pager_duty");
        }
        other => panic!("expected UnknownActionType, got {other}"),
    }
}

#[test]
fn parsing_a_watch_without_a_trigger_fails() {
    let doc = Document::Object(vec![(
        "actions".to_string(),
        Document::empty_object(),
    )]);
    let registry = test_registry();
    let mut parser = DocumentParser::new(&doc);
    let err = registry.parse_watch("w", &mut parser).unwrap_err();
    assert!(matches!(err, ParseError::MissingField { field: "trigger", .. }));
}

#[test]
fn parsing_rejects_an_unexpected_top_level_field() {
    let doc = Document::Object(vec![
        (
            "trigger".to_string(),
            Document::Object(vec![(
                "schedule".to_string(),
                Document::Object(vec![(
                    "interval_in_millis".to_string(),
                    Document::Int(1000),
                )]),
            )]),
        ),
        ("surprise".to_string(), Document::Int(1)),
    ]);
    let registry = test_registry();
    let mut parser = DocumentParser::new(&doc);
    let err = registry.parse_watch("w", &mut parser).unwrap_err();
    match err {
        ParseError::UnexpectedField { field, .. } => assert_eq!(field, "surprise"),
        other => panic!("expected UnexpectedField, got {other}"),
    }
}

#[test]
fn yaml_encoding_round_trips_too() {
    let builder = WatchSourceBuilder::new()
        .trigger(ScheduleTrigger::every(Duration::from_secs(60)))
        .add_action(
            "notify-ops",
            WebhookAction::new(HttpRequestTemplate::new(
                HttpMethod::Post,
                "http://hooks.example/alert",
            )),
        );

    let bytes = builder.build_as_bytes(WireFormat::Yaml).unwrap();
    let registry = test_registry();
    let watch = registry
        .parse_watch_bytes("w", &bytes, WireFormat::Yaml)
        .unwrap();
    assert_eq!(watch.actions.len(), 1);
    assert_eq!(watch.action("notify-ops").unwrap().action.kind(), "webhook");
}
