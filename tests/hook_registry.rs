//! Hook registry against a mocked focus service.

use std::time::Duration;

use chrono::NaiveTime;
use focus_console_lib::api::ApiClient;
use focus_console_lib::hooks::{ActionStatus, HookAction, HookActionError, HookRegistry};
use focus_console_lib::models::{HookSchedule, LoadState};
use focus_console_lib::schedule::{Frequency, ScheduleViolation, ScheduleWindow};
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ApiClient {
    ApiClient::new(Url::parse(&server.uri()).unwrap()).unwrap()
}

fn stretch_hook(config: Value) -> Value {
    json!({
        "id": "h1",
        "name": "Stretch reminder",
        "description": "Nudges you to stand up",
        "params": [{
            "key": "tone",
            "name": "Tone",
            "type": "select",
            "default": "calm",
            "options": ["calm", "firm"]
        }],
        "config": config
    })
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn morning_window() -> ScheduleWindow {
    ScheduleWindow {
        enabled: true,
        first_run: hm(8, 0),
        last_run: hm(18, 0),
        frequency: Frequency::from_minutes(30),
        parameters: Default::default(),
    }
}

async fn mount_hooks(server: &MockServer, hooks: Value) {
    Mock::given(method("GET"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hooks))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_load_empty_and_null_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let registry = HookRegistry::new(api(&server));
    assert!(registry.hooks().await.is_loading());

    let hooks = registry.load().await.unwrap();
    assert!(hooks.is_empty());
    assert_eq!(registry.hooks().await, LoadState::Loaded(Vec::new()));
}

#[tokio::test]
async fn test_load_normalizes_and_builds_cards() {
    let server = MockServer::start().await;
    mount_hooks(
        &server,
        json!([
            stretch_hook(json!({
                "enabled": true,
                "first_run": "08:00",
                "last_run": "18:00",
                "frequency": "45m",
                "params": {}
            })),
            {"id": "h2", "name": "Journal", "params": [], "config": null}
        ]),
    )
    .await;

    let registry = HookRegistry::new(api(&server));
    let hooks = registry.load().await.unwrap();
    assert_eq!(hooks.len(), 2);

    let window = hooks[0].schedule.window().unwrap();
    assert_eq!(window.parameters.get("tone").map(String::as_str), Some("calm"));
    assert_eq!(window.frequency, Frequency::from_minutes(45));
    assert_eq!(hooks[1].schedule, HookSchedule::Unconfigured);

    let card = registry.card("h2").await.unwrap();
    assert!(!card.dirty);
    assert!(!card.draft.enabled);
    assert_eq!(card.draft.first_run, hm(9, 0));
    assert_eq!(card.status, ActionStatus::Idle);
}

#[tokio::test]
async fn test_load_failure_is_distinct_from_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database offline"))
        .mount(&server)
        .await;

    let registry = HookRegistry::new(api(&server));
    let err = registry.load().await.unwrap_err();
    assert_eq!(err.to_string(), "database offline");
    assert!(registry.hooks().await.is_failed());
}

#[tokio::test]
async fn test_save_schedule_submits_and_refreshes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stretch_hook(Value::Null)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stretch_hook(json!({
            "enabled": true,
            "first_run": "08:00",
            "last_run": "18:00",
            "frequency": "30m",
            "params": {"tone": "calm"}
        }))])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hooks/h1"))
        .and(body_partial_json(json!({
            "enabled": true,
            "first_run": "08:00",
            "last_run": "18:00",
            "frequency": "30m",
            "params": {"tone": "calm"},
            "trigger": "scheduled"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let registry = HookRegistry::new(api(&server));
    registry.load().await.unwrap();
    assert!(!registry.hook("h1").await.unwrap().schedule.is_configured());

    registry.save_schedule("h1", morning_window()).await.unwrap();

    let hook = registry.hook("h1").await.unwrap();
    let saved = hook.schedule.window().unwrap();
    assert!(saved.enabled);
    assert_eq!(saved.frequency, Frequency::from_minutes(30));

    let card = registry.card("h1").await.unwrap();
    assert!(!card.dirty);
    assert_eq!(card.status.label().as_deref(), Some("Saved"));
    assert!(!registry.is_pending("h1", HookAction::Save).await);
}

#[tokio::test]
async fn test_failed_refresh_after_save_keeps_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([stretch_hook(Value::Null)])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hooks"))
        .respond_with(ResponseTemplate::new(503).set_body_string("registry unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hooks/h1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hooks/h1/trigger"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let registry = HookRegistry::new(api(&server));
    registry.load().await.unwrap();
    assert_eq!(registry.last_error().await, None);

    registry.save_schedule("h1", morning_window()).await.unwrap();

    let hooks = registry.hooks().await;
    assert!(!hooks.is_failed());
    assert_eq!(hooks.loaded().map(Vec::len), Some(1));
    let saved = registry.hook("h1").await.unwrap();
    assert_eq!(
        saved.schedule.window().map(|window| window.frequency),
        Some(Frequency::from_minutes(30))
    );
    assert_eq!(
        registry.last_error().await.as_deref(),
        Some("registry unavailable")
    );

    // The cached hook stays actionable.
    registry.trigger("h1").await.unwrap();
    assert_eq!(
        registry.card("h1").await.unwrap().status.label().as_deref(),
        Some("Triggered")
    );
}

#[tokio::test]
async fn test_invalid_schedule_never_reaches_service() {
    let server = MockServer::start().await;
    mount_hooks(&server, json!([stretch_hook(Value::Null)])).await;
    Mock::given(method("PUT"))
        .and(path("/hooks/h1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let registry = HookRegistry::new(api(&server));
    registry.load().await.unwrap();

    let inverted = ScheduleWindow {
        first_run: hm(20, 0),
        last_run: hm(8, 0),
        ..morning_window()
    };
    let err = registry.save_schedule("h1", inverted).await.unwrap_err();
    assert!(matches!(
        err,
        HookActionError::Invalid(ScheduleViolation::FirstRunAfterLastRun { .. })
    ));

    let stalled = ScheduleWindow {
        frequency: Frequency::from_seconds(0),
        ..morning_window()
    };
    let err = registry.save_schedule("h1", stalled).await.unwrap_err();
    assert!(matches!(
        err,
        HookActionError::Invalid(ScheduleViolation::NonPositiveFrequency { .. })
    ));

    let mut stray = morning_window();
    stray.parameters.insert("volume".into(), "11".into());
    let err = registry.save_schedule("h1", stray).await.unwrap_err();
    assert!(matches!(
        err,
        HookActionError::Invalid(ScheduleViolation::UnknownParameter { .. })
    ));

    // Cache untouched, error surfaced on the card.
    assert!(!registry.hook("h1").await.unwrap().schedule.is_configured());
    let card = registry.card("h1").await.unwrap();
    assert!(matches!(card.status, ActionStatus::Failed(_)));
}

#[tokio::test]
async fn test_rejected_save_surfaces_service_message() {
    let server = MockServer::start().await;
    mount_hooks(&server, json!([stretch_hook(Value::Null)])).await;
    Mock::given(method("PUT"))
        .and(path("/hooks/h1"))
        .respond_with(ResponseTemplate::new(400).set_body_string("frequency too short\n"))
        .expect(1)
        .mount(&server)
        .await;

    let registry = HookRegistry::new(api(&server));
    registry.load().await.unwrap();

    let err = registry.save_schedule("h1", morning_window()).await.unwrap_err();
    assert!(matches!(err, HookActionError::Api(_)));
    assert_eq!(err.to_string(), "frequency too short");

    let card = registry.card("h1").await.unwrap();
    assert_eq!(card.status.label().as_deref(), Some("Error: frequency too short"));
    assert!(!registry.hook("h1").await.unwrap().schedule.is_configured());
}

#[tokio::test]
async fn test_unknown_hook_is_rejected_locally() {
    let server = MockServer::start().await;
    mount_hooks(&server, json!([])).await;

    let registry = HookRegistry::new(api(&server));
    registry.load().await.unwrap();

    let err = registry.save_schedule("ghost", morning_window()).await.unwrap_err();
    assert!(matches!(err, HookActionError::UnknownHook(id) if id == "ghost"));
    let err = registry.trigger("ghost").await.unwrap_err();
    assert!(matches!(err, HookActionError::UnknownHook(_)));
}

#[tokio::test]
async fn test_trigger_and_duplicate_guard() {
    let server = MockServer::start().await;
    mount_hooks(&server, json!([stretch_hook(Value::Null)])).await;
    Mock::given(method("POST"))
        .and(path("/hooks/h1/trigger"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let registry = HookRegistry::new(api(&server));
    registry.load().await.unwrap();

    let first = tokio::spawn({
        let registry = registry.clone();
        async move { registry.trigger("h1").await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(registry.is_pending("h1", HookAction::Trigger).await);
    assert_eq!(
        registry.card("h1").await.unwrap().status.label().as_deref(),
        Some("Running...")
    );
    let second = registry.trigger("h1").await.unwrap_err();
    assert!(matches!(
        second,
        HookActionError::AlreadyPending {
            action: HookAction::Trigger,
            ..
        }
    ));

    first.await.unwrap().unwrap();
    assert!(!registry.is_pending("h1", HookAction::Trigger).await);
    assert_eq!(
        registry.card("h1").await.unwrap().status.label().as_deref(),
        Some("Triggered")
    );
}

#[tokio::test]
async fn test_context_preview() {
    let server = MockServer::start().await;
    mount_hooks(&server, json!([stretch_hook(Value::Null)])).await;
    Mock::given(method("GET"))
        .and(path("/hooks/h1/context"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"context": "3 sessions today"})),
        )
        .mount(&server)
        .await;

    let registry = HookRegistry::new(api(&server));
    registry.load().await.unwrap();

    let text = registry.context("h1").await.unwrap();
    assert_eq!(text, "3 sessions today");
    let card = registry.card("h1").await.unwrap();
    assert_eq!(
        card.context,
        focus_console_lib::hooks::ContextPreview::Shown("3 sessions today".into())
    );

    registry.hide_context("h1").await;
    let card = registry.card("h1").await.unwrap();
    assert_eq!(card.context, focus_console_lib::hooks::ContextPreview::Hidden);
}

#[tokio::test]
async fn test_dirty_draft_survives_reload() {
    let server = MockServer::start().await;
    mount_hooks(&server, json!([stretch_hook(Value::Null)])).await;

    let registry = HookRegistry::new(api(&server));
    registry.load().await.unwrap();

    registry
        .edit_card("h1", |draft| draft.frequency = Frequency::from_minutes(20))
        .await
        .unwrap();
    registry.load().await.unwrap();

    let card = registry.card("h1").await.unwrap();
    assert!(card.dirty);
    assert_eq!(card.draft.frequency, Frequency::from_minutes(20));
}

#[tokio::test]
async fn test_teardown_discards_late_completions() {
    let server = MockServer::start().await;
    mount_hooks(&server, json!([stretch_hook(Value::Null)])).await;
    Mock::given(method("POST"))
        .and(path("/hooks/h1/trigger"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let registry = HookRegistry::new(api(&server));
    registry.load().await.unwrap();

    let pending = tokio::spawn({
        let registry = registry.clone();
        async move { registry.trigger("h1").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    registry.teardown();

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, Err(HookActionError::TornDown)));
    // The card still shows the in-flight state; nothing was written back.
    assert_eq!(
        registry.card("h1").await.unwrap().status,
        ActionStatus::Pending(HookAction::Trigger)
    );
}
