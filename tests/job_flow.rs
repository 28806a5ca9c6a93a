mod common;

use chrono::{NaiveDate, Timelike, Utc};
use common::{path, valid_credential, FakeGenerator, TestEnv, USER_EMAIL};
use mockito::{Matcher, Mock};
use preread::components::gmail::OutgoingMessage;
use preread::components::preread_job::{
    scheduler, JobHandle, JobOutcome, JobState, PrereadPipeline, Trigger,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";
const MESSAGES_PATH: &str = "/gmail/v1/users/me/messages";
const SEND_PATH: &str = "/gmail/v1/users/me/messages/send";
const PROFILE_PATH: &str = "/gmail/v1/users/me/profile";

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn pipeline(env: &TestEnv, generator: Arc<FakeGenerator>) -> PrereadPipeline {
    PrereadPipeline::new(Arc::clone(&env.config), env.token_manager(), generator)
}

async fn mock_events(env: &mut TestEnv, items: serde_json::Value) -> Mock {
    env
        .server
        .mock("GET", path(EVENTS_PATH))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::json!({ "items": items }).to_string())
        .create_async()
        .await
}

async fn mock_profile(env: &mut TestEnv) -> Mock {
    env
        .server
        .mock("GET", PROFILE_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"emailAddress": "{}"}}"#, USER_EMAIL))
        .create_async()
        .await
}

/// Every search comes back empty
async fn mock_empty_search(env: &mut TestEnv) -> Mock {
    env
        .server
        .mock("GET", path(MESSAGES_PATH))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"resultSizeEstimate": 0}"#)
        .create_async()
        .await
}

async fn mock_send(env: &mut TestEnv, to: &str, subject: &str, body: &str) -> Mock {
    let expected = OutgoingMessage {
        from: USER_EMAIL.to_string(),
        to: to.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
    };
    env
        .server
        .mock("POST", SEND_PATH)
        .match_body(Matcher::Json(serde_json::json!({ "raw": expected.to_raw() })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "sent-1", "threadId": "t-1"}"#)
        .expect(1)
        .create_async()
        .await
}

fn two_events() -> serde_json::Value {
    serde_json::json!([
        {"id": "e1", "summary": "Sync", "start": {"dateTime": "2025-01-01T09:00:00Z"},
         "attendees": [{"email": "a@x.com"}, {"email": USER_EMAIL}]},
        {"id": "e2", "summary": "Retro", "start": {"dateTime": "2025-01-01T15:00:00Z"},
         "attendees": [{"email": "b@x.com"}]}
    ])
}

#[tokio::test]
async fn missing_credential_skips_silently() {
    let mut env = TestEnv::new().await;
    let events = env
        .server
        .mock("GET", path(EVENTS_PATH))
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let send = env
        .server
        .mock("POST", SEND_PATH)
        .expect(0)
        .create_async()
        .await;

    let generator = Arc::new(FakeGenerator::new());
    let outcome = pipeline(&env, generator.clone()).run(day()).await.unwrap();

    assert_eq!(outcome, JobOutcome::Skipped);
    assert!(generator.prompts().is_empty());
    events.assert_async().await;
    send.assert_async().await;
}

#[tokio::test]
async fn empty_day_sends_no_meetings_mail() {
    let mut env = TestEnv::new().await;
    env.write_credential(&valid_credential());
    let _events = mock_events(&mut env, serde_json::json!([])).await;
    let _profile = mock_profile(&mut env).await;
    let send = mock_send(
        &mut env,
        USER_EMAIL,
        "No Meetings Today 😊",
        "You're all clear today! 🎉\n\nNo meetings were found on your calendar.\nEnjoy your day!",
    )
    .await;

    let outcome = pipeline(&env, Arc::new(FakeGenerator::new()))
        .run(day())
        .await
        .unwrap();

    match outcome {
        JobOutcome::Sent {
            subject,
            recipient,
            message_id,
            prereads,
        } => {
            assert_eq!(subject, "No Meetings Today 😊");
            assert_eq!(recipient, USER_EMAIL);
            assert_eq!(message_id, "sent-1");
            assert!(prereads.is_empty());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    send.assert_async().await;
}

#[tokio::test]
async fn one_summary_per_event_in_fetch_order() {
    let mut env = TestEnv::new().await;
    env.write_credential(&valid_credential());
    let _events = mock_events(&mut env, two_events()).await;
    let _profile = mock_profile(&mut env).await;
    let _search = mock_empty_search(&mut env).await;
    let send = mock_send(
        &mut env,
        USER_EMAIL,
        "Daily Meeting Prereads",
        "Summary 1\n\n---\n\nSummary 2",
    )
    .await;

    let generator = Arc::new(FakeGenerator::new());
    let outcome = pipeline(&env, generator.clone()).run(day()).await.unwrap();

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("MEETING TITLE: Sync"));
    assert!(prompts[0].contains("No prior Granola notes found."));
    assert!(prompts[1].contains("MEETING TITLE: Retro"));

    let JobOutcome::Sent { prereads, .. } = outcome else {
        panic!("digest was not sent");
    };
    let titles: Vec<&str> = prereads.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Sync", "Retro"]);
    assert_eq!(prereads[0].summary, "Summary 1");
    send.assert_async().await;

    // Lock released after the run
    assert!(!env.dir.path().join("preread.lock").exists());
}

#[tokio::test]
async fn note_query_leaves_out_the_user() {
    let mut env = TestEnv::new().await;
    env.write_credential(&valid_credential());
    let _events = mock_events(
        &mut env,
        serde_json::json!([{"id": "e1", "summary": "Sync", "start": {"dateTime": "2025-01-01T09:00:00Z"},
            "attendees": [{"email": USER_EMAIL}, {"email": "a@x.com"}],
            "creator": {"email": USER_EMAIL}}]),
    )
    .await;
    let _profile = mock_profile(&mut env).await;
    // Registered before the catch-all search so it takes the note query
    let note_search = env
        .server
        .mock("GET", path(MESSAGES_PATH))
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "\"Sync\" Granola (from:a@x.com OR to:a@x.com)".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    let _search = mock_empty_search(&mut env).await;
    let _send = mock_send(&mut env, USER_EMAIL, "Daily Meeting Prereads", "Summary 1").await;

    pipeline(&env, Arc::new(FakeGenerator::new()))
        .run(day())
        .await
        .unwrap();
    note_search.assert_async().await;
}

#[tokio::test]
async fn note_failure_degrades_to_error_text() {
    let mut env = TestEnv::new().await;
    env.write_credential(&valid_credential());
    let _events = mock_events(
        &mut env,
        serde_json::json!([{"id": "e1", "summary": "Sync", "start": {"dateTime": "2025-01-01T09:00:00Z"}}]),
    )
    .await;
    let _profile = mock_profile(&mut env).await;
    let _mock = env
        .server
        .mock("GET", path(MESSAGES_PATH))
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let send = mock_send(&mut env, USER_EMAIL, "Daily Meeting Prereads", "Summary 1").await;

    let generator = Arc::new(FakeGenerator::new());
    pipeline(&env, generator.clone()).run(day()).await.unwrap();

    let prompts = generator.prompts();
    assert!(prompts[0].contains("Error fetching Granola notes: "));
    send.assert_async().await;
}

#[tokio::test]
async fn summary_failure_aborts_before_sending() {
    let mut env = TestEnv::new().await;
    env.write_credential(&valid_credential());
    let _events = mock_events(&mut env, two_events()).await;
    let _profile = mock_profile(&mut env).await;
    let _search = mock_empty_search(&mut env).await;
    let send = env
        .server
        .mock("POST", SEND_PATH)
        .expect(0)
        .create_async()
        .await;

    let result = pipeline(&env, Arc::new(FakeGenerator::failing()))
        .run(day())
        .await;

    assert!(result.is_err());
    send.assert_async().await;
    assert!(!env.dir.path().join("preread.lock").exists());
}

#[tokio::test]
async fn configured_recipient_overrides_the_user() {
    let mut env = TestEnv::new().await;
    env.write_credential(&valid_credential());
    env.config.write().await.digest_recipient = Some("team@example.com".to_string());
    let _events = mock_events(&mut env, serde_json::json!([])).await;
    let _profile = mock_profile(&mut env).await;
    let send = mock_send(
        &mut env,
        "team@example.com",
        "No Meetings Today 😊",
        "You're all clear today! 🎉\n\nNo meetings were found on your calendar.\nEnjoy your day!",
    )
    .await;

    let prepared = pipeline(&env, Arc::new(FakeGenerator::new()))
        .prepare(day())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(prepared.sender, USER_EMAIL);
    assert_eq!(prepared.recipient, "team@example.com");

    pipeline(&env, Arc::new(FakeGenerator::new()))
        .send(prepared)
        .await
        .unwrap();
    send.assert_async().await;
}

#[tokio::test]
async fn held_lock_means_already_running() {
    let mut env = TestEnv::new().await;
    env.write_credential(&valid_credential());
    std::fs::write(env.dir.path().join("preread.lock"), "1 now\n").unwrap();
    let events = env
        .server
        .mock("GET", path(EVENTS_PATH))
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let outcome = pipeline(&env, Arc::new(FakeGenerator::new()))
        .run(day())
        .await
        .unwrap();

    assert_eq!(outcome, JobOutcome::AlreadyRunning);
    events.assert_async().await;
    // Someone else's lock is left alone
    assert!(env.dir.path().join("preread.lock").exists());
}

#[tokio::test]
async fn trigger_during_a_run_is_coalesced() {
    let mut env = TestEnv::new().await;
    env.write_credential(&valid_credential());
    let today = Utc::now().date_naive();
    let _events = mock_events(
        &mut env,
        serde_json::json!([{"id": "e1", "summary": "Sync", "start": {"date": today.to_string()}}]),
    )
    .await;
    let _profile = mock_profile(&mut env).await;
    let _search = mock_empty_search(&mut env).await;
    let send = mock_send(&mut env, USER_EMAIL, "Daily Meeting Prereads", "Summary 1").await;

    let gate = Arc::new(Notify::new());
    let generator = Arc::new(FakeGenerator::gated(Arc::clone(&gate)));
    let job = JobHandle::spawn(pipeline(&env, generator));
    let mut status = job.subscribe();

    let first = tokio::spawn({
        let job = job.clone();
        async move { job.trigger(Trigger::Manual).await }
    });
    status
        .wait_for(|s| s.state == JobState::Running)
        .await
        .unwrap();

    let second = job.trigger(Trigger::Scheduled).await.unwrap();
    assert_eq!(second, JobOutcome::AlreadyRunning);

    gate.notify_one();
    let first = first.await.unwrap().unwrap();
    assert!(matches!(first, JobOutcome::Sent { .. }));

    status
        .wait_for(|s| s.state == JobState::Idle && s.last_report.is_some())
        .await
        .unwrap();
    let report = job.status().last_report.unwrap();
    assert_eq!(report.trigger, Trigger::Manual);
    assert!(report.describe().starts_with("Sent"));

    job.shutdown().await.unwrap();
    send.assert_async().await;
}

#[tokio::test]
async fn daily_scheduler_stops_when_cancelled() {
    let env = TestEnv::new().await;
    // Half a day away so nothing fires during the test
    let hour = (Utc::now().hour() + 12) % 24;
    env.config.write().await.daily_run_time = format!("{:02}:00", hour);

    let job = JobHandle::spawn(pipeline(&env, Arc::new(FakeGenerator::new())));
    let cancel = CancellationToken::new();
    let task = tokio::spawn(scheduler::run_daily(
        Arc::clone(&env.config),
        job.clone(),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("scheduler did not stop")
        .unwrap();
    assert!(job.status().last_report.is_none());
    job.shutdown().await.unwrap();
}

#[tokio::test]
async fn daily_scheduler_waiting_on_bad_config_can_be_cancelled() {
    let env = TestEnv::new().await;
    env.config.write().await.timezone = "Nowhere/Invalid".to_string();

    let job = JobHandle::spawn(pipeline(&env, Arc::new(FakeGenerator::new())));
    let cancel = CancellationToken::new();
    let task = tokio::spawn(scheduler::run_daily(
        Arc::clone(&env.config),
        job.clone(),
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("scheduler did not stop")
        .unwrap();
    job.shutdown().await.unwrap();
}
