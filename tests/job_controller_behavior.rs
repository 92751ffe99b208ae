//! Behavior-driven tests for job submission and status polling
//!
//! These tests drive the job controller against a scripted backend with a
//! paused clock, focusing on what a caller observes through its listeners.

use datasim_core::{
    ApiEndpoints, FieldSpec, FieldType, GenerationRequest, HttpMethod, Job, JobController,
    JobStatus, OutputFormat, PollConfig, SchemaDescription, ScriptedHttpClient, ScriptedReply,
    StorageOption, SubmissionError,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const GENERATE: &str = "/generate-data-async/";
const STATUS: &str = "/task-status/";

fn request() -> GenerationRequest {
    let schema = SchemaDescription::new(
        "customers",
        vec![
            FieldSpec::new("customer_id", FieldType::Text).with_constraint("pattern", "^CUST\\d{4}$"),
            FieldSpec::new("signup", FieldType::Date),
        ],
    );
    GenerationRequest::new(schema, 500, OutputFormat::Csv, StorageOption::BlobTarget)
        .expect("valid request")
}

fn controller(client: &Arc<ScriptedHttpClient>, deadline: Option<Duration>) -> JobController {
    JobController::with_endpoints(
        client.clone(),
        ApiEndpoints::new("http://backend.test"),
        PollConfig {
            interval: Duration::from_secs(1),
            deadline,
        },
    )
}

fn status_body(status: &str) -> String {
    format!(r#"{{"task_id":"job-1","status":"{status}"}}"#)
}

fn recorder() -> (Arc<Mutex<Vec<JobStatus>>>, impl FnMut(&Job) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |job: &Job| sink.lock().unwrap().push(job.status.clone()))
}

fn seen_labels(seen: &Arc<Mutex<Vec<JobStatus>>>) -> Vec<&'static str> {
    seen.lock().unwrap().iter().map(JobStatus::label).collect()
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_job_is_submitted_caller_gets_pending_job_before_any_poll() {
    // Given: A backend that accepts the job
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(STATUS, ScriptedReply::ok_json(status_body("SUCCESS")));

    // When: The request is submitted
    let handle = controller(&client, None)
        .submit(&request())
        .await
        .expect("submitted");

    // Then: The job is pending and no status query has been issued yet
    assert_eq!(handle.id(), "job-1");
    assert_eq!(handle.snapshot().status, JobStatus::Pending);
    assert_eq!(client.request_count(STATUS), 0);

    // And: The request body carried the backend's wire labels
    let sent = &client.requests()[0];
    assert_eq!(sent.method, HttpMethod::Post);
    let body: serde_json::Value =
        serde_json::from_str(sent.body.as_deref().expect("body")).expect("json body");
    assert_eq!(body["record_count"], 500);
    assert_eq!(body["output_format"], "csv");
    assert_eq!(body["storage_option"], "blob_storage");

    handle.abandon();
}

#[tokio::test(start_paused = true)]
async fn when_backend_rejects_submission_caller_gets_status_error() {
    // Given: A backend that fails job creation
    let client = Arc::new(ScriptedHttpClient::new());
    client.on(GENERATE, ScriptedReply::status(500));

    // When: The request is submitted
    let error = controller(&client, None)
        .submit(&request())
        .await
        .expect_err("should fail");

    // Then: The status code is reported and nothing is polled
    assert_eq!(error.status_code(), Some(500));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(client.request_count(STATUS), 0);
}

#[tokio::test(start_paused = true)]
async fn when_creation_response_lacks_task_id_submission_is_malformed() {
    // Given: A backend that answers without a task id
    let client = Arc::new(ScriptedHttpClient::new());
    client.on(GENERATE, ScriptedReply::ok_json(r#"{"message":"queued"}"#));

    // When: The request is submitted
    let error = controller(&client, None)
        .submit(&request())
        .await
        .expect_err("should fail");

    // Then: The failure is distinguishable from an HTTP status failure
    assert!(matches!(error, SubmissionError::MalformedResponse { .. }));
    assert_eq!(error.status_code(), None);
}

#[tokio::test(start_paused = true)]
async fn when_backend_is_unreachable_submission_is_a_transport_error() {
    // Given: No route to the backend
    let client = Arc::new(ScriptedHttpClient::new());
    client.on(GENERATE, ScriptedReply::error("connection refused"));

    // When: The request is submitted
    let error = controller(&client, None)
        .submit(&request())
        .await
        .expect_err("should fail");

    // Then: The transport failure is surfaced as such
    assert!(matches!(error, SubmissionError::Transport(_)));
    assert!(error.to_string().contains("connection refused"));
}

// =============================================================================
// Polling lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_job_completes_listener_sees_exactly_one_terminal_update() {
    // Given: A backend progressing PENDING -> RUNNING -> SUCCESS
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(STATUS, ScriptedReply::ok_json(status_body("PENDING")))
        .on(STATUS, ScriptedReply::ok_json(status_body("RUNNING")))
        .on(
            STATUS,
            ScriptedReply::ok_json(
                r#"{"task_id":"job-1","status":"SUCCESS","result":{"records_generated":500}}"#,
            ),
        );
    let (seen, listener) = recorder();

    // When: The job is submitted and allowed to run
    let handle = controller(&client, None)
        .submit_with_listener(&request(), listener)
        .await
        .expect("submitted");
    let finished = handle.wait().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Then: Updates arrive in poll order with a single terminal one
    assert_eq!(seen_labels(&seen), vec!["PENDING", "RUNNING", "SUCCESS"]);
    assert_eq!(
        finished.result(),
        Some(&serde_json::json!({ "records_generated": 500 }))
    );
    assert_eq!(client.request_count(STATUS), 3);
}

#[tokio::test(start_paused = true)]
async fn when_progress_is_reported_listener_sees_counts() {
    // Given: A backend emitting a progress report before succeeding
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(
            STATUS,
            ScriptedReply::ok_json(
                r#"{"status":"PROGRESS","progress":200,"total":500,"message":"Generated 200/500 records"}"#,
            ),
        )
        .on(STATUS, ScriptedReply::ok_json(status_body("SUCCESS")));
    let (seen, listener) = recorder();

    // When: The job runs to completion
    let handle = controller(&client, None)
        .submit_with_listener(&request(), listener)
        .await
        .expect("submitted");
    handle.wait().await;

    // Then: The first update carries the progress report
    let seen = seen.lock().unwrap();
    match &seen[0] {
        JobStatus::Running {
            progress: Some(progress),
        } => {
            assert_eq!((progress.current, progress.total), (200, 500));
            assert_eq!(progress.message.as_deref(), Some("Generated 200/500 records"));
        }
        other => panic!("expected running with progress, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn when_job_is_terminated_polling_stops_after_one_update() {
    // Given: A backend reporting the job as terminated
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(STATUS, ScriptedReply::ok_json(status_body("TERMINATED")));
    let (seen, listener) = recorder();

    // When: Time advances well past several intervals
    let handle = controller(&client, None)
        .submit_with_listener(&request(), listener)
        .await
        .expect("submitted");
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Then: Exactly one terminal update was delivered
    assert_eq!(seen_labels(&seen), vec!["TERMINATED"]);
    assert!(handle.is_finished());
    assert!(!handle.is_abandoned());
    assert_eq!(client.request_count(STATUS), 1);
}

#[tokio::test(start_paused = true)]
async fn when_status_query_fails_job_fails_with_transport_message() {
    // Given: A backend that becomes unreachable after accepting the job
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(STATUS, ScriptedReply::error("connection reset"));
    let (seen, listener) = recorder();

    // When: The first poll runs
    let handle = controller(&client, None)
        .submit_with_listener(&request(), listener)
        .await
        .expect("submitted");
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Then: One failure update carries the transport message and polling stops
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    match &seen[0] {
        JobStatus::Failure { error } => assert!(error.contains("connection reset")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(handle.is_finished());
    assert_eq!(client.request_count(STATUS), 1);
}

#[tokio::test(start_paused = true)]
async fn when_status_endpoint_returns_error_status_job_fails() {
    // Given: A status endpoint answering 502
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(STATUS, ScriptedReply::status(502));

    // When: The job is polled
    let handle = controller(&client, None)
        .submit(&request())
        .await
        .expect("submitted");
    let finished = handle.wait().await;

    // Then: The job failed with the status in its message
    assert!(finished.error().expect("failure").contains("502"));
}

#[tokio::test(start_paused = true)]
async fn when_deadline_passes_job_fails_without_further_queries() {
    // Given: A job that never finishes and a 3.5 second polling budget
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(STATUS, ScriptedReply::ok_json(status_body("RUNNING")));
    let (seen, listener) = recorder();

    // When: The job is polled until the budget runs out
    let handle = controller(&client, Some(Duration::from_millis(3500)))
        .submit_with_listener(&request(), listener)
        .await
        .expect("submitted");
    let finished = handle.wait().await;

    // Then: Three running updates are followed by a deadline failure
    assert_eq!(
        seen_labels(&seen),
        vec!["RUNNING", "RUNNING", "RUNNING", "FAILURE"]
    );
    assert!(finished.error().expect("failure").contains("deadline"));
    assert_eq!(client.request_count(STATUS), 3);
}

#[tokio::test(start_paused = true)]
async fn when_a_listener_panics_polling_and_the_handle_keep_working() {
    // Given: A job whose first listener always panics
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(STATUS, ScriptedReply::ok_json(status_body("RUNNING")))
        .on(STATUS, ScriptedReply::ok_json(status_body("SUCCESS")));
    let (seen, listener) = recorder();
    let handle = controller(&client, None)
        .submit_with_listener(&request(), |_: &Job| panic!("listener bug"))
        .await
        .expect("submitted");
    handle.on_status_change(listener);

    // When: The job runs to completion
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Then: The remaining listener saw every update and the handle is usable
    assert_eq!(seen_labels(&seen), vec!["RUNNING", "SUCCESS"]);
    assert!(handle.is_finished());
    assert_eq!(handle.snapshot().status.label(), "SUCCESS");
    handle.abandon();
    assert!(!handle.is_abandoned());
    assert_eq!(handle.wait().await.status.label(), "SUCCESS");
}

// =============================================================================
// Abandonment
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_job_is_abandoned_no_further_updates_arrive() {
    // Given: A job that keeps running
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(STATUS, ScriptedReply::ok_json(status_body("RUNNING")));
    let (seen, listener) = recorder();
    let handle = controller(&client, None)
        .submit_with_listener(&request(), listener)
        .await
        .expect("submitted");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    let before = seen.lock().unwrap().len();
    let polls_before = client.request_count(STATUS);

    // When: The caller abandons it and time moves on
    handle.abandon();
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Then: Nothing else was delivered or queried
    assert_eq!(before, 2);
    assert_eq!(seen.lock().unwrap().len(), before);
    assert_eq!(client.request_count(STATUS), polls_before);
    assert!(handle.is_abandoned());
}

#[tokio::test(start_paused = true)]
async fn when_job_is_abandoned_mid_query_late_result_is_dropped() {
    // Given: A status query that takes five seconds to answer
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(
            STATUS,
            ScriptedReply::ok_json(status_body("SUCCESS")).delayed(Duration::from_secs(5)),
        );
    let (seen, listener) = recorder();
    let handle = controller(&client, None)
        .submit_with_listener(&request(), listener)
        .await
        .expect("submitted");

    // When: The caller abandons while the first query is in flight
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(client.request_count(STATUS), 1);
    let abandoned = handle.abandon_and_wait().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Then: The late success never reaches the caller
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(abandoned.status, JobStatus::Pending);
    assert_eq!(client.request_count(STATUS), 1);
}

#[tokio::test(start_paused = true)]
async fn when_listener_is_added_later_it_sees_only_subsequent_updates() {
    // Given: A job that runs for two polls before succeeding
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-1"}"#))
        .on(STATUS, ScriptedReply::ok_json(status_body("RUNNING")))
        .on(STATUS, ScriptedReply::ok_json(status_body("RUNNING")))
        .on(STATUS, ScriptedReply::ok_json(status_body("SUCCESS")));
    let handle = controller(&client, None)
        .submit(&request())
        .await
        .expect("submitted");
    tokio::time::sleep(Duration::from_millis(1500)).await;

    // When: A listener registers after the first update
    let (seen, listener) = recorder();
    handle.on_status_change(listener);
    handle.wait().await;

    // Then: It saw the remaining updates only
    assert_eq!(seen_labels(&seen), vec!["RUNNING", "SUCCESS"]);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_two_jobs_run_concurrently_they_do_not_interfere() {
    // Given: Two accepted jobs with different outcomes
    let client = Arc::new(ScriptedHttpClient::new());
    client
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-a"}"#))
        .on(GENERATE, ScriptedReply::ok_json(r#"{"task_id":"job-b"}"#))
        .on("/task-status/job-a", ScriptedReply::ok_json(r#"{"status":"SUCCESS"}"#))
        .on("/task-status/job-b", ScriptedReply::ok_json(r#"{"status":"RUNNING"}"#))
        .on(
            "/task-status/job-b",
            ScriptedReply::ok_json(r#"{"status":"FAILURE","error":"quota exceeded"}"#),
        );
    let controller = controller(&client, None);

    // When: Both are submitted and awaited
    let first = controller.submit(&request()).await.expect("first");
    let second = controller.submit(&request()).await.expect("second");
    let (first, second) = tokio::join!(first.wait(), second.wait());

    // Then: Each job reflects only its own backend state
    assert_eq!(first.id, "job-a");
    assert!(matches!(first.status, JobStatus::Success { .. }));
    assert_eq!(second.id, "job-b");
    assert_eq!(second.error(), Some("quota exceeded"));
    assert_eq!(client.request_count("/task-status/job-a"), 1);
    assert_eq!(client.request_count("/task-status/job-b"), 2);
}
