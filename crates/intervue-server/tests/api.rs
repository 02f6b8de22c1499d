use std::sync::Arc;

use serde_json::{json, Value};

use intervue_core::config::{BrokerConfig, IntervueConfig};
use intervue_server::{build_router, AppState};

fn test_config() -> IntervueConfig {
    IntervueConfig {
        storage: intervue_core::config::StorageConfig {
            url: ":memory:".into(),
        },
        ..Default::default()
    }
}

async fn spawn_app(config: IntervueConfig) -> String {
    let state = Arc::new(AppState::new(config).expect("app state"));
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

async fn start_session(client: &reqwest::Client, base: &str, num_questions: u32) -> Value {
    let resp = client
        .post(format!("{base}/interview/start"))
        .json(&json!({
            "job_title": "Software Engineer",
            "seniority": "mid",
            "language": "en",
            "num_questions": num_questions,
        }))
        .send()
        .await
        .expect("start");
    assert_eq!(resp.status(), 200);
    resp.json().await.expect("start body")
}

/// Answer every question in order; returns the overall score of each answer.
async fn answer_all(
    client: &reqwest::Client,
    base: &str,
    session_id: &str,
    first_question: Value,
    answer_text: &str,
) -> Vec<u8> {
    let mut scores = Vec::new();
    let mut question = first_question;
    loop {
        let resp = client
            .post(format!("{base}/interview/answer"))
            .json(&json!({
                "session_id": session_id,
                "question_id": question["question_id"],
                "user_answer_text": answer_text,
            }))
            .send()
            .await
            .expect("answer");
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.expect("answer body");
        scores.push(body["score_overall"].as_u64().expect("score") as u8);
        if body["is_last_question"].as_bool().expect("is_last") {
            assert!(body.get("next_question").is_none());
            break;
        }
        question = body["next_question"].clone();
    }
    scores
}

#[tokio::test]
async fn happy_scripted_path_round_trips_the_mean() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    let started = start_session(&client, &base, 3).await;
    let session_id = started["session_id"].as_str().expect("id").to_string();
    let first = started["first_question"].clone();
    assert_eq!(first["index"], 1);

    let answer = "I built a distributed cache for our session store, profiled the hot \
                  paths, and cut p99 latency by forty percent over one quarter.";
    let scores = answer_all(&client, &base, &session_id, first, answer).await;
    assert_eq!(scores.len(), 3);
    // Same answer text: the fallback evaluator is deterministic, so the
    // mean equals each individual score.
    assert!(scores.iter().all(|s| s == &scores[0]));

    let resp = client
        .post(format!("{base}/interview/finish"))
        .json(&json!({ "session_id": session_id }))
        .send()
        .await
        .expect("finish");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("finish body");
    let summary = &body["summary"];
    assert_eq!(summary["overall_score"].as_u64().unwrap() as u8, scores[0]);
    assert_eq!(summary["generated_by"], "fallback");
    let len = |key: &str| summary[key].as_array().unwrap().len();
    assert!((2..=5).contains(&len("strengths")));
    assert!((2..=5).contains(&len("weaknesses")));
    assert!((3..=6).contains(&len("action_plan")));
    assert!((2..=4).contains(&len("suggested_roles")));
    assert!(summary.get("completion_note").is_none());

    // The session snapshot reflects completion.
    let resp = client
        .get(format!("{base}/interview/session/{session_id}"))
        .send()
        .await
        .expect("snapshot");
    let session: Value = resp.json().await.expect("session body");
    assert_eq!(session["status"], "completed");
    assert!(session["completed_at"].is_string());
}

#[tokio::test]
async fn one_and_twenty_question_sessions_both_complete() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    for n in [1u32, 20] {
        let started = start_session(&client, &base, n).await;
        let session_id = started["session_id"].as_str().unwrap().to_string();
        let scores = answer_all(
            &client,
            &base,
            &session_id,
            started["first_question"].clone(),
            "A short but complete answer with one concrete example inside.",
        )
        .await;
        assert_eq!(scores.len(), n as usize);

        let resp = client
            .post(format!("{base}/interview/finish"))
            .json(&json!({ "session_id": session_id }))
            .send()
            .await
            .expect("finish");
        assert_eq!(resp.status(), 200, "n = {n}");
    }
}

#[tokio::test]
async fn validation_rejects_bad_start_requests() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    for (body, reason) in [
        (
            json!({"job_title": "  ", "seniority": "mid", "num_questions": 3}),
            "empty title",
        ),
        (
            json!({"job_title": "Engineer", "seniority": "principal", "num_questions": 3}),
            "unknown seniority",
        ),
        (
            json!({"job_title": "Engineer", "seniority": "mid", "num_questions": 0}),
            "zero questions",
        ),
        (
            json!({"job_title": "Engineer", "seniority": "mid", "num_questions": 21}),
            "too many questions",
        ),
    ] {
        let resp = client
            .post(format!("{base}/interview/start"))
            .json(&body)
            .send()
            .await
            .expect("start");
        assert_eq!(resp.status(), 400, "{reason}");
    }
}

#[tokio::test]
async fn empty_answer_is_rejected_and_wrong_session_is_not_found() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    let first = start_session(&client, &base, 2).await;
    let second = start_session(&client, &base, 2).await;

    let resp = client
        .post(format!("{base}/interview/answer"))
        .json(&json!({
            "session_id": first["session_id"],
            "question_id": first["first_question"]["question_id"],
            "user_answer_text": "   ",
        }))
        .send()
        .await
        .expect("answer");
    assert_eq!(resp.status(), 400);

    // A question from another session reads as NotFound.
    let resp = client
        .post(format!("{base}/interview/answer"))
        .json(&json!({
            "session_id": second["session_id"],
            "question_id": first["first_question"]["question_id"],
            "user_answer_text": "A real answer.",
        }))
        .send()
        .await
        .expect("answer");
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("{base}/interview/answer"))
        .json(&json!({
            "session_id": "no-such-session",
            "question_id": first["first_question"]["question_id"],
            "user_answer_text": "A real answer.",
        }))
        .send()
        .await
        .expect("answer");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn double_answer_conflicts() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    let started = start_session(&client, &base, 2).await;
    let question_id = started["first_question"]["question_id"].clone();
    let body = json!({
        "session_id": started["session_id"],
        "question_id": question_id,
        "user_answer_text": "First and only answer.",
    });

    let resp = client
        .post(format!("{base}/interview/answer"))
        .json(&body)
        .send()
        .await
        .expect("first");
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{base}/interview/answer"))
        .json(&body)
        .send()
        .await
        .expect("second");
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn finish_before_all_answered_lists_the_missing_indices() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    let started = start_session(&client, &base, 3).await;
    let session_id = started["session_id"].as_str().unwrap();

    let resp = client
        .post(format!("{base}/interview/answer"))
        .json(&json!({
            "session_id": session_id,
            "question_id": started["first_question"]["question_id"],
            "user_answer_text": "Only the first question gets an answer.",
        }))
        .send()
        .await
        .expect("answer");
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{base}/interview/finish"))
        .json(&json!({ "session_id": session_id }))
        .send()
        .await
        .expect("finish");
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.expect("conflict body");
    assert_eq!(body["unanswered"], json!([2, 3]));
}

#[tokio::test]
async fn report_on_empty_session_is_degenerate_not_an_error() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    let started = start_session(&client, &base, 5).await;
    let session_id = started["session_id"].as_str().unwrap();

    let resp = client
        .get(format!("{base}/interview/session/{session_id}/report"))
        .send()
        .await
        .expect("report");
    assert_eq!(resp.status(), 200);
    let report: Value = resp.json().await.expect("report body");
    assert_eq!(report["overall_score"], 0);
    assert!(report["completion_note"].is_string());
}

#[tokio::test]
async fn concurrent_report_requests_agree() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    let started = start_session(&client, &base, 2).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();
    answer_all(
        &client,
        &base,
        &session_id,
        started["first_question"].clone(),
        "The same deterministic answer for both questions in this session.",
    )
    .await;

    let url = format!("{base}/interview/session/{session_id}/report");
    let (a, b) = tokio::join!(client.get(&url).send(), client.get(&url).send());
    let a: Value = a.expect("first").json().await.expect("first body");
    let b: Value = b.expect("second").json().await.expect("second body");
    assert_eq!(a, b);

    let session: Value = client
        .get(format!("{base}/interview/session/{session_id}"))
        .send()
        .await
        .expect("snapshot")
        .json()
        .await
        .expect("session body");
    assert_eq!(session["status"], "completed");
    assert!(session["completed_at"].is_string());
}

#[tokio::test]
async fn broker_unconfigured_means_text_only_mode() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    let started = start_session(&client, &base, 2).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();

    let resp = client
        .post(format!("{base}/livekit/token"))
        .json(&json!({ "session_id": session_id, "participant_name": "alice" }))
        .send()
        .await
        .expect("token");
    assert_eq!(resp.status(), 503);

    // Scripted answering and finishing still work without transport.
    answer_all(
        &client,
        &base,
        &session_id,
        started["first_question"].clone(),
        "Text-only sessions keep working without the realtime transport.",
    )
    .await;
    let resp = client
        .post(format!("{base}/interview/finish"))
        .json(&json!({ "session_id": session_id }))
        .send()
        .await
        .expect("finish");
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn token_endpoint_mints_for_the_interview_room() {
    let mut config = test_config();
    config.broker = Some(BrokerConfig {
        url: "wss://broker.example.com".into(),
        api_key: "key".into(),
        api_secret: "secret-value".into(),
    });
    let base = spawn_app(config).await;
    let client = reqwest::Client::new();

    let started = start_session(&client, &base, 2).await;
    let session_id = started["session_id"].as_str().unwrap();

    let resp = client
        .post(format!("{base}/livekit/token"))
        .json(&json!({ "session_id": session_id, "participant_name": "alice" }))
        .send()
        .await
        .expect("token");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("token body");
    assert_eq!(
        body["room_name"].as_str().unwrap(),
        format!("interview-{session_id}")
    );
    assert_eq!(body["url"], "wss://broker.example.com");
    assert_eq!(body["token"].as_str().unwrap().split('.').count(), 3);

    let resp = client
        .post(format!("{base}/livekit/token"))
        .json(&json!({ "session_id": "ghost", "participant_name": "alice" }))
        .send()
        .await
        .expect("token");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn unknown_session_snapshot_is_not_found() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{base}/interview/session/does-not-exist"))
        .send()
        .await
        .expect("snapshot");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn conversational_sessions_skip_question_pregeneration() {
    let base = spawn_app(test_config()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/interview/start"))
        .json(&json!({
            "job_title": "Engineering Manager",
            "seniority": "lead",
            "num_questions": 4,
            "mode": "conversational",
        }))
        .send()
        .await
        .expect("start");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("body");
    assert!(body.get("first_question").is_none());

    let session: Value = client
        .get(format!(
            "{base}/interview/session/{}",
            body["session_id"].as_str().unwrap()
        ))
        .send()
        .await
        .expect("snapshot")
        .json()
        .await
        .expect("session body");
    assert_eq!(session["mode"], "conversational");
}
