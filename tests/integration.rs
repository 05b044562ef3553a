use quiz_solver::{build_state, config::AppConfig, routes::build_router};
use serde_json::{json, Value};

async fn spawn_server() -> (String, reqwest::Client) {
    let state = build_state(&AppConfig::default()).expect("state");
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), reqwest::Client::new())
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> reqwest::Response {
    client.post(url).json(&body).send().await.unwrap()
}

fn choice_payload() -> String {
    json!({
        "questions": [
            {
                "question_text": "Which planet is largest?",
                "options": ["Jupiter", "Mars", "Venus"],
                "correct_answer": "A",
                "explanation": "Jupiter is a gas giant."
            },
            {
                "question_text": "Which planet is red?",
                "options": ["Jupiter", "Mars", "Venus"],
                "correct_answer": "B"
            }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn solve_navigate_and_score() {
    let (base, client) = spawn_server().await;

    let created = post(
        &client,
        format!("{}/api/v1/quiz-sessions", base),
        json!({"rawJson": choice_payload(), "name": "Planets"}),
    )
    .await;
    assert_eq!(created.status(), 201);
    let body = created.json::<Value>().await.unwrap();
    assert_eq!(body["questionType"], "multiple_choice");
    assert_eq!(body["total"], 2);
    assert!(body.get("reference").is_none());
    let id = body["sessionId"].as_str().unwrap().to_string();
    let session_url = format!("{}/api/v1/quiz-sessions/{}", base, id);

    let early = post(&client, format!("{}/reveal", session_url), json!({})).await;
    assert_eq!(early.status(), 409);

    let answered = post(&client, format!("{}/answer", session_url), json!({"answer": "1"})).await;
    assert_eq!(answered.status(), 200);

    let revealed = post(&client, format!("{}/reveal", session_url), json!({})).await;
    let revealed = revealed.json::<Value>().await.unwrap();
    assert_eq!(revealed["showResult"], true);
    assert_eq!(revealed["correct"], true);
    assert_eq!(revealed["reference"], "A");
    assert_eq!(revealed["explanation"], "Jupiter is a gas giant.");

    let again = post(&client, format!("{}/reveal", session_url), json!({})).await;
    assert_eq!(again.json::<Value>().await.unwrap()["correct"], true);

    let locked = post(&client, format!("{}/answer", session_url), json!({"answer": "2"})).await;
    assert_eq!(locked.status(), 409);

    let score = client.get(format!("{}/score", session_url)).send().await.unwrap();
    let score = score.json::<Value>().await.unwrap();
    assert_eq!(score["correct"], 1);
    assert_eq!(score["answered"], 1);
    assert_eq!(score["total"], 2);

    let next = post(&client, format!("{}/next", session_url), json!({})).await;
    let next = next.json::<Value>().await.unwrap();
    assert_eq!(next["index"], 1);
    assert_eq!(next["showResult"], false);
    assert!(next["answer"].is_null());

    let past_end = post(&client, format!("{}/next", session_url), json!({})).await;
    assert_eq!(past_end.status(), 409);

    let prev = post(&client, format!("{}/prev", session_url), json!({})).await;
    let prev = prev.json::<Value>().await.unwrap();
    assert_eq!(prev["index"], 0);
    assert!(prev["answer"].is_null());

    let deleted = client.delete(&session_url).send().await.unwrap();
    assert_eq!(deleted.status(), 204);
    let gone = client.get(&session_url).send().await.unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn malformed_payload_is_rejected() {
    let (base, client) = spawn_server().await;

    let resp = post(
        &client,
        format!("{}/api/v1/quiz-sessions", base),
        json!({"rawJson": "{\"questions\": ["}),
    )
    .await;
    assert_eq!(resp.status(), 422);
    let body = resp.json::<Value>().await.unwrap();
    assert_eq!(body["error"]["code"], "MALFORMED_PAYLOAD");

    let resp = post(&client, format!("{}/api/v1/quiz-sessions", base), json!({})).await;
    assert_eq!(resp.status(), 422);
    let body = resp.json::<Value>().await.unwrap();
    assert_eq!(body["error"]["code"], "MISSING_PAYLOAD");
}

#[tokio::test]
async fn fill_in_the_blank_with_keyed_answer() {
    let (base, client) = spawn_server().await;
    let payload = json!({
        "question": "The ____ is blue and the ____ is green.",
        "correct_answers": ["sky", "grass"]
    })
    .to_string();

    let created = post(&client, format!("{}/api/v1/quiz-sessions", base), json!({"rawJson": payload})).await;
    let body = created.json::<Value>().await.unwrap();
    assert_eq!(body["questionType"], "fill_in_the_blank");
    assert_eq!(body["question"]["blankIds"], json!(["0", "1"]));
    let session_url = format!("{}/api/v1/quiz-sessions/{}", base, body["sessionId"].as_str().unwrap());

    post(&client, format!("{}/answer", session_url), json!({"answer": {"0": " Sky", "1": "GRASS"}})).await;
    let revealed = post(&client, format!("{}/reveal", session_url), json!({})).await;
    assert_eq!(revealed.json::<Value>().await.unwrap()["correct"], true);
}

#[tokio::test]
async fn generate_save_and_replay_questions() {
    let (base, client) = spawn_server().await;

    let generated = post(
        &client,
        format!("{}/api/v1/ai/questions", base),
        json!({"text": "Photosynthesis turns light into chemical energy", "questionType": "descriptive", "questionCount": 3}),
    )
    .await;
    assert_eq!(generated.status(), 200);
    let generated = generated.json::<Value>().await.unwrap();
    assert_eq!(generated["questionType"], "descriptive");
    assert_eq!(generated["questionCount"], 3);
    let raw_json = generated["rawJson"].as_str().unwrap().to_string();

    let saved = post(
        &client,
        format!("{}/api/v1/saved/question-sets", base),
        json!({"title": "Biology", "rawJson": raw_json}),
    )
    .await;
    assert_eq!(saved.status(), 201);
    let saved = saved.json::<Value>().await.unwrap();
    assert_eq!(saved["questionType"], "descriptive");

    let listed = client
        .get(format!("{}/api/v1/saved/question-sets", base))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(listed["total"], 1);

    let replay = post(
        &client,
        format!("{}/api/v1/saved/question-sets/{}/session", base, saved["id"].as_str().unwrap()),
        json!({}),
    )
    .await;
    assert_eq!(replay.status(), 201);
    assert_eq!(replay.json::<Value>().await.unwrap()["total"], 3);
}

#[tokio::test]
async fn bad_generation_requests() {
    let (base, client) = spawn_server().await;

    let resp = post(
        &client,
        format!("{}/api/v1/ai/questions", base),
        json!({"text": "", "questionCount": 0}),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body = resp.json::<Value>().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);

    let resp = post(
        &client,
        format!("{}/api/v1/ai/questions", base),
        json!({"text": "Topic", "questionType": "matching", "questionCount": 1}),
    )
    .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn summarize_save_and_export() {
    let (base, client) = spawn_server().await;

    let summary = post(
        &client,
        format!("{}/api/v1/ai/summary", base),
        json!({"text": "Cells divide. DNA is copied first. Then the cell splits."}),
    )
    .await;
    assert_eq!(summary.status(), 200);
    let summary = summary.json::<Value>().await.unwrap()["summary"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(summary, "Cells divide. DNA is copied first.");

    let upstream = post(&client, format!("{}/api/v1/ai/summary", base), json!({"text": " ... "})).await;
    assert_eq!(upstream.status(), 502);

    let saved = post(
        &client,
        format!("{}/api/v1/saved/summaries", base),
        json!({"title": "Mitosis", "content": summary}),
    )
    .await;
    assert_eq!(saved.status(), 201);
    let blank_title = post(
        &client,
        format!("{}/api/v1/saved/summaries", base),
        json!({"title": "   ", "content": summary}),
    )
    .await;
    assert_eq!(blank_title.status(), 400);
    let blank_title = blank_title.json::<Value>().await.unwrap();
    assert_eq!(blank_title["error"]["details"][0]["issue"], "must not be blank");

    let id = saved.json::<Value>().await.unwrap()["id"].as_str().unwrap().to_string();

    let exported = client
        .get(format!("{}/api/v1/saved/summaries/{}/export", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(exported.status(), 200);
    assert!(exported
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/markdown"));
    let text = exported.text().await.unwrap();
    assert!(text.starts_with("# Mitosis"));
    assert!(text.contains("DNA is copied first."));
}
