use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use quiz_backend::{config::Config, routes, AppState};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

const PASSAGE: &str = "Photosynthesis happens inside chloroplasts found in green plant cells. \
Chloroplasts capture sunlight using a special pigment. The pigment absorbs red and blue light very strongly. \
Photosynthesis then releases fresh oxygen into the surrounding air. Gardeners usually water their tomato \
seedlings early every summer morning. Healthy soil gives roots steady nutrients and moisture throughout long \
growing seasons. Bees carry pollen between flowers on warm afternoons.";

fn app() -> Router {
    let config = Config::default();
    let state = AppState::new(&config).expect("state");
    routes::api_router().with_state(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 10 * 1024 * 1024).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let (status, bytes) = send(app, method, uri, body).await;
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send_json(app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_formats() {
    let app = app();

    let (status, body) = send_json(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["remote_configured"], false);

    let (status, body) = send_json(&app, "GET", "/api/formats", None).await;
    assert_eq!(status, StatusCode::OK);
    let formats: Vec<&str> = body["formats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["format"].as_str().unwrap())
        .collect();
    assert_eq!(formats, vec!["txt", "pdf", "docx", "csv"]);

    let (status, body) = send_json(&app, "GET", "/api/remote/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "configured": false, "reachable": false }));
}

#[tokio::test]
async fn short_text_fails_extraction_and_blocks_generation() {
    let app = app();
    let id = new_session(&app).await;

    let forty = "Short text that is exactly forty chars!!";
    assert_eq!(forty.chars().count(), 40);

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/text", id),
        Some(json!({ "text": forty })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("at least 50 characters"));

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/generate", id),
        Some(json!({ "mc_count": 2, "tf_count": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_edit_export_and_score_flow() {
    let app = app();
    let id = new_session(&app).await;

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/text", id),
        Some(json!({ "text": PASSAGE, "label": "Plants" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"]["origin"], "Plants");
    assert_eq!(body["stats"]["sentences"], 7);

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/generate", id),
        Some(json!({ "mc_count": 3, "tf_count": 2, "difficulty": "hard" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "local");
    let questions = body["questions"].as_array().unwrap().clone();
    assert_eq!(questions.len(), 5);
    assert_eq!(questions[0]["type"], "multiple_choice");
    assert_eq!(questions[4]["type"], "true_false");
    assert!(!body["logs"].as_array().unwrap().is_empty());

    // Invalid edit is rejected and nothing changes.
    let first_id = questions[0]["id"].as_str().unwrap().to_string();
    let (status, body) = send_json(
        &app,
        "PATCH",
        &format!("/api/sessions/{}/questions/{}", id, first_id),
        Some(json!({ "correct_index": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["question_id"], first_id.as_str());

    let (_, listed) = send_json(&app, "GET", &format!("/api/sessions/{}/questions", id), None).await;
    assert_eq!(listed[0], questions[0]);

    // Valid edit.
    let (status, body) = send_json(
        &app,
        "PATCH",
        &format!("/api/sessions/{}/questions/{}", id, first_id),
        Some(json!({ "prompt": "Which process releases oxygen?", "explanation": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompt"], "Which process releases oxygen?");
    assert!(body["explanation"].is_null());

    // Unknown question id on update.
    let missing = uuid::Uuid::new_v4();
    let (status, body) = send_json(
        &app,
        "PATCH",
        &format!("/api/sessions/{}/questions/{}", id, missing),
        Some(json!({ "prompt": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["question_id"], missing.to_string());

    // Add a true/false question without options.
    let (status, added) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/questions", id),
        Some(json!({ "type": "true_false", "prompt": "Bees carry pollen.", "correct_index": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["options"], json!(["True", "False"]));

    // Remove twice: both succeed.
    let removed_id = questions[1]["id"].as_str().unwrap().to_string();
    for _ in 0..2 {
        let (status, _) = send(
            &app,
            "DELETE",
            &format!("/api/sessions/{}/questions/{}", id, removed_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (_, listed) = send_json(&app, "GET", &format!("/api/sessions/{}/questions", id), None).await;
    let mut ids: Vec<String> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 5);
    assert!(!ids.contains(&removed_id));

    // Partial reorder is rejected, full reversal applied.
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/sessions/{}/questions/order", id),
        Some(json!({ "ids": &ids[..2] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ids.reverse();
    let (status, reordered) = send_json(
        &app,
        "PUT",
        &format!("/api/sessions/{}/questions/order", id),
        Some(json!({ "ids": ids })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let prompts: Vec<String> = reordered
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["prompt"].as_str().unwrap().to_string())
        .collect();

    // Text export lists every question once, in session order, in both sections.
    let (status, bytes) = send(&app, "GET", &format!("/api/sessions/{}/export", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    let (body_part, key_part) = text.split_once("ANSWER KEY").unwrap();
    let mut cursor = 0;
    for (n, prompt) in prompts.iter().enumerate() {
        let found = body_part[cursor..]
            .find(prompt.as_str())
            .unwrap_or_else(|| panic!("prompt {} missing or out of order", n + 1));
        cursor += found + prompt.len();
        assert!(key_part.contains(&format!("\n{}. ", n + 1)));
    }
    assert!(!key_part.contains(&format!("\n{}. ", prompts.len() + 1)));

    // Score: answer everything correctly except the first.
    let answers: Vec<JsonValue> = reordered
        .as_array()
        .unwrap()
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let correct = q["correct_index"].as_u64().unwrap();
            let selected = if i == 0 { (correct + 1) % 2 } else { correct };
            json!({ "question_id": q["id"], "selected": selected })
        })
        .collect();
    let (status, report) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/score", id),
        Some(json!({ "answers": answers })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total"], 5);
    assert_eq!(report["correct"], 4);
    assert_eq!(report["grade"], "Excellent");
}

#[tokio::test]
async fn content_without_usable_sentences_is_insufficient() {
    let app = app();
    let id = new_session(&app).await;

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/text", id),
        Some(json!({ "text": "Yes. No. Maybe. Sure. Fine. Okay. Right. Good. Great. Nice. Wow. Indeed." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/generate", id),
        Some(json!({ "mc_count": 2, "tf_count": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("enough"));
}

#[tokio::test]
async fn zero_counts_and_unknown_sessions_are_rejected() {
    let app = app();
    let id = new_session(&app).await;

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/generate", id),
        Some(json!({ "mc_count": 0, "tf_count": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send_json(&app, "GET", &format!("/api/sessions/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let (status, _) = send(&app, "DELETE", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn multipart_upload_and_unknown_export_format() {
    let app = app();
    let id = new_session(&app).await;

    let boundary = "quizboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\n{text}\r\n--{b}--\r\n",
        b = boundary,
        text = PASSAGE
    );
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/sessions/{}/documents", id))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: JsonValue =
        serde_json::from_slice(&to_bytes(resp.into_body(), 1024 * 1024).await.unwrap()).unwrap();
    assert_eq!(json["source"]["format"], "txt");
    assert_eq!(json["source"]["origin"], "notes.txt");

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"slides.pptx\"\r\n\r\nxx\r\n--{b}--\r\n",
        b = boundary
    );
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/sessions/{}/documents", id))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, "GET", &format!("/api/sessions/{}/export?format=pdf", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
