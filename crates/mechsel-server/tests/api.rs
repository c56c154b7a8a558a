use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mechsel_core::{JsonObject, MotorRecord, SelectionQuery};
use mechsel_server::catalog::{CatalogError, CatalogStore, MemoryCatalog};
use mechsel_server::reference::{ReferenceError, ReferenceImageSource};
use mechsel_server::{router, AppState};
use mechsel_suggest::{ImageAttachment, ImageKind, InvokeError, ModelInvoker, ModelRequest};

// --- Stubs ---

struct StubModel {
    reply: Result<String, InvokeError>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl StubModel {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: InvokeError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_prompt(&self) -> String {
        self.requests.lock().unwrap().last().unwrap().prompt.clone()
    }
}

#[async_trait]
impl ModelInvoker for StubModel {
    fn model(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: ModelRequest) -> Result<String, InvokeError> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(InvokeError::Timeout(d)) => Err(InvokeError::Timeout(*d)),
            Err(InvokeError::Model(m)) => Err(InvokeError::Model(m.clone())),
            Err(e) => Err(InvokeError::Unavailable(e.to_string())),
        }
    }
}

/// Memory catalog that counts queries.
struct CountingCatalog {
    inner: MemoryCatalog,
    queries: AtomicUsize,
}

#[async_trait]
impl CatalogStore for CountingCatalog {
    async fn find_motors(&self, query: &SelectionQuery) -> Result<Vec<MotorRecord>, CatalogError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.find_motors(query).await
    }
}

struct StaticReference;

#[async_trait]
impl ReferenceImageSource for StaticReference {
    async fn fetch(&self) -> Result<ImageAttachment, ReferenceError> {
        Ok(ImageAttachment {
            kind: ImageKind::Jpeg,
            bytes: b"table".to_vec(),
        })
    }
}

fn motor(id: &str, power: f64, speed: f64) -> MotorRecord {
    MotorRecord {
        id: id.into(),
        power,
        speed,
        extra: JsonObject::new(),
    }
}

struct Harness {
    app: Router,
    model: Arc<StubModel>,
    catalog: Arc<CountingCatalog>,
}

fn harness(model: Arc<StubModel>, motors: Vec<MotorRecord>) -> Harness {
    let catalog = Arc::new(CountingCatalog {
        inner: MemoryCatalog::new(motors),
        queries: AtomicUsize::new(0),
    });
    let state = AppState {
        catalog: catalog.clone(),
        invoker: model.clone(),
        reference: Some(Arc::new(StaticReference)),
        candidate_limit: 50,
        upload_limit_bytes: 1024 * 1024,
    };
    Harness {
        app: router(state),
        model,
        catalog,
    }
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

const BOUNDARY: &str = "mechsel-test-boundary";

fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: image/png\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api-ai/extract-form-image")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn full_form() -> Value {
    json!({
        "F": 7500, "v": 0.9, "D": 400, "L": 5,
        "t1": 15, "t2": 30, "T1": 1.0, "T2": 0.6,
        "nol": 0.99, "nbr": 0.97, "nx": 0.93,
        "uh": 12.5, "u1": 4.2, "u2": 2.97, "ux": 2.5
    })
}

// --- find-motor ---

#[tokio::test]
async fn find_motor_returns_model_choice() {
    let h = harness(
        StubModel::replying("```json\n{\"best_motor_id\":\"42\",\"reason\":\"fits\"}\n```"),
        vec![motor("42", 4.0, 1420.0), motor("7", 2.2, 1420.0)],
    );
    let (status, body) = post_json(
        &h.app,
        "/api-ai/find-motor",
        json!({"requiredPower": 3.5, "requiredSpeed": 1400}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"best_motor_id": "42", "reason": "fits"}));
    let prompt = h.model.last_prompt();
    assert!(prompt.contains("\"id\": \"42\""));
    assert!(!prompt.contains("\"id\": \"7\""));
}

#[tokio::test]
async fn find_motor_zero_or_missing_input_is_rejected_early() {
    let h = harness(StubModel::replying("{}"), vec![motor("1", 4.0, 1420.0)]);
    for body in [
        json!({"requiredPower": 0, "requiredSpeed": 1400}),
        json!({"requiredPower": 4, "requiredSpeed": 0}),
        json!({"requiredSpeed": 1400}),
        json!({}),
    ] {
        let (status, response) = post_json(&h.app, "/api-ai/find-motor", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({"error": "missing input parameters"}));
    }
    assert_eq!(h.catalog.queries.load(Ordering::SeqCst), 0);
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn find_motor_with_empty_catalog_still_asks_model() {
    let h = harness(StubModel::replying("No motor qualifies."), vec![]);
    let (status, body) = post_json(
        &h.app,
        "/api-ai/find-engine",
        json!({"cong_suat_can_tim": 90, "van_toc_quay_can_tim": 3000}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["best_motor_id"], Value::Null);
    assert!(body["reason"].as_str().is_some());
    assert_eq!(h.model.calls(), 1);
    assert!(h.model.last_prompt().contains("### Motor list:\n[]"));
}

#[tokio::test]
async fn find_motor_model_failure_is_500() {
    let h = harness(
        StubModel::failing(InvokeError::Model("chat: 503 overloaded".into())),
        vec![motor("1", 4.0, 1420.0)],
    );
    let (status, body) = post_json(
        &h.app,
        "/api-ai/find-motor",
        json!({"requiredPower": 1, "requiredSpeed": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "model error: chat: 503 overloaded"}));
}

#[tokio::test]
async fn find_motor_malformed_json_is_400() {
    let h = harness(StubModel::replying("{}"), vec![]);
    let request = Request::builder()
        .method("POST")
        .uri("/api-ai/find-motor")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());
    assert_eq!(h.model.calls(), 0);
}

// --- find-material ---

#[tokio::test]
async fn find_material_returns_material() {
    let answer = json!({
        "vat_lieu": "Thép 45",
        "nhiet_luyen": "Tôi cải thiện",
        "do_ran_be_mat": "HB170...210",
        "giai_thich": "ok"
    });
    let h = harness(
        StubModel::replying(&format!("```json\n{answer}\n```")),
        vec![],
    );
    let (status, body) = post_json(&h.app, "/api-ai/find-material", json!({"sH": 480, "z": 25})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, answer);
    let requests = h.model.requests.lock().unwrap();
    let image = requests[0].image.as_ref().unwrap();
    assert_eq!(image.kind, ImageKind::Jpeg);
    assert!(requests[0].prompt.contains("Chain speed (v): null"));
}

#[tokio::test]
async fn find_material_unreadable_answer_is_error_object() {
    let h = harness(StubModel::replying("The table is blurry."), vec![]);
    let (status, body) = post_json(&h.app, "/api-ai/find-material", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn find_material_without_reference_image_is_500() {
    let model = StubModel::replying("{}");
    let state = AppState {
        catalog: Arc::new(MemoryCatalog::default()),
        invoker: model.clone(),
        reference: None,
        candidate_limit: 50,
        upload_limit_bytes: 1024,
    };
    let (status, body) = post_json(&router(state), "/api-ai/find-material", json!({"sH": 1})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("IMAGE_URL"));
    assert_eq!(model.calls(), 0);
}

// --- extract-form-image ---

#[tokio::test]
async fn extract_form_returns_all_fields() {
    let h = harness(StubModel::replying(&full_form().to_string()), vec![]);
    let (status, body) = send(&h.app, multipart(&[("file", Some("form.png"), b"png-bytes")])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, full_form());
    let requests = h.model.requests.lock().unwrap();
    let image = requests[0].image.as_ref().unwrap();
    assert_eq!(image.bytes, b"png-bytes".to_vec());
    assert_eq!(image.kind, ImageKind::Png);
}

#[tokio::test]
async fn extract_form_missing_t2_is_listed() {
    let mut partial = full_form();
    partial.as_object_mut().unwrap().remove("t2");
    let h = harness(
        StubModel::replying(&format!("Here you go:\n```json\n{partial}\n```")),
        vec![],
    );
    let (status, body) = send(&h.app, multipart(&[("file", Some("form.png"), b"png")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("missing fields: t2"));
    assert_eq!(body["data"], partial);
}

#[tokio::test]
async fn extract_form_null_field_counts_as_missing() {
    let mut partial = full_form();
    partial["ux"] = Value::Null;
    let h = harness(StubModel::replying(&partial.to_string()), vec![]);
    let (status, body) = send(&h.app, multipart(&[("file", Some("form.png"), b"png")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("missing fields: ux"));
}

#[tokio::test]
async fn extract_form_unreadable_answer_lists_every_field() {
    let h = harness(StubModel::replying("I cannot read this."), vec![]);
    let (status, body) = send(&h.app, multipart(&[("file", Some("form.png"), b"png")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("missing fields: F, v, D, L, t1, t2"));
    assert!(body["data"]["error"].as_str().is_some());
}

#[tokio::test]
async fn extract_form_without_file_part_is_400() {
    let h = harness(StubModel::replying("{}"), vec![]);
    let (status, body) = send(&h.app, multipart(&[("note", None, b"hello")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "no file part in the request"}));
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn extract_form_with_empty_filename_is_400() {
    let h = harness(StubModel::replying("{}"), vec![]);
    let (status, body) = send(&h.app, multipart(&[("file", Some(""), b"")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "no file selected"}));
}

#[tokio::test]
async fn extract_form_timeout_is_500() {
    let h = harness(
        StubModel::failing(InvokeError::Timeout(std::time::Duration::from_secs(60))),
        vec![],
    );
    let (status, body) = send(
        &h.app,
        multipart(&[("file", Some("form.png"), b"png")]),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "model call timed out after 60s"}));
}

#[tokio::test]
async fn health_is_ok() {
    let h = harness(StubModel::replying("{}"), vec![]);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
