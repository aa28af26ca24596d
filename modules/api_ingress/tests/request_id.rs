use axum::{
    body::Body,
    extract::Extension,
    http::{Request, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

use api_ingress::request_id::XRequestId;
use api_ingress::{ApiIngress, ApiIngressConfig, RestfulModule};

struct EchoModule;

impl RestfulModule for EchoModule {
    fn register_rest(&self, router: Router, _ingress: &ApiIngress) -> anyhow::Result<Router> {
        Ok(router.route("/echo", get(echo_handler)))
    }
}

async fn echo_handler(Extension(XRequestId(request_id)): Extension<XRequestId>) -> Json<Value> {
    Json(json!({"status": "ok", "request_id": request_id}))
}

fn test_app() -> Router {
    let ingress = ApiIngress::new(ApiIngressConfig::default(), &runtime::ServerConfig::default());
    ingress.build_router(&[&EchoModule]).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn generates_request_id_when_missing() {
    let response = test_app()
        .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let header = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .expect("x-request-id should be generated");
    assert!(!header.is_empty());

    // Handlers see the same id that is sent back
    let json = body_json(response).await;
    assert_eq!(json["request_id"], header.as_str());
}

#[tokio::test]
async fn preserves_incoming_request_id() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/echo")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok());
    assert_eq!(request_id, Some("abc-123"));

    let json = body_json(response).await;
    assert_eq!(json["request_id"], "abc-123");
}

#[tokio::test]
async fn fallback_responses_carry_request_id() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/nowhere")
                .header("x-request-id", "missing-route-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("missing-route-1")
    );
}
