use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use grouper::{
    api::rest::routes::register_routes,
    domain::service::{Service, ServiceConfig},
    infra::storage::memory::InMemoryDirectory,
};

const PREFIX: &str = "/grouper/api/v1";

fn create_test_router() -> Router {
    let service = Arc::new(Service::new(
        Arc::new(InMemoryDirectory::new()),
        ServiceConfig::default(),
    ));
    register_routes(Router::new(), service, PREFIX).expect("Failed to register routes")
}

async fn call(router: &Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("{PREFIX}{path}"));
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_user_and_group_lifecycle() {
    let router = create_test_router();

    let (status, body) = call(&router, Method::POST, "/groups", Some(json!({"name": "eng"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({"message": "Group added.", "group": {"id": 1, "name": "eng", "users": []}})
    );

    let (status, body) = call(
        &router,
        Method::POST,
        "/users",
        Some(json!({"name": "alice", "email": "alice@q.bio", "groups": [1]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User added.");
    assert_eq!(
        body["user"],
        json!({"id": 1, "name": "alice", "email": "alice@q.bio", "groups": [1]})
    );

    let (status, body) = call(&router, Method::GET, "/groups/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"group": {"id": 1, "name": "eng", "users": [1]}}));

    let (status, body) = call(&router, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 1);

    let (status, body) = call(&router, Method::DELETE, "/groups/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Group deleted."}));

    let (_, body) = call(&router, Method::GET, "/users/1", None).await;
    assert_eq!(body["user"]["groups"], json!([]));

    let (status, body) = call(&router, Method::DELETE, "/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "User deleted."}));

    let (status, body) = call(&router, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"users": []}));
}

#[tokio::test]
async fn test_update_replaces_membership_and_reports_message() {
    let router = create_test_router();

    for name in ["g1", "g2", "g3"] {
        call(&router, Method::POST, "/groups", Some(json!({"name": name}))).await;
    }
    call(
        &router,
        Method::POST,
        "/users",
        Some(json!({"name": "bob", "email": "bob@q.bio", "groups": [3, 1]})),
    )
    .await;

    let (status, body) = call(&router, Method::PUT, "/users/1", Some(json!({"groups": [2, 1]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User updated.");
    assert_eq!(body["user"]["groups"], json!([1, 2]));
    assert_eq!(body["user"]["email"], "bob@q.bio");

    let (_, body) = call(&router, Method::GET, "/groups/3", None).await;
    assert_eq!(body["group"]["users"], json!([]));

    let (status, body) = call(&router, Method::PUT, "/groups/2", Some(json!({"name": "ops"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Group updated.");
    assert_eq!(body["group"], json!({"id": 2, "name": "ops", "users": [1]}));
}

#[tokio::test]
async fn test_missing_entities_are_404() {
    let router = create_test_router();

    for (method, path) in [
        (Method::GET, "/users/5"),
        (Method::DELETE, "/users/5"),
        (Method::GET, "/users/abc"),
        (Method::GET, "/users/0"),
        (Method::GET, "/users/-1"),
        (Method::GET, "/users/9223372036854775808"),
    ] {
        let (status, body) = call(&router, method, path, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
        assert_eq!(body, json!({"message": "User could not be found."}));
    }

    let (status, body) = call(&router, Method::PUT, "/groups/5", Some(json!({"name": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Group could not be found.");
}

#[tokio::test]
async fn test_empty_bodies_are_400() {
    let router = create_test_router();
    call(&router, Method::POST, "/groups", Some(json!({"name": "eng"}))).await;

    for body in [json!({}), json!(null), json!([]), json!(""), json!(0), json!(false)] {
        let (status, resp) = call(&router, Method::POST, "/users", Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(resp, json!({"message": "No input data provided."}));
    }

    let (status, resp) = call(&router, Method::PUT, "/groups/1", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "No input data provided.");

    // No content type and no body at all
    let (status, _) = call(&router, Method::POST, "/groups", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_names_are_409() {
    let router = create_test_router();

    let user = json!({"name": "bob", "email": "bob@q.bio"});
    call(&router, Method::POST, "/users", Some(user.clone())).await;
    let (status, body) = call(&router, Method::POST, "/users", Some(user)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"message": "User exists."}));

    call(&router, Method::POST, "/groups", Some(json!({"name": "eng"}))).await;
    call(&router, Method::POST, "/groups", Some(json!({"name": "ops"}))).await;
    let (status, body) = call(&router, Method::PUT, "/groups/2", Some(json!({"name": "eng"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Group exists.");
}

#[tokio::test]
async fn test_validation_failures_are_422_with_field_errors() {
    let router = create_test_router();

    let (status, body) = call(&router, Method::POST, "/users", Some(json!({"name": "carol"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Validation failed.");
    assert_eq!(body["errors"], json!({"email": ["Data not provided."]}));

    let (status, body) = call(
        &router,
        Method::POST,
        "/users",
        Some(json!({"name": "carol", "email": "carol-at-example"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["email"], json!(["Not a valid email address."]));

    let (status, body) = call(
        &router,
        Method::POST,
        "/users",
        Some(json!({"name": "carol", "email": "carol@q.bio", "groups": [4, 8]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"],
        json!({"groups": ["Not all supplied groups exist: 4, 8"]})
    );

    let (status, body) = call(
        &router,
        Method::POST,
        "/groups",
        Some(json!({"name": "eng", "users": [3]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"], json!({"users": ["Not all supplied users exist: 3"]}));

    // Nothing was written by the rejected requests
    let (_, body) = call(&router, Method::GET, "/users", None).await;
    assert_eq!(body, json!({"users": []}));
    let (_, body) = call(&router, Method::GET, "/groups", None).await;
    assert_eq!(body, json!({"groups": []}));
}

#[tokio::test]
async fn test_wrongly_typed_fields_are_422() {
    let router = create_test_router();

    let (status, body) = call(
        &router,
        Method::POST,
        "/groups",
        Some(json!({"name": "eng", "users": "everyone"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid input data"));
}

#[tokio::test]
async fn test_routes_are_mounted_under_the_prefix_only() {
    let router = create_test_router();

    let response = router
        .oneshot(Request::builder().uri("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_array_bodies_are_422_and_create_nothing() {
    let router = create_test_router();
    call(&router, Method::POST, "/groups", Some(json!({"name": "eng"}))).await;

    let (status, body) = call(
        &router,
        Method::POST,
        "/users",
        Some(json!(["bob", "bob@q.bio", [1]])),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Invalid input data: Invalid input type.");

    let (status, _) = call(&router, Method::POST, "/groups", Some(json!(["ops", []]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(&router, Method::PUT, "/groups/1", Some(json!(["ops"]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = call(&router, Method::GET, "/users", None).await;
    assert_eq!(body, json!({"users": []}));
    let (_, body) = call(&router, Method::GET, "/groups", None).await;
    assert_eq!(body["groups"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_null_fields_in_updates_are_422() {
    let router = create_test_router();
    call(&router, Method::POST, "/groups", Some(json!({"name": "eng"}))).await;
    call(
        &router,
        Method::POST,
        "/users",
        Some(json!({"name": "bob", "email": "bob@q.bio", "groups": [1]})),
    )
    .await;

    let (status, body) = call(
        &router,
        Method::PUT,
        "/users/1",
        Some(json!({"name": null, "groups": null})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Validation failed.");
    assert_eq!(
        body["errors"],
        json!({"groups": ["Field may not be null."], "name": ["Field may not be null."]})
    );

    let (status, body) = call(&router, Method::PUT, "/groups/1", Some(json!({"users": null}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"], json!({"users": ["Field may not be null."]}));

    // Unknown ids still report 404 first
    let (status, _) = call(&router, Method::PUT, "/users/9", Some(json!({"name": null}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Nothing changed
    let (_, body) = call(&router, Method::GET, "/users/1", None).await;
    assert_eq!(body["user"]["name"], "bob");
    assert_eq!(body["user"]["groups"], json!([1]));
    let (_, body) = call(&router, Method::GET, "/groups/1", None).await;
    assert_eq!(body["group"]["users"], json!([1]));
}

#[tokio::test]
async fn test_unknown_references_are_reported_before_name_conflicts() {
    let router = create_test_router();
    call(
        &router,
        Method::POST,
        "/users",
        Some(json!({"name": "bob", "email": "bob@q.bio"})),
    )
    .await;

    let (status, body) = call(
        &router,
        Method::POST,
        "/users",
        Some(json!({"name": "bob", "email": "bob@q.bio", "groups": [9]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"], json!({"groups": ["Not all supplied groups exist: 9"]}));
}
