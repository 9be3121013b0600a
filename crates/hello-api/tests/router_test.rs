use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use hello_api::{Message, router};
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn call(method: Method, uri: &str) -> axum::response::Response {
    router()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn root_returns_greeting() {
    let response = call(Method::GET, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], br#"{"message":"Hello, World!"}"#);
}

#[tokio::test]
async fn greeting_is_the_same_every_time() {
    for _ in 0..3 {
        let response = call(Method::GET, "/").await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let message: Message = serde_json::from_slice(&body).unwrap();
        assert_eq!(message.message, "Hello, World!");
    }
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let response = call(Method::GET, "/users").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let response = call(method.clone(), "/").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
    }
}
