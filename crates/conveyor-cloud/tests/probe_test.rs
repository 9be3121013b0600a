use conveyor_cloud::probe::{ProbeError, verify_api};
use hello_api::GREETING;

/// Serve `app` on an ephemeral local port and return its base URL.
async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn deployed_api_passes_verification() {
    let url = serve(hello_api::router()).await;
    verify_api(&format!("{url}/"), GREETING).await.unwrap();
}

#[tokio::test]
async fn wrong_path_fails_with_status() {
    let url = serve(hello_api::router()).await;
    let err = verify_api(&format!("{url}/missing"), GREETING).await.unwrap_err();
    assert!(matches!(err, ProbeError::Status { status: 404, .. }));
}

#[tokio::test]
async fn unexpected_body_is_rejected() {
    let app = axum::Router::new().route("/", axum::routing::get(|| async { "Hello" }));
    let url = serve(app).await;
    let err = verify_api(&format!("{url}/"), GREETING).await.unwrap_err();
    assert!(matches!(err, ProbeError::UnexpectedBody { ref body, .. } if body == "Hello"));
}

#[tokio::test]
async fn unreachable_api_fails_with_request_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = verify_api(&format!("http://{addr}/"), GREETING).await.unwrap_err();
    assert!(matches!(err, ProbeError::Request { .. }));
}

#[tokio::test]
async fn expected_message_comes_from_the_caller() {
    let url = serve(hello_api::router()).await;
    let err = verify_api(&format!("{url}/"), "Goodbye").await.unwrap_err();
    assert!(matches!(err, ProbeError::UnexpectedBody { .. }));
}
