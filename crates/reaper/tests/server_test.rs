use axum::http::StatusCode;
use job_reaper::{metrics, server};

#[tokio::test]
async fn test_server_endpoints() {
    metrics::register_metrics();
    metrics::REAPED_JOBS_TOTAL.inc();

    let app = server::build_router();
    let client = axum_test::TestServer::new(app).unwrap();

    // Test health endpoint
    let response = client.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");

    // Test metrics exposition
    let response = client.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains("jobreaper_reaped_jobs_total"));
}
