//! Integration tests for health, listing and form endpoints.

mod helpers;

use axum::http::StatusCode;

use helpers::TestApp;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let response = app.get("/api/health").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_detailed_health_reports_metrics_and_tools() {
    let app = TestApp::new();

    let converted = app
        .convert(Some("text_uppercase"), &[("a.txt", b"a"), ("b.md", b"b")])
        .await;
    assert_eq!(converted.status, StatusCode::OK);

    let response = app.get("/api/health/detailed").await;
    assert_eq!(response.status, StatusCode::OK);

    let data = &response.json()["data"];
    assert_eq!(data["failure_policy"], "isolate");
    assert_eq!(data["conversion_types"], 10);
    assert_eq!(data["tools"][0]["name"], "ffmpeg");
    assert_eq!(data["metrics"]["batches"], 1);
    assert_eq!(data["metrics"]["conversions_succeeded"], 1);
    assert_eq!(data["metrics"]["extension_rejections"], 1);
    assert_eq!(data["metrics"]["archives_built"], 1);

    let ffmpeg_available = data["tools"][0]["available"].as_bool().expect("bool");
    let expected = if ffmpeg_available { "ok" } else { "degraded" };
    assert_eq!(data["status"], expected);
}

#[tokio::test]
async fn test_conversions_listing() {
    let app = TestApp::with_config(|config| {
        config.conversion.disabled_types = vec!["mp4_to_avi".to_string()];
    });

    let response = app.get("/api/conversions").await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    let conversions = body["data"]["conversions"].as_array().expect("array");
    assert_eq!(conversions.len(), 9);
    assert!(conversions.iter().all(|c| c["id"] != "mp4_to_avi"));

    let text = conversions
        .iter()
        .find(|c| c["id"] == "text_uppercase")
        .expect("text_uppercase listed");
    assert_eq!(text["accepted_extensions"], serde_json::json!(["txt"]));
    assert_eq!(text["output_extension"], "txt");
}

#[tokio::test]
async fn test_upload_form() {
    let app = TestApp::new();

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response
            .header("content-type")
            .is_some_and(|ct| ct.starts_with("text/html"))
    );
    let page = response.text();
    assert!(page.contains("enctype=\"multipart/form-data\""));
    assert!(page.contains("<option value=\"excel_to_csv\">"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();
    let response = app.get("/api/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
