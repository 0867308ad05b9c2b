//! Integration tests for `BackendClient` using wiremock HTTP mocks.

use std::path::PathBuf;

use routewiz_client::{BackendClient, ClientError, JobHandle, JobKind};
use routewiz_core::{index_upload, Confidence, RawAddress};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> BackendClient {
    BackendClient::new(base_url, 30, "routewiz-test/0.1")
        .expect("client construction should not fail")
}

fn raw(address: &str) -> RawAddress {
    serde_json::from_value(serde_json::json!({
        "builder_name": "Acme Homes",
        "problem_type": "Leak",
        "address": address
    }))
    .expect("valid raw address")
}

fn temp_spreadsheet(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("routewiz-{}-{name}", std::process::id()));
    std::fs::write(&path, b"PK\x03\x04 not really a workbook").expect("write temp file");
    path
}

#[tokio::test]
async fn validate_user_returns_drivers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/validate-user"))
        .and(body_partial_json(serde_json::json!({ "username": "dispatch@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "user": {
                "member_email": "dispatch@example.com",
                "member_first_name": "Dana",
                "member_last_name": "Reyes"
            },
            "sub_drivers": [
                { "member_email": "tech1@example.com", "member_first_name": "Lee", "member_last_name": "Park", "job_types": ["Leak"] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let response = client
        .validate_user("dispatch@example.com")
        .await
        .expect("should validate user");

    let user = response.user.expect("user present");
    assert_eq!(user.display_name(), "Dana Reyes");
    assert_eq!(response.sub_drivers.len(), 1);
    assert_eq!(response.sub_drivers[0].member_email, "tech1@example.com");
    assert!(response.sub_drivers[0].extra.contains_key("job_types"));
}

#[tokio::test]
async fn api_error_message_comes_from_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/validate-user"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "success": false, "error": "User not found" })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.validate_user("nobody@example.com").await;

    match result {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "User not found");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn start_job_without_job_id_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/validate-addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": true })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let records = index_upload(vec![raw("1 Elm St")]);
    let result = client.validate_addresses("dispatch@example.com", &records).await;

    assert!(
        matches!(result, Err(ClientError::Rejected(ref m)) if m == "address validation failed to start"),
        "expected Rejected, got: {result:?}"
    );
}

#[tokio::test]
async fn validate_addresses_sends_original_index() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/validate-addresses"))
        .and(body_partial_json(serde_json::json!({
            "username": "dispatch@example.com",
            "addresses": [
                { "address": "1 Elm St", "originalIndex": 0 },
                { "address": "2 Oak Ave", "originalIndex": 1 }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "success": true, "job_id": "val-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let records = index_upload(vec![raw("1 Elm St"), raw("2 Oak Ave")]);
    let job = client
        .validate_addresses("dispatch@example.com", &records)
        .await
        .expect("job should start");

    assert_eq!(job, JobHandle::new("val-1", JobKind::Validation));
}

#[tokio::test]
async fn job_status_404_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/route-status/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({ "error": "Job not found" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client
        .job_status(&JobHandle::new("gone", JobKind::RouteCreation))
        .await;

    assert!(
        matches!(result, Err(ClientError::NotFound { .. })),
        "expected NotFound, got: {result:?}"
    );
}

#[tokio::test]
async fn job_status_decodes_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/validation-status/val-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "processing",
            "progress": 55,
            "message": "Geocoding 11 of 20"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let body = client
        .job_status(&JobHandle::new("val-7", JobKind::RetryGeocoding))
        .await
        .expect("status should decode");

    assert_eq!(body.status, "processing");
    assert_eq!(body.progress_percent(), 55);
    assert_eq!(body.message.as_deref(), Some("Geocoding 11 of 20"));
    assert!(body.result.is_none());
}

#[tokio::test]
async fn malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/validation-status/val-8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client
        .job_status(&JobHandle::new("val-8", JobKind::Validation))
        .await;

    match result {
        Err(ClientError::Deserialize { context, .. }) => {
            assert_eq!(context, "/validation-status/val-8");
        }
        other => panic!("expected Deserialize error, got: {other:?}"),
    }
}

#[tokio::test]
async fn upload_rejects_non_excel_without_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload-addresses"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client
        .upload_addresses(std::path::Path::new("addresses.csv"))
        .await;

    assert!(
        matches!(result, Err(ClientError::UnsupportedFile(_))),
        "expected UnsupportedFile, got: {result:?}"
    );
}

#[tokio::test]
async fn upload_returns_parsed_rows() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload-addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "count": 2,
            "addresses": [
                { "builder_name": "Acme Homes", "problem_type": "Leak", "address": "1 Elm St" },
                { "builder_name": "Acme Homes", "problem_type": "Roof", "address": "2 Oak Ave", "unit": "B" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = temp_spreadsheet("upload.xlsx");
    let client = test_client(&server.uri());
    let response = client.upload_addresses(&file).await;
    std::fs::remove_file(&file).ok();

    let response = response.expect("upload should succeed");
    assert_eq!(response.count, 2);
    assert_eq!(response.addresses.len(), 2);
    assert_eq!(response.addresses[1].confidence, Confidence::Unknown);
    assert_eq!(
        response.addresses[1].extra.get("unit"),
        Some(&serde_json::json!("B"))
    );
}

#[tokio::test]
async fn upload_success_false_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload-addresses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": false })))
        .mount(&server)
        .await;

    let file = temp_spreadsheet("rejected.xls");
    let client = test_client(&server.uri());
    let result = client.upload_addresses(&file).await;
    std::fs::remove_file(&file).ok();

    assert!(
        matches!(result, Err(ClientError::Rejected(_))),
        "expected Rejected, got: {result:?}"
    );
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/validate-driver-assignments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "fully_covered": false,
            "uncovered_types": ["Roof"],
            "coverage": {
                "Leak": { "count": 1, "addresses_count": 3 },
                "Roof": { "count": 0, "addresses_count": 1 }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&format!("{}/api/", server.uri()));
    let records = index_upload(vec![raw("1 Elm St")]);
    let report = client
        .validate_driver_assignments(&["tech1@example.com".to_owned()], &records)
        .await
        .expect("coverage should decode");

    assert!(!report.fully_covered);
    assert_eq!(report.uncovered_types, vec!["Roof".to_owned()]);
    assert_eq!(report.coverage["Leak"].addresses_count, 3);
}
