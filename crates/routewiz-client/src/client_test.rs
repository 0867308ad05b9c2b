use super::*;

fn test_client(base_url: &str) -> BackendClient {
    BackendClient::new(base_url, 30, "routewiz-test/0.1").expect("client construction should not fail")
}

#[test]
fn endpoint_appends_to_base_path() {
    let client = test_client("https://backend.example.com/api");
    assert_eq!(
        client.endpoint(&["validate-addresses"]).as_str(),
        "https://backend.example.com/api/validate-addresses"
    );
}

#[test]
fn endpoint_strips_trailing_slash() {
    let client = test_client("https://backend.example.com/api/");
    assert_eq!(
        client.endpoint(&["validation-status", "abc"]).as_str(),
        "https://backend.example.com/api/validation-status/abc"
    );
}

#[test]
fn endpoint_on_bare_host() {
    let client = test_client("http://127.0.0.1:8080");
    assert_eq!(
        client.endpoint(&["route-status", "r-1"]).as_str(),
        "http://127.0.0.1:8080/route-status/r-1"
    );
}

#[test]
fn endpoint_encodes_job_id() {
    let client = test_client("https://backend.example.com/api");
    let url = client.endpoint(&["validation-status", "a/b c"]);
    assert_eq!(
        url.as_str(),
        "https://backend.example.com/api/validation-status/a%2Fb%20c"
    );
}

#[test]
fn new_rejects_non_http_url() {
    let result = BackendClient::new("mailto:ops@example.com", 30, "ua");
    assert!(matches!(result, Err(ClientError::InvalidBaseUrl { .. })));

    let result = BackendClient::new("not a url", 30, "ua");
    assert!(matches!(result, Err(ClientError::InvalidBaseUrl { .. })));
}

#[test]
fn spreadsheet_mime_accepts_excel_only() {
    assert_eq!(spreadsheet_mime("jobs.XLSX"), Some(XLSX_MIME));
    assert_eq!(spreadsheet_mime("jobs.xls"), Some(XLS_MIME));
    assert_eq!(spreadsheet_mime("jobs.csv"), None);
    assert_eq!(spreadsheet_mime(""), None);
}
