//! Integration tests for building a [`ServiceClient`] from configuration.
//!
//! These go through the public API only: a [`VergeClientConfig`] loaded from
//! a variable lookup, the client it produces, and requests made through the
//! [`Transport`] trait against a mock VergeOS API.

use anyhow::Result;
use serde_json::json;
use std::collections::HashMap;
use verge_core::{ApiRequest, Error, ServiceClient, Transport, VergeClientConfig};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_from(vars: &[(&str, &str)]) -> verge_core::Result<VergeClientConfig> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    VergeClientConfig::from_lookup(|key: &str| vars.get(key).cloned())
}

#[tokio::test]
async fn test_basic_auth_client_from_environment() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/volumes"))
        .and(query_param("fields", "name,$key"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"$key": "8f73f8bcc9c9f1aaba32f733bfc295acaf548554", "name": "Projects"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let config = config_from(&[
        ("VERGE_HOST", uri.as_str()),
        ("VERGE_USERNAME", "admin"),
        ("VERGE_PASSWORD", "secret"),
        ("VERGE_RETRY_TOTAL", "0"),
    ])?;
    let client = ServiceClient::from_config(&config)?;
    assert_eq!(client.base_url().path(), "/api/v4/");

    let volumes = client
        .request(ApiRequest::get("volumes").with_query("fields", "name,$key"))
        .await?;
    assert_eq!(volumes.unwrap()[0]["name"], "Projects");
    Ok(())
}

#[tokio::test]
async fn test_token_client_maps_error_status() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v4/volume_browser/missing"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"err": "Job not found"})),
        )
        .mount(&server)
        .await;

    let config = VergeClientConfig::with_token_auth(server.uri(), "tok")?;
    let client = ServiceClient::from_config(&config)?;

    let err = client
        .request(ApiRequest::get("volume_browser/missing"))
        .await
        .unwrap_err();
    assert_eq!(err, Error::NotFound("Job not found".into()));
    assert!(!err.is_transient());
    Ok(())
}

#[test]
fn test_missing_credentials_are_rejected() {
    let err = config_from(&[("VERGE_HOST", "verge.example.com")]).unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}
