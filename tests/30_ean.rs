mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{KNOWN_EAN, UNKNOWN_EAN};

#[tokio::test]
async fn check_reports_validity_and_lookup_eligibility() -> Result<()> {
    let server = common::spawn_server().await?;

    let (status, body) = server.get(&format!("/api/ean/{}", KNOWN_EAN)).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["valid"], json!(true));
    assert_eq!(body["data"]["auto_lookup"], json!(true));

    let (_, body) = server.get("/api/ean/541234567890123456").await?;
    assert_eq!(body["data"]["valid"], json!(true));
    assert_eq!(body["data"]["auto_lookup"], json!(false));

    let (status, body) = server.get("/api/ean/87123").await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["valid"], json!(false));
    assert!(body["data"]["message"].is_string(), "{}", body);

    Ok(())
}

#[tokio::test]
async fn lookup_returns_connection_details() -> Result<()> {
    let server = common::spawn_server().await?;

    let (status, body) = server.get(&format!("/api/ean/{}/lookup", KNOWN_EAN)).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["city"], json!("Utrecht"));
    assert_eq!(body["data"]["grid_operator"], json!("Stedin"));

    Ok(())
}

#[tokio::test]
async fn lookup_errors_map_to_statuses() -> Result<()> {
    let server = common::spawn_server().await?;

    let (status, body) = server.get("/api/ean/12ab/lookup").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let (status, body) = server.get("/api/ean/541234567890123456/lookup").await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);

    let (status, body) = server.get(&format!("/api/ean/{}/lookup", UNKNOWN_EAN)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);
    assert_eq!(body["error"], json!(true));

    Ok(())
}
