mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn level<'a>(body: &'a Value, name: &str) -> Option<&'a Value> {
    body["data"]["levels"]
        .as_array()?
        .iter()
        .find(|l| l["level"] == name)
}

#[tokio::test]
async fn options_follow_the_selection() -> Result<()> {
    let server = common::spawn_server().await?;
    let org = server.node("organizations", "Acme Energy", None).await?;
    server.node("entities", "Acme Noord", Some(&org)).await?;
    server.node("entities", "Acme Zuid", Some(&org)).await?;

    let (status, body) = server.get("/api/hierarchy/options").await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["levels"].as_array().map(Vec::len), Some(1), "{}", body);

    let (status, body) = server.get(&format!("/api/hierarchy/options?organization_id={}", org)).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let entities = level(&body, "entity").expect("entity level present");
    assert_eq!(entities["nodes"].as_array().map(Vec::len), Some(2), "{}", body);
    assert!(level(&body, "category").is_none(), "category needs an entity: {}", body);

    Ok(())
}

#[tokio::test]
async fn select_clears_lower_levels() -> Result<()> {
    let server = common::spawn_server().await?;
    let ids = server.chain().await?;
    let other = server.node("entities", "Second entity", Some(&ids[0])).await?;

    let selection = json!({
        "organization_id": ids[0],
        "entity_id": ids[1],
        "category_id": ids[2],
        "project_id": ids[3],
    });
    let (status, body) = server
        .post(
            "/api/hierarchy/select",
            json!({ "selection": selection, "level": "entity", "id": other }),
        )
        .await?;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["selection"]["entity_id"], json!(other));
    assert!(body["data"]["selection"]["category_id"].is_null(), "{}", body);
    assert!(body["data"]["selection"]["project_id"].is_null(), "{}", body);
    assert_eq!(body["data"]["cleared"], json!(["category", "project"]));
    assert_eq!(body["data"]["deepest"], json!("entity"));

    Ok(())
}

#[tokio::test]
async fn selections_with_gaps_are_rejected() -> Result<()> {
    let server = common::spawn_server().await?;
    let ids = server.chain().await?;

    let (status, body) = server
        .get(&format!("/api/hierarchy/options?organization_id={}&project_id={}", ids[0], ids[3]))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["code"], json!("BAD_REQUEST"));
    assert!(body["message"].as_str().unwrap_or_default().contains("project"), "{}", body);

    let selection = json!({ "organization_id": ids[0], "category_id": ids[2] });
    let (status, body) = server
        .post(
            "/api/hierarchy/select",
            json!({ "selection": selection, "level": "complex", "id": ids[4] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    Ok(())
}

#[tokio::test]
async fn children_require_a_parent() -> Result<()> {
    let server = common::spawn_server().await?;

    let (status, body) = server.get("/api/hierarchy/projects").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
    assert_eq!(body["error"], json!(true));

    let (status, body) = server.get("/api/hierarchy/buildings").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    Ok(())
}

#[tokio::test]
async fn create_validates_the_parent() -> Result<()> {
    let server = common::spawn_server().await?;

    let (status, body) = server.post("/api/hierarchy/entities", json!({ "name": "Orphan" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    let missing = uuid::Uuid::new_v4();
    let (status, body) = server
        .post("/api/hierarchy/entities", json!({ "name": "Lost", "parent_id": missing }))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{}", body);

    Ok(())
}

#[tokio::test]
async fn ancestry_walks_up_to_the_organization() -> Result<()> {
    let server = common::spawn_server().await?;
    let ids = server.chain().await?;

    let (status, body) = server.get(&format!("/api/hierarchy/objects/{}/ancestry", ids[5])).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let entries = body["data"]["entries"].as_array().cloned().unwrap_or_default();
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0]["level"], json!("organization"));
    assert_eq!(entries[0]["node"]["id"], json!(ids[0]));
    assert_eq!(entries[5]["node"]["id"], json!(ids[5]));

    Ok(())
}

#[tokio::test]
async fn delete_restricts_unless_cascading() -> Result<()> {
    let server = common::spawn_server().await?;
    let ids = server.chain().await?;
    let (status, created) = server
        .post(
            "/api/connections",
            json!({
                "address": "Keizersgracht 10",
                "city": "Amsterdam",
                "postal_code": "1015 CN",
                "connection_type": "electricity",
                "object_id": ids[5],
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    let connection = created["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, body) = server.delete(&format!("/api/hierarchy/categories/{}", ids[2])).await?;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (status, body) = server
        .delete(&format!("/api/hierarchy/categories/{}?policy=cascade", ids[2]))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["deleted_nodes"], json!(4));

    let (status, _) = server.get(&format!("/api/hierarchy/objects/{}", ids[5])).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = server.get(&format!("/api/hierarchy/entities/{}", ids[1])).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.get(&format!("/api/connections/{}", connection)).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["data"]["object_id"].is_null(), "{}", body);
    assert!(body["data"]["project_id"].is_null(), "{}", body);
    assert_eq!(body["data"]["entity_id"], json!(ids[1]));
    assert_eq!(body["data"]["organization_id"], json!(ids[0]));

    Ok(())
}
