//! Canvas, folder, graph and settings endpoints through the full router

mod common;

use axum::http::{Method, StatusCode};
use common::create_test_env;
use serde_json::{json, Value};

fn sample_graph() -> Value {
    json!({
        "nodes": [
            {"id": "a", "type": "text", "position": {"x": 0.0, "y": 0.0}, "data": {"label": "Idea"}},
            {"id": "b", "type": "synapse", "position": {"x": 240.0, "y": 80.0}, "data": {"label": "Link"}}
        ],
        "edges": [
            {"id": "e1", "source": "a", "target": "b", "sourceHandle": "right", "targetHandle": "left"}
        ]
    })
}

async fn create_canvas(env: &common::TestEnv, token: &str, name: &str) -> anyhow::Result<String> {
    let response = env
        .send(
            Method::POST,
            "/api/canvases",
            Some(token),
            Some(json!({"name": name})),
        )
        .await?;
    assert_eq!(response.status, StatusCode::CREATED);
    Ok(response.json["canvas"]["id"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let env = create_test_env().await?;

    let response = env.send(Method::GET, "/api/health", None, None).await?;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_create_canvas_redirects_to_new_canvas() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;

    let response = env
        .send(
            Method::POST,
            "/api/canvases",
            Some(&token),
            Some(json!({"name": "  Roadmap  ", "description": "Q3 planning"})),
        )
        .await?;

    assert_eq!(response.status, StatusCode::CREATED);
    let id = response.json["canvas"]["id"].as_str().unwrap();
    assert_eq!(response.json["canvas"]["name"], "Roadmap");
    assert_eq!(response.json["canvas"]["userId"], "u1");
    assert_eq!(response.json["redirectTo"], format!("/canvas/{}", id));
    assert_eq!(response.location.as_deref(), Some(format!("/canvas/{}", id).as_str()));

    let listed = env.send(Method::GET, "/api/canvases", Some(&token), None).await?;
    assert_eq!(listed.json.as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_create_canvas_requires_name_and_session() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;

    let response = env
        .send(Method::POST, "/api/canvases", Some(&token), Some(json!({"name": "   "})))
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = env
        .send(Method::POST, "/api/canvases", None, Some(json!({"name": "Roadmap"})))
        .await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let listed = env.send(Method::GET, "/api/canvases", Some(&token), None).await?;
    assert_eq!(listed.json, json!([]));
    Ok(())
}

#[tokio::test]
async fn test_create_canvas_in_foreign_folder_rejected() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let owner = env.login("owner").await?;
    let other = env.login("other").await?;

    let folder = env
        .send(Method::POST, "/api/folders", Some(&owner), Some(json!({"name": "Work"})))
        .await?;
    assert_eq!(folder.status, StatusCode::CREATED);
    let folder_id = folder.json["id"].as_str().unwrap();

    let response = env
        .send(
            Method::POST,
            "/api/canvases",
            Some(&other),
            Some(json!({"name": "Sneaky", "folderId": folder_id})),
        )
        .await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_folders_are_listed_by_name() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;
    let other = env.login("u2").await?;

    for name in ["Research", "Archive", "Personal"] {
        env.send(Method::POST, "/api/folders", Some(&token), Some(json!({"name": name})))
            .await?;
    }
    env.send(Method::POST, "/api/folders", Some(&other), Some(json!({"name": "Elsewhere"})))
        .await?;

    let response = env.send(Method::GET, "/api/folders", Some(&token), None).await?;

    assert_eq!(response.status, StatusCode::OK);
    let names: Vec<&str> = response
        .json
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Archive", "Personal", "Research"]);
    Ok(())
}

#[tokio::test]
async fn test_graph_round_trip_keeps_handles() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;
    let canvas_id = create_canvas(&env, &token, "Graph").await?;
    let uri = format!("/api/canvases/{}/graph", canvas_id);

    let saved = env
        .send(Method::PUT, &uri, Some(&token), Some(sample_graph()))
        .await?;
    assert_eq!(saved.status, StatusCode::OK);
    assert_eq!(saved.json["nodesWritten"], 2);
    assert_eq!(saved.json["edgesWritten"], 1);

    let loaded = env.send(Method::GET, &uri, Some(&token), None).await?;
    assert_eq!(loaded.status, StatusCode::OK);
    let edge = &loaded.json["edges"][0];
    assert_eq!(edge["sourceHandle"], "right");
    assert_eq!(edge["targetHandle"], "left");
    assert_eq!(loaded.json["nodes"][1]["type"], "synapse");
    Ok(())
}

#[tokio::test]
async fn test_same_editor_ids_on_two_canvases() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let alice = env.login("alice").await?;
    let bob = env.login("bob").await?;
    let first = create_canvas(&env, &alice, "Alice's map").await?;
    let second = create_canvas(&env, &bob, "Bob's map").await?;

    for (token, canvas_id) in [(&alice, &first), (&bob, &second)] {
        let uri = format!("/api/canvases/{}/graph", canvas_id);
        let saved = env
            .send(Method::PUT, &uri, Some(token), Some(sample_graph()))
            .await?;
        assert_eq!(saved.status, StatusCode::OK);
    }

    for (token, canvas_id) in [(&alice, &first), (&bob, &second)] {
        let uri = format!("/api/canvases/{}/graph", canvas_id);
        let loaded = env.send(Method::GET, &uri, Some(token), None).await?;
        assert_eq!(loaded.json["nodes"].as_array().unwrap().len(), 2, "{}", canvas_id);
        assert_eq!(loaded.json["edges"].as_array().unwrap().len(), 1, "{}", canvas_id);
    }

    // Deleting on one canvas leaves the twin edge on the other alone
    let deleted = env
        .send(
            Method::DELETE,
            &format!("/api/canvases/{}/edges/e1", first),
            Some(&alice),
            None,
        )
        .await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let uri = format!("/api/canvases/{}/graph", second);
    let loaded = env.send(Method::GET, &uri, Some(&bob), None).await?;
    assert_eq!(loaded.json["edges"][0]["id"], "e1");
    Ok(())
}

#[tokio::test]
async fn test_dangling_edge_rejected()-> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;
    let canvas_id = create_canvas(&env, &token, "Graph").await?;
    let uri = format!("/api/canvases/{}/graph", canvas_id);

    let mut graph = sample_graph();
    graph["edges"][0]["target"] = json!("ghost");

    let response = env.send(Method::PUT, &uri, Some(&token), Some(graph)).await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let loaded = env.send(Method::GET, &uri, Some(&token), None).await?;
    assert_eq!(loaded.json["nodes"], json!([]));
    Ok(())
}

#[tokio::test]
async fn test_unknown_node_type_rejected() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;
    let canvas_id = create_canvas(&env, &token, "Graph").await?;
    let uri = format!("/api/canvases/{}/graph", canvas_id);

    let mut graph = sample_graph();
    graph["nodes"][0]["type"] = json!("widget");

    let response = env.send(Method::PUT, &uri, Some(&token), Some(graph)).await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error().contains("widget"));
    Ok(())
}

#[tokio::test]
async fn test_deleted_edge_does_not_come_back() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;
    let canvas_id = create_canvas(&env, &token, "Graph").await?;
    let uri = format!("/api/canvases/{}/graph", canvas_id);

    env.send(Method::PUT, &uri, Some(&token), Some(sample_graph()))
        .await?;

    let deleted = env
        .send(
            Method::DELETE,
            &format!("/api/canvases/{}/edges/e1", canvas_id),
            Some(&token),
            None,
        )
        .await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    // A stale client still holding the edge saves its old graph
    let stale = env
        .send(Method::PUT, &uri, Some(&token), Some(sample_graph()))
        .await?;
    assert_eq!(stale.status, StatusCode::OK);
    assert_eq!(stale.json["edgesSkipped"], 1);

    let loaded = env.send(Method::GET, &uri, Some(&token), None).await?;
    assert_eq!(loaded.json["edges"], json!([]));
    assert_eq!(loaded.json["nodes"].as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_edge_can_be_reconnected_after_deletion() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;
    let canvas_id = create_canvas(&env, &token, "Graph").await?;
    let uri = format!("/api/canvases/{}/graph", canvas_id);

    env.send(Method::PUT, &uri, Some(&token), Some(sample_graph()))
        .await?;
    env.send(
        Method::DELETE,
        &format!("/api/canvases/{}/edges/e1", canvas_id),
        Some(&token),
        None,
    )
    .await?;

    // The editor saves its graph without the edge
    let mut without_edge = sample_graph();
    without_edge["edges"] = json!([]);
    env.send(Method::PUT, &uri, Some(&token), Some(without_edge))
        .await?;

    // Reconnecting the same handles produces the same edge id again
    let reconnected = env
        .send(Method::PUT, &uri, Some(&token), Some(sample_graph()))
        .await?;
    assert_eq!(reconnected.json["edgesWritten"], 1);
    assert_eq!(reconnected.json["edgesSkipped"], 0);

    let loaded = env.send(Method::GET, &uri, Some(&token), None).await?;
    assert_eq!(loaded.json["edges"][0]["id"], "e1");
    Ok(())
}

#[tokio::test]
async fn test_graph_of_foreign_canvas_not_found() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let owner = env.login("owner").await?;
    let intruder = env.login("intruder").await?;
    let canvas_id = create_canvas(&env, &owner, "Private").await?;
    let uri = format!("/api/canvases/{}/graph", canvas_id);

    let read = env.send(Method::GET, &uri, Some(&intruder), None).await?;
    assert_eq!(read.status, StatusCode::NOT_FOUND);

    let write = env
        .send(Method::PUT, &uri, Some(&intruder), Some(sample_graph()))
        .await?;
    assert_eq!(write.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_settings_store_and_clear_key() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;

    let status = env.send(Method::GET, "/api/settings", Some(&token), None).await?;
    assert_eq!(status.json["hasApiKey"], false);

    let stored = env
        .send(
            Method::PUT,
            "/api/settings",
            Some(&token),
            Some(json!({"openaiApiKey": "sk-live"})),
        )
        .await?;
    assert_eq!(stored.status, StatusCode::OK);
    assert_eq!(stored.json["hasApiKey"], true);
    assert!(!stored.text.contains("sk-live"));

    let cleared = env
        .send(
            Method::PUT,
            "/api/settings",
            Some(&token),
            Some(json!({"openaiApiKey": "  "})),
        )
        .await?;
    assert_eq!(cleared.json["hasApiKey"], false);
    Ok(())
}

#[tokio::test]
async fn test_logout_ends_session() -> anyhow::Result<()> {
    let env = create_test_env().await?;
    let token = env.login("u1").await?;

    let response = env
        .send(Method::POST, "/api/auth/logout", Some(&token), None)
        .await?;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let after = env.send(Method::GET, "/api/canvases", Some(&token), None).await?;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
