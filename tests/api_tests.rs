mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use tokio::sync::Notify;

use cinegraph::{
    api::{create_router, AppState},
    db::InMemoryStore,
    models::MediaKind,
    services::providers::Clients,
};

use common::{pipeline, record, FakeCatalog};

fn create_test_server(store: Arc<InMemoryStore>, clients: Clients) -> (TestServer, AppState) {
    let state = AppState::new(pipeline(store, clients, vec![]));
    let server = TestServer::new(create_router(state.clone())).unwrap();
    (server, state)
}

async fn wait_until_idle(state: &AppState) {
    for _ in 0..200 {
        if !state.update_job.is_running() && !state.similarity_job.is_running() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("background job did not finish");
}

#[tokio::test]
async fn test_health_check() {
    let (server, _) = create_test_server(Arc::new(InMemoryStore::new()), Clients::new());

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["update_running"], false);
}

#[tokio::test]
async fn test_update_rejects_overlapping_runs() {
    let store = Arc::new(InMemoryStore::new());
    let gate = Arc::new(Notify::new());
    let clients = Clients::new().with_catalog(Arc::new(FakeCatalog::gated(
        vec![
            record("0095016", MediaKind::Movie, &["action"]),
            record("0108778", MediaKind::Show, &["comedy"]),
        ],
        gate.clone(),
    )));
    let (server, state) = create_test_server(store.clone(), clients);

    let response = server.post("/tasks/update-database").await;
    response.assert_status(StatusCode::ACCEPTED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "Started update");
    assert!(body["run_id"].is_string());

    let response = server.post("/tasks/update-database").await;
    response.assert_status(StatusCode::CONFLICT);

    let health: serde_json::Value = server.get("/health").await.json();
    assert_eq!(health["update_running"], true);

    gate.notify_one();
    wait_until_idle(&state).await;

    assert_eq!(store.item_count().await, 2);
    server
        .post("/tasks/update-database")
        .await
        .assert_status(StatusCode::ACCEPTED);
    gate.notify_one();
    wait_until_idle(&state).await;
    assert_eq!(store.item_count().await, 2);
}

#[tokio::test]
async fn test_find_similarities_runs_in_background() {
    let store = Arc::new(InMemoryStore::new());
    let (server, state) = create_test_server(store.clone(), Clients::new());

    let response = server.post("/tasks/find-similarities").await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "Finding similarities");

    wait_until_idle(&state).await;
    assert!(store.similar_edges().await.is_empty());
}

#[tokio::test]
async fn test_jobs_of_different_kinds_may_overlap() {
    let gate = Arc::new(Notify::new());
    let clients = Clients::new().with_catalog(Arc::new(FakeCatalog::gated(
        vec![record("0133093", MediaKind::Movie, &[])],
        gate.clone(),
    )));
    let (server, state) = create_test_server(Arc::new(InMemoryStore::new()), clients);

    server
        .post("/tasks/update-database")
        .await
        .assert_status(StatusCode::ACCEPTED);
    server
        .post("/tasks/find-similarities")
        .await
        .assert_status(StatusCode::ACCEPTED);

    gate.notify_one();
    wait_until_idle(&state).await;
}
