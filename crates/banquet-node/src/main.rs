//! # Banquet Node
//!
//! HTTP surface over the booking orchestration core. Handlers are thin
//! adapters: each request becomes one load-mutate-save cycle against the
//! process store, serialized by the store-wide turn lock.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use banquet_core::{Room, RoomCatalog, SeatingLayout};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod state;

use state::AppState;

/// Run the Banquet node server.
pub async fn run_server(addr: SocketAddr, catalog: RoomCatalog) -> anyhow::Result<()> {
    info!(rooms = catalog.rooms().len(), "banquet node starting");

    let state = AppState::new(catalog);
    let app = create_router(state);

    info!("listening on http://{}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Process API
        .route("/api/v1/process", post(api::process::open))
        .route("/api/v1/process/:id/turn", post(api::process::turn))
        .route("/api/v1/process/:id", get(api::process::get))
        .route("/api/v1/process/:id/audit", get(api::process::audit))
        // Approval API
        .route("/api/v1/approval/:id/decision", post(api::approval::decide))
        .route("/api/v1/approvals", get(api::approval::list))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Load the room catalog from `BANQUET_CATALOG` (a JSON file), falling back
/// to the built-in demo inventory.
fn load_catalog() -> anyhow::Result<RoomCatalog> {
    if let Ok(path) = std::env::var("BANQUET_CATALOG") {
        let raw = std::fs::read_to_string(&path)?;
        let catalog: RoomCatalog = serde_json::from_str(&raw)?;
        info!(%path, rooms = catalog.rooms().len(), "room catalog loaded");
        return Ok(catalog);
    }
    Ok(demo_catalog())
}

fn demo_catalog() -> RoomCatalog {
    let room = |name: &str, caps: &[(SeatingLayout, u32)], features: &[&str]| {
        let capacities: BTreeMap<SeatingLayout, u32> = caps.iter().copied().collect();
        Room::new(name, capacities, features.iter().copied())
    };

    RoomCatalog::new(vec![
        room(
            "Salon A",
            &[(SeatingLayout::Banquet, 40), (SeatingLayout::Theater, 60)],
            &["projector"],
        ),
        room(
            "Salon B",
            &[(SeatingLayout::Banquet, 25), (SeatingLayout::Boardroom, 16)],
            &["projector", "whiteboard"],
        ),
        room(
            "Grand Hall",
            &[(SeatingLayout::Banquet, 150), (SeatingLayout::Theater, 220)],
            &["stage", "projector"],
        ),
        room(
            "Salon E",
            &[(SeatingLayout::Banquet, 200), (SeatingLayout::Reception, 300)],
            &["stage", "terrace_access"],
        ),
    ])
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("BANQUET_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let catalog = load_catalog()?;

    run_server(addr, catalog).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    fn server() -> TestServer {
        let state = AppState::new(demo_catalog());
        TestServer::new(create_router(state)).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = server();
        let res = server.get("/health").await;
        res.assert_status_ok();
        let body: serde_json::Value = res.json();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_open_and_drive_a_negotiation() {
        let server = server();

        let res = server.post("/api/v1/process").await;
        res.assert_status(StatusCode::CREATED);
        let body: serde_json::Value = res.json();
        let id = body["id"].as_str().unwrap().to_string();
        assert_eq!(body["current_step"], 1);

        // First turn supplies a date; the engine asks for confirmation.
        let res = server
            .post(&format!("/api/v1/process/{id}/turn"))
            .json(&json!({ "event_date": "2026-06-12" }))
            .await;
        res.assert_status_ok();
        let body: serde_json::Value = res.json();
        assert_eq!(body["signal"]["type"], "need_date_confirmation");
        assert_eq!(body["current_step"], "date_negotiation");

        // Confirming moves the flow into room selection.
        let res = server
            .post(&format!("/api/v1/process/{id}/turn"))
            .json(&json!({ "confirms_date": true }))
            .await;
        res.assert_status_ok();
        let body: serde_json::Value = res.json();
        assert_eq!(body["signal"]["type"], "need_headcount");

        // A headcount yields a room proposal parked at the approval gate.
        let res = server
            .post(&format!("/api/v1/process/{id}/turn"))
            .json(&json!({ "requirements": { "headcount": 30, "layout": "banquet" } }))
            .await;
        res.assert_status_ok();
        let body: serde_json::Value = res.json();
        assert_eq!(body["signal"]["type"], "room_proposal_pending");
        let request_id = body["signal"]["request_id"].as_str().unwrap().to_string();

        let res = server.get("/api/v1/approvals").await;
        res.assert_status_ok();
        let approvals: serde_json::Value = res.json();
        assert_eq!(approvals[0]["id"], request_id.as_str());

        // Approving the proposal carries the process to offer negotiation.
        let res = server
            .post(&format!("/api/v1/approval/{request_id}/decision"))
            .json(&json!({ "approved": true }))
            .await;
        res.assert_status_ok();
        let body: serde_json::Value = res.json();
        assert_eq!(body["signal"]["type"], "awaiting_offer_reply");

        let res = server.get(&format!("/api/v1/process/{id}")).await;
        res.assert_status_ok();
        let body: serde_json::Value = res.json();
        assert_eq!(body["current_step"], 5);
        assert_eq!(body["locked_room_id"], "Salon A");

        let res = server.get(&format!("/api/v1/process/{id}/audit")).await;
        res.assert_status_ok();
        let body: serde_json::Value = res.json();
        assert!(body["entries"].as_array().unwrap().len() > 1);
    }

    #[tokio::test]
    async fn test_unknown_process_is_not_found() {
        let server = server();
        let res = server
            .get(&format!("/api/v1/process/{}", uuid::Uuid::new_v4()))
            .await;
        res.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_turn_on_unknown_process_is_not_found() {
        let server = server();
        let res = server
            .post(&format!("/api/v1/process/{}/turn", uuid::Uuid::new_v4()))
            .json(&json!({}))
            .await;
        res.assert_status(StatusCode::NOT_FOUND);
    }
}
