//! HTTP liveness endpoint.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct Alive {
    message: &'static str,
}

async fn root() -> Json<Alive> {
    Json(Alive {
        message: "Kritika is alive!",
    })
}

/// `GET /` → `{"message": "Kritika is alive!"}`.
pub fn router() -> Router {
    Router::new().route("/", get(root))
}
