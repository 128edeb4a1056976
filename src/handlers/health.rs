use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Campus API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Multi-tenant school management API",
            "endpoints": {
                "auth": "/api/auth/login (public)",
                "parent": "/api/parent/verify (public), /api/parent/:id/* (bearer)",
                "company": "/api/company/dashboard, /api/company/admins",
                "institutions": "/api/institutions[/:id]",
                "branches": "/api/branches[/:id]",
                "students": "/api/students[/:id]",
                "fees": "/api/fees",
                "staff": "/api/staff[/:id]",
                "buses": "/api/buses[/:id], /api/buses/branch/:branchId[/stats]",
                "inventory": "/api/inventory[/:id/purchases]",
            }
        }
    }))
}

/// GET /health - liveness including a store ping
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "store": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("health check store ping failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "store unavailable",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
        }
    }
}
