use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::auth::require_bearer;
use crate::state::AppState;

/// Builds the full application router. Everything under `/api` except
/// `/api/auth/login` and `/api/parent/verify` requires a bearer token.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(parent_routes())
        .merge(company_routes())
        .merge(institution_routes())
        .merge(branch_routes())
        .merge(student_routes())
        .merge(fee_routes())
        .merge(staff_routes())
        .merge(bus_routes())
        .merge(inventory_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        // Public
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/parent/verify", get(handlers::parent::verify))
        .merge(protected)
        // Global middleware
        .layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.server.request_timeout_secs,
        )))
        .with_state(state)
}

fn parent_routes() -> Router<AppState> {
    use handlers::parent;

    Router::new()
        .route("/api/parent/:parentId/student", get(parent::student))
        .route("/api/parent/:parentId/fees", get(parent::fees))
        .route("/api/parent/:parentId/marks", get(parent::marks))
}

fn company_routes() -> Router<AppState> {
    use handlers::company;

    Router::new()
        .route("/api/company/dashboard", get(company::dashboard))
        .route(
            "/api/company/admins",
            get(company::list_admins).post(company::create_admin),
        )
        .route(
            "/api/company/admins/:id",
            put(company::update_admin).delete(company::delete_admin),
        )
}

fn institution_routes() -> Router<AppState> {
    use handlers::institutions;

    Router::new()
        .route(
            "/api/institutions",
            get(institutions::list).post(institutions::create),
        )
        .route(
            "/api/institutions/:id",
            get(institutions::get)
                .put(institutions::update)
                .delete(institutions::delete),
        )
        .route("/api/institutions/:id/branches", get(institutions::branches))
}

fn branch_routes() -> Router<AppState> {
    use handlers::branches;

    Router::new()
        .route("/api/branches", post(branches::create))
        .route(
            "/api/branches/:id",
            get(branches::get).put(branches::update).delete(branches::delete),
        )
        .route("/api/branches/:id/students", get(branches::students))
        .route("/api/branches/:id/fees", get(branches::fees))
        .route("/api/branches/:id/staff", get(branches::staff))
        .route("/api/branches/:id/inventory", get(branches::inventory))
        .route("/api/branches/:id/inventory/low-stock", get(branches::low_stock))
}

fn student_routes() -> Router<AppState> {
    use handlers::students;

    Router::new()
        .route("/api/students", post(students::create))
        .route("/api/students/:id", get(students::get).put(students::update))
        .route("/api/students/:id/exams", post(students::add_exam))
        .route("/api/students/:id/attendance", put(students::set_attendance))
}

fn fee_routes() -> Router<AppState> {
    Router::new().route("/api/fees", post(handlers::fees::create))
}

fn staff_routes() -> Router<AppState> {
    use handlers::staff;

    Router::new()
        .route("/api/staff", post(staff::create))
        .route("/api/staff/:id", put(staff::update).delete(staff::delete))
}

fn bus_routes() -> Router<AppState> {
    use handlers::buses;

    Router::new()
        .route("/api/buses", post(buses::create))
        .route("/api/buses/branch/:branchId", get(buses::list_for_branch))
        .route("/api/buses/branch/:branchId/stats", get(buses::stats))
        .route(
            "/api/buses/:id",
            get(buses::get).put(buses::update).delete(buses::deactivate),
        )
        .route("/api/buses/:id/driver", put(buses::set_driver))
        .route("/api/buses/:id/route", put(buses::set_route))
        .route("/api/buses/:id/maintenance", put(buses::merge_maintenance))
        .route("/api/buses/:id/safety", put(buses::merge_safety))
        .route("/api/buses/:id/status", put(buses::set_status))
}

fn inventory_routes() -> Router<AppState> {
    use handlers::inventory;

    Router::new()
        .route("/api/inventory", post(inventory::create))
        .route("/api/inventory/:id", get(inventory::get))
        .route("/api/inventory/:id/purchases", post(inventory::record_purchase))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.security.cors_origins;
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}
