#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use campus_api::config::AppConfig;
use campus_api::routes;
use campus_api::seed;
use campus_api::state::AppState;
use campus_api::store::memory::MemStore;
use campus_api::store::Store;

// Low bcrypt cost keeps the suites fast; never use this outside tests.
const TEST_BCRYPT_COST: u32 = 4;

fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.bcrypt_cost = TEST_BCRYPT_COST;
    config
}

/// Fresh app over an empty in-memory store.
pub fn app() -> Router {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    routes::app(AppState::new(store, test_config()))
}

/// Fresh app with the demo dataset loaded.
pub async fn seeded_app() -> Result<Router> {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    seed::run(store.clone(), TEST_BCRYPT_COST).await?;
    Ok(routes::app(AppState::new(store, test_config())))
}

/// Drives one request through the router and decodes the JSON body.
pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await.context("request failed")?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).context("response was not JSON")?
    };
    Ok((status, value))
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
    request(app, Method::GET, uri, token, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> Result<(StatusCode, Value)> {
    request(app, Method::POST, uri, token, Some(body)).await
}

pub async fn put(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> Result<(StatusCode, Value)> {
    request(app, Method::PUT, uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
    request(app, Method::DELETE, uri, token, None).await
}

/// Logs in and returns the bearer token.
pub async fn login(app: &Router, email: &str, password: &str) -> Result<String> {
    let (status, body) = post(
        app,
        "/api/auth/login",
        None,
        json!({ "email": email, "password": password }),
    )
    .await?;
    ensure!(status == StatusCode::OK, "login failed: {status} {body}");
    body["token"]
        .as_str()
        .map(str::to_string)
        .context("login response had no token")
}

/// Company-admin token from the seeded dataset.
pub async fn admin_token(app: &Router) -> Result<String> {
    login(app, "company@erp.com", "Admin@123").await
}

pub struct SeededIds {
    pub institution: String,
    pub chrompet: String,
    pub tambaram: String,
}

/// Looks up the seeded institution and branch ids through the API.
pub async fn seeded_ids(app: &Router, token: &str) -> Result<SeededIds> {
    let (status, body) = get(app, "/api/institutions", Some(token)).await?;
    ensure!(status == StatusCode::OK, "institutions listing failed: {status}");
    let institution = body["items"][0]["id"]
        .as_str()
        .context("seeded institution missing")?
        .to_string();

    let (status, body) =
        get(app, &format!("/api/institutions/{institution}/branches"), Some(token)).await?;
    ensure!(status == StatusCode::OK, "branches listing failed: {status}");

    let mut chrompet = None;
    let mut tambaram = None;
    for branch in body["items"].as_array().context("branches not a list")? {
        let id = branch["id"].as_str().context("branch id missing")?.to_string();
        match branch["branch_name"].as_str() {
            Some("Ematix - Chrompet") => chrompet = Some(id),
            Some("Ematix - Tambaram") => tambaram = Some(id),
            _ => {}
        }
    }

    Ok(SeededIds {
        institution,
        chrompet: chrompet.context("Chrompet branch missing")?,
        tambaram: tambaram.context("Tambaram branch missing")?,
    })
}
