mod common;

use anyhow::Result;
use axum::http::StatusCode;
use axum::Router;
use serde_json::{json, Value};

async fn create_bus(app: &Router, token: &str, branch_id: &str, body: Value) -> Result<Value> {
    let mut payload = body;
    payload["branch_id"] = json!(branch_id);
    let (status, body) = common::post(app, "/api/buses", Some(token), payload).await?;
    anyhow::ensure!(status == StatusCode::CREATED, "bus create failed: {status} {body}");
    Ok(body["item"].clone())
}

#[tokio::test]
async fn new_bus_gets_the_default_status_triple() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let bus = create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({ "bus_id": "BUS-01", "registration_number": "TN-01-AB-1234" }),
    )
    .await?;

    assert_eq!(bus["operational_status"], json!("Active"));
    assert_eq!(bus["availability"], json!("Available"));
    assert_eq!(bus["bus_condition"], json!("Good"));
    assert_eq!(bus["is_active"], json!(true));
    assert_eq!(bus["driver"]["assignment_status"], json!("Not Assigned"));
    assert_eq!(bus["institution_id"].as_str(), Some(ids.institution.as_str()));
    Ok(())
}

#[tokio::test]
async fn bus_creation_requires_an_existing_branch() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;

    let (status, body) = common::post(
        &app,
        "/api/buses",
        Some(&token),
        json!({
            "branch_id": uuid::Uuid::new_v4(),
            "bus_id": "BUS-09",
            "registration_number": "TN-01-ZZ-9999",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn fleet_code_and_registration_are_unique() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({ "bus_id": "BUS-01", "registration_number": "TN-01-AB-1234" }),
    )
    .await?;

    // Same fleet code, different plate - even in another branch.
    let (status, _) = common::post(
        &app,
        "/api/buses",
        Some(&token),
        json!({
            "branch_id": ids.tambaram,
            "bus_id": "BUS-01",
            "registration_number": "TN-01-CD-5678",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // Same plate, different fleet code.
    let (status, _) = common::post(
        &app,
        "/api/buses",
        Some(&token),
        json!({
            "branch_id": ids.chrompet,
            "bus_id": "BUS-02",
            "registration_number": "TN-01-AB-1234",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn soft_delete_hides_the_bus_from_listings_only() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let bus = create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({ "bus_id": "BUS-01", "registration_number": "TN-01-AB-1234" }),
    )
    .await?;
    let bus_id = bus["id"].as_str().unwrap();

    let (status, _) = common::delete(&app, &format!("/api/buses/{bus_id}"), Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::get(
        &app,
        &format!("/api/buses/branch/{}", ids.chrompet),
        Some(&token),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(0));

    // Direct lookup still works and shows the forced terminal status.
    let (status, body) = common::get(&app, &format!("/api/buses/{bus_id}"), Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["is_active"], json!(false));
    assert_eq!(body["item"]["operational_status"], json!("Out of Service"));
    Ok(())
}

#[tokio::test]
async fn out_of_service_is_terminal() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let bus = create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({ "bus_id": "BUS-01", "registration_number": "TN-01-AB-1234" }),
    )
    .await?;
    let bus_id = bus["id"].as_str().unwrap();

    let (status, _) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/status"),
        Some(&token),
        json!({ "operational_status": "Out of Service" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/status"),
        Some(&token),
        json!({ "operational_status": "Active" }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn stale_expected_status_is_a_conflict() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let bus = create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({ "bus_id": "BUS-01", "registration_number": "TN-01-AB-1234" }),
    )
    .await?;
    let bus_id = bus["id"].as_str().unwrap();

    let (status, _) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/status"),
        Some(&token),
        json!({ "operational_status": "Under Maintenance", "expected_status": "Active" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // A second caller still believes the bus is Active.
    let (status, body) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/status"),
        Some(&token),
        json!({ "operational_status": "Out of Service", "expected_status": "Active" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn driver_assignment_and_maintenance_merge() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let bus = create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({ "bus_id": "BUS-01", "registration_number": "TN-01-AB-1234" }),
    )
    .await?;
    let bus_id = bus["id"].as_str().unwrap();

    let (status, body) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/driver"),
        Some(&token),
        json!({
            "driver_name": "Murugan",
            "contact_number": "9876500001",
            "assignment_status": "Assigned",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["driver"]["driver_name"], json!("Murugan"));

    // Maintenance fields merge; an omitted field keeps its value.
    let (status, _) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/maintenance"),
        Some(&token),
        json!({ "odometer_km": 42_000, "notes": "brake pads replaced" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/maintenance"),
        Some(&token),
        json!({ "last_service_date": "2025-07-01" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["maintenance"]["odometer_km"], json!(42_000));
    assert_eq!(body["item"]["maintenance"]["last_service_date"], json!("2025-07-01"));
    Ok(())
}

#[tokio::test]
async fn branch_stats_break_the_fleet_down() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({
            "bus_id": "BUS-01",
            "registration_number": "TN-01-AB-0001",
            "driver": { "driver_name": "Murugan", "assignment_status": "Assigned" },
        }),
    )
    .await?;
    create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({ "bus_id": "BUS-02", "registration_number": "TN-01-AB-0002" }),
    )
    .await?;
    // One bus both Under Maintenance and Needs Service: counts once.
    create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({
            "bus_id": "BUS-03",
            "registration_number": "TN-01-AB-0003",
            "operational_status": "Under Maintenance",
            "bus_condition": "Needs Service",
        }),
    )
    .await?;
    create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({
            "bus_id": "BUS-04",
            "registration_number": "TN-01-AB-0004",
            "operational_status": "Under Maintenance",
            "bus_condition": "Fair",
        }),
    )
    .await?;

    let (status, body) = common::get(
        &app,
        &format!("/api/buses/branch/{}/stats", ids.chrompet),
        Some(&token),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let stats = &body["item"];
    assert_eq!(stats["total"], json!(4));
    assert_eq!(stats["by_status"]["Active"], json!(2));
    assert_eq!(stats["by_status"]["Under Maintenance"], json!(2));
    assert_eq!(stats["by_condition"]["Good"], json!(2));
    assert_eq!(stats["with_driver"], json!(1));
    assert_eq!(stats["needs_maintenance"], json!(2));
    Ok(())
}

#[tokio::test]
async fn unknown_status_label_keeps_the_error_envelope() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let bus = create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({ "bus_id": "BUS-01", "registration_number": "TN-01-AB-1234" }),
    )
    .await?;
    let bus_id = bus["id"].as_str().unwrap();

    // A label outside the closed set must come back as a 400 envelope, not
    // the framework's plain-text rejection.
    let (status, body) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/status"),
        Some(&token),
        json!({ "operational_status": "Bogus Value" }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("BAD_REQUEST"));

    // Nothing was written.
    let (_, body) = common::get(&app, &format!("/api/buses/{bus_id}"), Some(&token)).await?;
    assert_eq!(body["item"]["operational_status"], json!("Active"));
    Ok(())
}

#[tokio::test]
async fn restating_the_current_status_is_accepted() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let bus = create_bus(
        &app,
        &token,
        &ids.chrompet,
        json!({ "bus_id": "BUS-01", "registration_number": "TN-01-AB-1234" }),
    )
    .await?;
    let bus_id = bus["id"].as_str().unwrap();

    let (status, _) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/status"),
        Some(&token),
        json!({ "operational_status": "Out of Service" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // Repeating the terminal status is an idempotent no-op, same as
    // restating "Active" on an active bus.
    let (status, body) = common::put(
        &app,
        &format!("/api/buses/{bus_id}/status"),
        Some(&token),
        json!({ "operational_status": "Out of Service" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["operational_status"], json!("Out of Service"));
    Ok(())
}
