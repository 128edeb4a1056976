mod common;

use anyhow::Result;
use axum::http::StatusCode;
use axum::Router;
use serde_json::{json, Value};

async fn find_item(app: &Router, token: &str, branch_id: &str, name: &str) -> Result<Value> {
    let (status, body) =
        common::get(app, &format!("/api/branches/{branch_id}/inventory"), Some(token)).await?;
    anyhow::ensure!(status == StatusCode::OK, "inventory listing failed: {status}");
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["name"] == json!(name))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("item '{name}' not in listing"))
}

#[tokio::test]
async fn seeded_purchases_produced_the_expected_stock() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let uniforms = find_item(&app, &token, &ids.chrompet, "School Uniform Set").await?;
    assert_eq!(uniforms["current_stock"], json!(50));

    let books = find_item(&app, &token, &ids.chrompet, "Mathematics Textbook").await?;
    assert_eq!(books["current_stock"], json!(30));
    Ok(())
}

#[tokio::test]
async fn purchases_bump_stock_atomically() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let notebooks = find_item(&app, &token, &ids.chrompet, "Notebooks").await?;
    let item_id = notebooks["id"].as_str().unwrap();
    assert_eq!(notebooks["current_stock"], json!(100));

    let (status, body) = common::post(
        &app,
        &format!("/api/inventory/{item_id}/purchases"),
        Some(&token),
        json!({
            "quantity": 40,
            "supplier_name": "Paper Mills Co",
            "invoice_number": "INV003",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["item"]["quantity"], json!(40));

    let (_, body) = common::get(&app, &format!("/api/inventory/{item_id}"), Some(&token)).await?;
    assert_eq!(body["item"]["current_stock"], json!(140));
    Ok(())
}

#[tokio::test]
async fn purchase_quantity_must_be_positive() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let notebooks = find_item(&app, &token, &ids.chrompet, "Notebooks").await?;
    let item_id = notebooks["id"].as_str().unwrap();

    for quantity in [0, -5] {
        let (status, body) = common::post(
            &app,
            &format!("/api/inventory/{item_id}/purchases"),
            Some(&token),
            json!({ "quantity": quantity }),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    // A rejected purchase never touches the stock count.
    let (_, body) = common::get(&app, &format!("/api/inventory/{item_id}"), Some(&token)).await?;
    assert_eq!(body["item"]["current_stock"], json!(100));
    Ok(())
}

#[tokio::test]
async fn purchase_against_a_missing_item_is_not_found() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;

    let (status, _) = common::post(
        &app,
        &format!("/api/inventory/{}/purchases", uuid::Uuid::new_v4()),
        Some(&token),
        json!({ "quantity": 10 }),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn low_stock_listing_flags_items_under_their_minimum() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    // Nothing seeded sits below its minimum.
    let (status, body) = common::get(
        &app,
        &format!("/api/branches/{}/inventory/low-stock", ids.chrompet),
        Some(&token),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(0));

    let (status, _) = common::post(
        &app,
        "/api/inventory",
        Some(&token),
        json!({
            "branch_id": ids.chrompet,
            "category": "stationery",
            "name": "Chalk Boxes",
            "current_stock": 2,
            "min_quantity": 5,
            "unit": "boxes",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = common::get(
        &app,
        &format!("/api/branches/{}/inventory/low-stock", ids.chrompet),
        Some(&token),
    )
    .await?;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["items"][0]["name"], json!("Chalk Boxes"));
    Ok(())
}

#[tokio::test]
async fn inventory_creation_validates_input() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let (status, _) = common::post(
        &app,
        "/api/inventory",
        Some(&token),
        json!({ "branch_id": ids.chrompet, "category": "misc", "name": "  " }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::post(
        &app,
        "/api/inventory",
        Some(&token),
        json!({
            "branch_id": uuid::Uuid::new_v4(),
            "category": "misc",
            "name": "Ghost Item",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
