mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn institution_code_must_be_unique() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;

    let (status, body) = common::post(
        &app,
        "/api/institutions",
        Some(&token),
        json!({ "name": "Second School", "code": "INST002" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["item"]["max_branches"], json!(10));

    // Same code again, conflict from the store's own constraint.
    let (status, body) = common::post(
        &app,
        "/api/institutions",
        Some(&token),
        json!({ "name": "Copycat School", "code": "INST002" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn branch_creation_respects_the_institution_limit() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;

    let (status, body) = common::post(
        &app,
        "/api/institutions",
        Some(&token),
        json!({ "name": "Tiny School", "code": "INST003", "max_branches": 1 }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let institution_id = body["item"]["id"].as_str().unwrap().to_string();

    let (status, _) = common::post(
        &app,
        "/api/branches",
        Some(&token),
        json!({ "institution_id": institution_id, "branch_name": "Only Branch" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = common::post(
        &app,
        "/api/branches",
        Some(&token),
        json!({ "institution_id": institution_id, "branch_name": "One Too Many" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn institution_delete_does_not_cascade() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let (status, _) = common::delete(
        &app,
        &format!("/api/institutions/{}", ids.institution),
        Some(&token),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // Dependents survive the hard delete.
    let (status, body) =
        common::get(&app, &format!("/api/branches/{}", ids.chrompet), Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["branch_name"], json!("Ematix - Chrompet"));

    let (status, _) = common::get(
        &app,
        &format!("/api/institutions/{}", ids.institution),
        Some(&token),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn dashboard_totals_cover_the_seeded_company() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;

    let (status, body) = common::get(&app, "/api/company/dashboard", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["institutions"], json!(1));
    assert_eq!(body["totals"]["branches"], json!(2));
    assert_eq!(body["totals"]["students"], json!(8));
    // 25000 + 25000 + 26000 + 26000 + 24000 + 25500
    assert_eq!(body["totals"]["fee_collected"], json!(151_500));

    let branches = body["branches"].as_array().unwrap();
    assert_eq!(branches.len(), 2);
    assert!(branches
        .iter()
        .all(|b| b["institution_name"] == json!("Ematix Public School")));
    Ok(())
}

#[tokio::test]
async fn new_admin_gets_the_default_password() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let (status, body) = common::post(
        &app,
        "/api/company/admins",
        Some(&token),
        json!({
            "name": "New Admin",
            "email": "newadmin@ematix.com",
            "institution_id": ids.institution,
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["item"]["role"], json!("institution_admin"));

    // The well-known initial password works immediately.
    common::login(&app, "newadmin@ematix.com", "Admin@123").await?;
    Ok(())
}

#[tokio::test]
async fn duplicate_admin_email_conflicts() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let (status, _) = common::post(
        &app,
        "/api/company/admins",
        Some(&token),
        json!({
            "name": "Clash",
            "email": "inst@ematix.com",
            "institution_id": ids.institution,
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn staff_creation_derives_institution_from_branch() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let (status, body) = common::post(
        &app,
        "/api/staff",
        Some(&token),
        json!({
            "name": "Staff Member 3",
            "email": "staff3@ematix.com",
            "branch_id": ids.tambaram,
            "staff_category": "teaching",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["item"]["institution_id"].as_str(), Some(ids.institution.as_str()));

    let (status, body) = common::get(
        &app,
        &format!("/api/branches/{}/staff", ids.tambaram),
        Some(&token),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    Ok(())
}

#[tokio::test]
async fn raising_max_branches_takes_effect_immediately() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;

    let (status, body) = common::post(
        &app,
        "/api/institutions",
        Some(&token),
        json!({ "name": "Growing School", "code": "INST004", "max_branches": 1 }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let institution_id = body["item"]["id"].as_str().unwrap().to_string();

    let (status, _) = common::post(
        &app,
        "/api/branches",
        Some(&token),
        json!({ "institution_id": institution_id, "branch_name": "First" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = common::post(
        &app,
        "/api/branches",
        Some(&token),
        json!({ "institution_id": institution_id, "branch_name": "Second" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // The limit the insert checks is the one the update just wrote.
    let (status, _) = common::put(
        &app,
        &format!("/api/institutions/{institution_id}"),
        Some(&token),
        json!({ "max_branches": 2 }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::post(
        &app,
        "/api/branches",
        Some(&token),
        json!({ "institution_id": institution_id, "branch_name": "Second" }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn branch_creation_requires_an_existing_institution() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;

    let (status, body) = common::post(
        &app,
        "/api/branches",
        Some(&token),
        json!({ "institution_id": uuid::Uuid::new_v4(), "branch_name": "Nowhere" }),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    Ok(())
}
