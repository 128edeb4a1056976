mod common;

use anyhow::Result;
use axum::http::StatusCode;
use axum::Router;
use serde_json::{json, Value};

async fn verify(app: &Router, name: &str, phone: &str) -> Result<(StatusCode, Value)> {
    let name = name.replace(' ', "%20");
    common::get(
        app,
        &format!("/api/parent/verify?studentName={name}&phone={phone}"),
        None,
    )
    .await
}

#[tokio::test]
async fn verification_issues_a_student_scoped_token() -> Result<()> {
    let app = common::seeded_app().await?;

    let (status, body) = verify(&app, "Rahul Sharma", "9876543210").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["studentName"], json!("Rahul Sharma"));
    assert_eq!(body["parentName"], json!("Vijay Sharma"));

    let parent_id = body["parentId"].as_str().unwrap();
    let token = body["token"].as_str().unwrap();

    let (status, body) =
        common::get(&app, &format!("/api/parent/{parent_id}/student"), Some(token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["name"], json!("Rahul Sharma"));
    assert_eq!(body["item"]["class"], json!("1"));
    Ok(())
}

#[tokio::test]
async fn name_matching_ignores_case_and_surrounding_space() -> Result<()> {
    let app = common::seeded_app().await?;
    let (status, _) = verify(&app, "  rahul SHARMA ", "9876543210").await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn verification_failures_are_indistinguishable() -> Result<()> {
    let app = common::seeded_app().await?;

    // Known student, wrong phone.
    let (status_a, body_a) = verify(&app, "Rahul Sharma", "0000000000").await?;
    // Unknown student, real phone.
    let (status_b, body_b) = verify(&app, "No Such Student", "9876543210").await?;

    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a["message"], body_b["message"]);
    Ok(())
}

#[tokio::test]
async fn token_is_rejected_for_other_students() -> Result<()> {
    let app = common::seeded_app().await?;

    let (_, rahul) = verify(&app, "Rahul Sharma", "9876543210").await?;
    let (_, priya) = verify(&app, "Priya Patel", "9876543211").await?;

    let rahul_token = rahul["token"].as_str().unwrap();
    let priya_id = priya["parentId"].as_str().unwrap();

    let (status, body) = common::get(
        &app,
        &format!("/api/parent/{priya_id}/student"),
        Some(rahul_token),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], json!(false));
    Ok(())
}

#[tokio::test]
async fn admin_tokens_do_not_open_parent_routes() -> Result<()> {
    let app = common::seeded_app().await?;
    let admin = common::admin_token(&app).await?;

    let (_, rahul) = verify(&app, "Rahul Sharma", "9876543210").await?;
    let rahul_id = rahul["parentId"].as_str().unwrap();

    let (status, _) = common::get(
        &app,
        &format!("/api/parent/{rahul_id}/student"),
        Some(&admin),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn fee_report_matches_class_against_the_branch_table() -> Result<()> {
    let app = common::seeded_app().await?;

    // Rahul is class "1"; Chrompet's table prices "1st Std" at 25000 and a
    // 25000 payment is on record.
    let (_, rahul) = verify(&app, "Rahul Sharma", "9876543210").await?;
    let parent_id = rahul["parentId"].as_str().unwrap();
    let token = rahul["token"].as_str().unwrap();

    let (status, body) =
        common::get(&app, &format!("/api/parent/{parent_id}/fees"), Some(token)).await?;
    assert_eq!(status, StatusCode::OK);

    let report = &body["item"];
    assert_eq!(report["fee_structure_total"], json!(25_000));
    assert_eq!(report["paid_total"], json!(25_000));
    assert_eq!(report["pending_amount"], json!(0));
    Ok(())
}

#[tokio::test]
async fn unpaid_student_owes_the_full_structure() -> Result<()> {
    let app = common::seeded_app().await?;
    let admin = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &admin).await?;

    let (status, _) = common::post(
        &app,
        "/api/students",
        Some(&admin),
        json!({
            "branch_id": ids.chrompet,
            "name": "Divya Krishnan",
            "class": "2",
            "parent_name": "Krishnan Iyer",
            "phone_no": "9876543300",
            "admission_number": "202425-0009",
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, divya) = verify(&app, "Divya Krishnan", "9876543300").await?;
    let parent_id = divya["parentId"].as_str().unwrap();
    let token = divya["token"].as_str().unwrap();

    let (status, body) =
        common::get(&app, &format!("/api/parent/{parent_id}/fees"), Some(token)).await?;
    assert_eq!(status, StatusCode::OK);
    // "2" matches "2nd Std:26000"; nothing paid yet.
    assert_eq!(body["item"]["fee_structure_total"], json!(26_000));
    assert_eq!(body["item"]["paid_total"], json!(0));
    assert_eq!(body["item"]["pending_amount"], json!(26_000));
    Ok(())
}

#[tokio::test]
async fn marks_report_is_empty_for_a_new_student() -> Result<()> {
    let app = common::seeded_app().await?;

    let (_, rahul) = verify(&app, "Rahul Sharma", "9876543210").await?;
    let parent_id = rahul["parentId"].as_str().unwrap();
    let token = rahul["token"].as_str().unwrap();

    let (status, body) =
        common::get(&app, &format!("/api/parent/{parent_id}/marks"), Some(token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["exams"], json!([]));
    assert_eq!(body["item"]["attendance"], json!(null));
    Ok(())
}

#[tokio::test]
async fn renamed_student_verifies_under_the_new_name() -> Result<()> {
    let app = common::seeded_app().await?;
    let token = common::admin_token(&app).await?;
    let ids = common::seeded_ids(&app, &token).await?;

    let (_, body) = common::get(
        &app,
        &format!("/api/branches/{}/students", ids.chrompet),
        Some(&token),
    )
    .await?;
    let arun = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == json!("Arun Kumar"))
        .unwrap();
    let student_id = arun["id"].as_str().unwrap().to_string();

    let (status, _) = common::put(
        &app,
        &format!("/api/students/{student_id}"),
        Some(&token),
        json!({ "name": "Arun K Kumar" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // Verification matches on the name the update just wrote, not a stale
    // copy.
    let (status, body) = verify(&app, "Arun K Kumar", "9876543212").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["studentName"], json!("Arun K Kumar"));

    let (status, _) = verify(&app, "Arun Kumar", "9876543212").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}
