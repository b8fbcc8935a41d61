//! Integration tests for fiscalization-campaign endpoints: event
//! fan-out, response flags and role scoping.

use rocket::http::Status;
use rocket::local::asynchronous::Client;
use rocket::tokio;
use serde_json::json;

use zela_api::orm::testing::test_rocket;

async fn login_user(client: &Client, email: &str, password: &str) -> rocket::http::Cookie<'static> {
    let response = client
        .post("/api/1/login")
        .json(&json!({ "email": email, "password": password }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    response
        .cookies()
        .get("session")
        .expect("Session cookie should be set")
        .clone()
        .into_owned()
}

async fn create_event(client: &Client, admin: &rocket::http::Cookie<'static>, date: &str) -> i64 {
    let response = client
        .post("/api/1/Inspections")
        .cookie(admin.clone())
        .json(&json!({ "reference_date": date, "description": "Vistoria semestral" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let created: serde_json::Value = response.into_json().await.unwrap();
    created["id"].as_i64().unwrap()
}

async fn own_school_id(client: &Client, cookie: &rocket::http::Cookie<'static>) -> i32 {
    let response = client
        .get("/api/1/hello")
        .cookie(cookie.clone())
        .dispatch()
        .await;
    let body: serde_json::Value = response.into_json().await.unwrap();
    body["school_id"].as_i64().unwrap() as i32
}

#[tokio::test]
async fn test_create_event_requires_district_role() {
    let client = Client::untracked(test_rocket()).await.unwrap();
    let diretor = login_user(&client, "diretor@escola1.example", "diretor").await;

    let response = client
        .post("/api/1/Inspections")
        .cookie(diretor)
        .json(&json!({ "reference_date": "2025-06-01", "description": null }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
}

#[tokio::test]
async fn test_event_fans_out_to_every_school() {
    let client = Client::untracked(test_rocket()).await.unwrap();
    let admin = login_user(&client, "admin@zela.local", "admin").await;
    let event_id = create_event(&client, &admin, "2025-06-01").await;

    let response = client
        .get(format!("/api/1/Inspections/{}", event_id))
        .cookie(admin)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let detail: serde_json::Value = response.into_json().await.unwrap();
    let responses = detail["responses"].as_array().unwrap();
    // One pending response per seeded school.
    assert!(responses.len() >= 2);
    for row in responses {
        assert_eq!(row["responded"], false);
        assert_eq!(row["notified"], false);
        assert!(row["school_name"].as_str().is_some());
    }
}

#[tokio::test]
async fn test_school_user_sees_only_own_response() {
    let client = Client::untracked(test_rocket()).await.unwrap();
    let admin = login_user(&client, "admin@zela.local", "admin").await;
    let event_id = create_event(&client, &admin, "2025-06-01").await;

    let diretor = login_user(&client, "diretor@escola1.example", "diretor").await;
    let response = client
        .get(format!("/api/1/Inspections/{}", event_id))
        .cookie(diretor)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let detail: serde_json::Value = response.into_json().await.unwrap();
    let responses = detail["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["school_name"], "EM Paulo Freire");
}

#[tokio::test]
async fn test_response_flag_permissions() {
    let client = Client::untracked(test_rocket()).await.unwrap();
    let admin = login_user(&client, "admin@zela.local", "admin").await;
    let event_id = create_event(&client, &admin, "2025-06-01").await;

    let diretor = login_user(&client, "diretor@escola1.example", "diretor").await;
    let school_id = own_school_id(&client, &diretor).await;

    // The school marks itself as having responded.
    let response = client
        .patch(format!("/api/1/Inspections/{}/Responses/{}", event_id, school_id))
        .cookie(diretor.clone())
        .json(&json!({ "responded": true }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(updated["responded"], true);
    assert_eq!(updated["notified"], false);

    // The notified flag is district-only.
    let response = client
        .patch(format!("/api/1/Inspections/{}/Responses/{}", event_id, school_id))
        .cookie(diretor)
        .json(&json!({ "notified": true }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .patch(format!("/api/1/Inspections/{}/Responses/{}", event_id, school_id))
        .cookie(admin)
        .json(&json!({ "notified": true }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(updated["notified"], true);
    assert_eq!(updated["responded"], true);
}

#[tokio::test]
async fn test_unknown_response_is_not_found() {
    let client = Client::untracked(test_rocket()).await.unwrap();
    let admin = login_user(&client, "admin@zela.local", "admin").await;
    let event_id = create_event(&client, &admin, "2025-06-01").await;

    let response = client
        .patch(format!("/api/1/Inspections/{}/Responses/99999", event_id))
        .cookie(admin)
        .json(&json!({ "notified": true }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[tokio::test]
async fn test_list_events_newest_first() {
    let client = Client::untracked(test_rocket()).await.unwrap();
    let admin = login_user(&client, "admin@zela.local", "admin").await;

    create_event(&client, &admin, "2025-03-01").await;
    create_event(&client, &admin, "2025-06-01").await;

    let response = client
        .get("/api/1/Inspections")
        .cookie(admin)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["reference_date"], "2025-06-01");
}

#[tokio::test]
async fn test_delete_event() {
    let client = Client::untracked(test_rocket()).await.unwrap();
    let admin = login_user(&client, "admin@zela.local", "admin").await;
    let event_id = create_event(&client, &admin, "2025-06-01").await;

    let response = client
        .delete(format!("/api/1/Inspections/{}", event_id))
        .cookie(admin.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NoContent);

    let response = client
        .get(format!("/api/1/Inspections/{}", event_id))
        .cookie(admin)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}
