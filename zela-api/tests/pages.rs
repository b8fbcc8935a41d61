//! Navigation-guard tests for the page routes.
//!
//! A session without a valid authenticated user is always redirected to
//! the login screen except when already on it; an authenticated user on
//! the login screen is always redirected away.

use rocket::http::Status;
use rocket::tokio;
use serde_json::json;

use zela_api::orm::testing::test_rocket;

async fn login_user(
    client: &rocket::local::asynchronous::Client,
    email: &str,
    password: &str,
) -> rocket::http::Cookie<'static> {
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

#[tokio::test]
async fn test_unauthenticated_pages_redirect_to_login() {
    let client = rocket::local::asynchronous::Client::untracked(test_rocket())
        .await
        .unwrap();

    for path in ["/", "/schools", "/water", "/processes", "/inspections", "/users"] {
        let response = client.get(path).dispatch().await;
        assert_eq!(
            response.status(),
            Status::SeeOther,
            "expected redirect for {}",
            path
        );
        assert_eq!(response.headers().get_one("Location"), Some("/login"));
    }
}

#[tokio::test]
async fn test_login_page_does_not_redirect_unauthenticated() {
    let client = rocket::local::asynchronous::Client::untracked(test_rocket())
        .await
        .unwrap();

    let response = client.get("/login").dispatch().await;
    // No redirect loop; without a deployed frontend bundle the route
    // answers 404 rather than bouncing.
    assert_ne!(response.status(), Status::SeeOther);
}

#[tokio::test]
async fn test_authenticated_login_page_redirects_away() {
    let client = rocket::local::asynchronous::Client::untracked(test_rocket())
        .await
        .unwrap();

    let session_cookie = login_user(&client, "admin@zela.local", "admin").await;

    let response = client
        .get("/login")
        .cookie(session_cookie.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/"));

    // Authenticated users are not redirected off the app pages.
    let response = client.get("/schools").cookie(session_cookie).dispatch().await;
    assert_ne!(response.status(), Status::SeeOther);
}

#[tokio::test]
async fn test_revoked_session_redirects_again() {
    let client = rocket::local::asynchronous::Client::untracked(test_rocket())
        .await
        .unwrap();

    let session_cookie = login_user(&client, "diretor@escola1.example", "diretor").await;

    let response = client
        .post("/api/1/logout")
        .cookie(session_cookie.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client.get("/").cookie(session_cookie).dispatch().await;
    assert_eq!(response.status(), Status::SeeOther);
    assert_eq!(response.headers().get_one("Location"), Some("/login"));
}
