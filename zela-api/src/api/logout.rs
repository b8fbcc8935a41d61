//! API endpoint for user logout and session termination.

use crate::DbConn;
use crate::orm::logout::revoke_session;
use rocket::serde::json::{Json, Value, json};
use rocket::{
    Route,
    http::{Cookie, CookieJar},
    post,
};

/// Logout endpoint that terminates user sessions.
///
/// - **URL:** `/api/1/logout`
/// - **Method:** `POST`
/// - **Authentication:** None required (works with or without valid session)
///
/// Revokes the session row (kept for auditing) and removes the cookie.
/// Always returns 200, including when no session cookie is present.
#[post("/1/logout")]
pub async fn logout(db: DbConn, cookies: &CookieJar<'_>) -> Json<Value> {
    let cookie_value = cookies.get("session").map(|c| c.value().to_string());

    if let Some(session_id) = cookie_value {
        let _ = revoke_session(&db, &session_id).await;
        cookies.remove(Cookie::from("session"));
    }

    Json(json!({
        "message": "Logout successful",
        "status": "ok"
    }))
}

/// Returns all logout-related API routes.
pub fn routes() -> Vec<Route> {
    routes![logout]
}
