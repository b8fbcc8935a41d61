//! API endpoints for user login and session checks.

use rocket::response;
use rocket::serde::{Deserialize, Serialize};
use rocket::{Route, get, http::CookieJar, post, serde::json::Json};
use ts_rs::TS;

use crate::DbConn;
use crate::models::UserSummary;
use crate::orm::login::process_login;
use crate::orm::school::get_school_by_id;
use crate::session_guards::AuthenticatedUser;

/// Error response structure for authentication failures.
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

/// Login request structure containing user credentials.
#[derive(Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Builds the user summary returned by both login and hello, so the
/// frontend restores sessions from the same shape it logged in with.
async fn build_user_response(db: &DbConn, user: crate::models::User) -> UserSummary {
    let school_name = match user.school_id {
        Some(school_id) => db
            .run(move |conn| get_school_by_id(conn, school_id))
            .await
            .ok()
            .flatten()
            .map(|school| school.name),
        None => None,
    };

    UserSummary::from_user(user, school_name)
}

/// Login endpoint that authenticates users and creates sessions.
///
/// - **URL:** `/api/1/login`
/// - **Method:** `POST`
/// - **Authentication:** None required
///
/// Validates the credentials, stores a session row and sets the secure
/// HTTP-only session cookie.
///
/// **Failure (HTTP 401 Unauthorized):**
/// ```json
/// { "error": "Invalid credentials" }
/// ```
///
/// Unknown emails and wrong passwords are deliberately indistinguishable.
#[post("/1/login", data = "<login>")]
pub async fn login(
    db: DbConn,
    cookies: &CookieJar<'_>,
    login: Json<LoginRequest>,
) -> Result<Json<UserSummary>, response::status::Custom<Json<ErrorResponse>>> {
    match process_login(&db, cookies, &login).await {
        Ok(user) => Ok(Json(build_user_response(&db, user).await)),
        Err(status) => {
            let err_json = Json(ErrorResponse {
                error: "Invalid credentials".to_string(),
            });
            Err(response::status::Custom(status, err_json))
        }
    }
}

/// Authentication check endpoint.
///
/// - **URL:** `/api/1/hello`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// Returns the same summary as a successful login; the frontend calls
/// it on load to decide between the app and the login screen.
#[get("/1/hello")]
pub async fn secure_hello(auth_user: AuthenticatedUser, db: DbConn) -> Json<UserSummary> {
    Json(build_user_response(&db, auth_user.user).await)
}

/// Returns all login-related API routes.
pub fn routes() -> Vec<Route> {
    routes![login, secure_hello]
}
