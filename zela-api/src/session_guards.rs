//! Session-based authentication and authorization guards for Rocket routes.
//!
//! The guards validate the session cookie against the sessions table and
//! hand the route its user row. `AuthenticatedUser` is enough for most
//! endpoints; `DistrictUser` additionally requires the district-level
//! role and is used for the privileged operations (user management,
//! school registry writes, process administration).
//!
//! ```rust
//! use rocket::get;
//! use zela_api::session_guards::{AuthenticatedUser, DistrictUser};
//!
//! #[get("/profile")]
//! fn get_profile(user: AuthenticatedUser) -> String {
//!     format!("Welcome, {}!", user.user.email)
//! }
//!
//! #[get("/admin")]
//! fn district_only(user: DistrictUser) -> String {
//!     format!("District access granted to {}", user.user.email)
//! }
//! ```

use chrono::Utc;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};

use crate::DbConn;
use crate::models::{Session, User};
use crate::schema::{sessions, users};

/// A request guard for routes that require an authenticated user.
///
/// Validation steps:
/// 1. Extract the "session" cookie
/// 2. Find a matching, non-revoked, non-expired session row
/// 3. Load the session's user
///
/// # Returns
///
/// - `Outcome::Success(AuthenticatedUser)` if authentication succeeds
/// - `Outcome::Error(Status::Unauthorized)` if the session is missing or invalid
/// - `Outcome::Error(Status::InternalServerError)` if no database connection
#[derive(Debug)]
pub struct AuthenticatedUser {
    /// The authenticated user from the database
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let cookies = request.cookies();
        let db = match request.guard::<DbConn>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        let session_cookie = match cookies.get("session") {
            Some(cookie) => cookie,
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let session_id = session_cookie.value().to_string();

        let session_result = db
            .run(move |conn| {
                sessions::table
                    .filter(sessions::id.eq(&session_id))
                    .filter(sessions::revoked.eq(false))
                    .filter(
                        sessions::expires_at
                            .is_null()
                            .or(sessions::expires_at.gt(Utc::now().naive_utc())),
                    )
                    .first::<Session>(conn)
                    .optional()
            })
            .await;

        let session = match session_result {
            Ok(Some(sess)) => sess,
            Ok(None) => return Outcome::Error((Status::Unauthorized, ())),
            Err(e) => {
                error!("Database error finding session: {:?}", e);
                return Outcome::Error((Status::Unauthorized, ()));
            }
        };

        let user_result = db
            .run(move |conn| {
                users::table
                    .filter(users::id.eq(session.user_id))
                    .first::<User>(conn)
                    .optional()
            })
            .await;

        match user_result {
            Ok(Some(user)) => Outcome::Success(AuthenticatedUser { user }),
            Ok(None) => Outcome::Error((Status::Unauthorized, ())),
            Err(e) => {
                error!("Database error finding user: {:?}", e);
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

impl AuthenticatedUser {
    /// True for district-level accounts.
    pub fn is_district(&self) -> bool {
        self.user.is_district()
    }

    /// True when the user may read data scoped to `school_id`: district
    /// accounts see everything, school accounts only their own school.
    pub fn can_access_school(&self, school_id: i32) -> bool {
        self.is_district() || self.user.school_id == Some(school_id)
    }
}

/// A request guard that additionally requires the district-level role.
///
/// # Returns
///
/// - `Outcome::Success(DistrictUser)` if authenticated with the district role
/// - `Outcome::Error(Status::Forbidden)` if authenticated but school-level
/// - `Outcome::Error(Status::Unauthorized)` if not authenticated
#[derive(Debug)]
pub struct DistrictUser {
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for DistrictUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth_user = match AuthenticatedUser::from_request(request).await {
            Outcome::Success(user) => user,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        if auth_user.is_district() {
            Outcome::Success(DistrictUser {
                user: auth_user.user,
            })
        } else {
            Outcome::Error((Status::Forbidden, ()))
        }
    }
}
