//! API endpoints for user-account management.
//!
//! User creation and deletion are the privileged operations of the
//! system and require the district-level role; the only self-service
//! operation is a password change.

use rocket::Route;
use rocket::http::Status;
use rocket::response::{self, status};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::list_query::{Page, PageQuery};
use crate::logged_json::LoggedJson;
use crate::models::{User, UserSummary, is_valid_role, ROLE_SCHOOL};
use crate::orm::login::{hash_password, verify_password};
use crate::orm::school::get_school_by_id;
use crate::orm::user::{
    delete_user, get_user, get_user_by_email, insert_user, search_users, update_user,
};
use crate::session_guards::{AuthenticatedUser, DistrictUser};

/// Error response structure for user API failures.
#[derive(Serialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request payload for creating a new user.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub school_id: Option<i32>,
}

/// Request payload for updating a user (all fields optional).
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub school_id: Option<i32>,
}

/// Request payload for the self-service password change.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn bad_request(message: &str) -> response::status::Custom<Json<ErrorResponse>> {
    response::status::Custom(
        Status::BadRequest,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn internal_error(context: &str) -> response::status::Custom<Json<ErrorResponse>> {
    response::status::Custom(
        Status::InternalServerError,
        Json(ErrorResponse {
            error: context.to_string(),
        }),
    )
}

/// Validates the role/school linkage shared by create and update.
fn check_role_and_school(
    conn: &mut diesel::SqliteConnection,
    role: &str,
    school_id: Option<i32>,
) -> Result<(), response::status::Custom<Json<ErrorResponse>>> {
    if !is_valid_role(role) {
        return Err(bad_request(&format!(
            "Role must be 'district' or 'school', got '{}'",
            role
        )));
    }
    if role == ROLE_SCHOOL && school_id.is_none() {
        return Err(bad_request("School-level users must be linked to a school"));
    }
    if let Some(school_id) = school_id {
        match get_school_by_id(conn, school_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(bad_request(&format!(
                    "School with ID {} does not exist",
                    school_id
                )));
            }
            Err(e) => {
                eprintln!("Error validating school for user: {:?}", e);
                return Err(internal_error("Database error while validating school"));
            }
        }
    }
    Ok(())
}

fn summarize(conn: &mut diesel::SqliteConnection, user: User) -> UserSummary {
    let school_name = user
        .school_id
        .and_then(|school_id| get_school_by_id(conn, school_id).ok().flatten())
        .map(|school| school.name);
    UserSummary::from_user(user, school_name)
}

/// Create User endpoint.
///
/// - **URL:** `/api/1/Users`
/// - **Method:** `POST`
/// - **Authentication:** Required
/// - **Authorization:** District role
///
/// Hashes the password and stores the account. The email must be free
/// (case-insensitive); school-level accounts must name their school.
#[post("/1/Users", data = "<new_user>")]
pub async fn create_user(
    db: DbConn,
    new_user: LoggedJson<CreateUserRequest>,
    _district: DistrictUser,
) -> Result<status::Created<Json<UserSummary>>, response::status::Custom<Json<ErrorResponse>>> {
    db.run(move |conn| {
        if new_user.name.trim().is_empty() || new_user.email.trim().is_empty() {
            return Err(bad_request("Name and email are required"));
        }
        if new_user.password.trim().is_empty() {
            return Err(bad_request("Password must not be empty"));
        }

        check_role_and_school(conn, &new_user.role, new_user.school_id)?;

        match get_user_by_email(conn, &new_user.email) {
            Ok(Some(_)) => {
                let err = Json(ErrorResponse {
                    error: format!("User with email '{}' already exists", new_user.email),
                });
                return Err(response::status::Custom(Status::Conflict, err));
            }
            Ok(None) => {}
            Err(e) => {
                eprintln!("Error checking for existing user: {:?}", e);
                return Err(internal_error("Database error while checking for existing user"));
            }
        }

        let input = crate::models::UserInput {
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            password_hash: hash_password(&new_user.password),
            role: new_user.role.clone(),
            school_id: new_user.school_id,
        };

        insert_user(conn, input)
            .map(|user| {
                let summary = summarize(conn, user);
                status::Created::new("/").body(Json(summary))
            })
            .map_err(|e| {
                eprintln!("Error creating user: {:?}", e);
                internal_error("Database error while creating user")
            })
    })
    .await
}

/// List Users endpoint.
///
/// - **URL:** `/api/1/Users`
/// - **Method:** `GET`
/// - **Authentication:** Required
/// - **Authorization:** District role
///
/// Paginated; `search` matches name or email.
#[get("/1/Users?<search>&<query..>")]
pub async fn list_users(
    db: DbConn,
    _district: DistrictUser,
    search: Option<String>,
    query: PageQuery,
) -> Result<Json<Page<UserSummary>>, Status> {
    db.run(move |conn| {
        let (users, total) = search_users(conn, search.as_deref(), query.limit(), query.offset())
            .map_err(|_| Status::InternalServerError)?;

        let summaries = users.into_iter().map(|user| summarize(conn, user)).collect();
        Ok(Json(Page {
            items: summaries,
            total,
            page: query.page(),
            per_page: query.per_page(),
        }))
    })
    .await
}

/// Update User endpoint.
///
/// - **URL:** `/api/1/Users/<user_id>`
/// - **Method:** `PATCH`
/// - **Authentication:** Required
/// - **Authorization:** District role
#[patch("/1/Users/<user_id>", data = "<update>")]
pub async fn update_user_endpoint(
    db: DbConn,
    user_id: i32,
    update: LoggedJson<UpdateUserRequest>,
    _district: DistrictUser,
) -> Result<Json<UserSummary>, response::status::Custom<Json<ErrorResponse>>> {
    db.run(move |conn| {
        let existing = match get_user(conn, user_id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Err(response::status::Custom(
                    Status::NotFound,
                    Json(ErrorResponse {
                        error: format!("User with ID {} not found", user_id),
                    }),
                ));
            }
            Err(e) => {
                eprintln!("Error fetching user: {:?}", e);
                return Err(internal_error("Database error while fetching user"));
            }
        };

        let role = update.role.clone().unwrap_or(existing.role);
        let school_id = update.school_id.or(existing.school_id);
        check_role_and_school(conn, &role, school_id)?;

        let password_hash = update.password.as_deref().map(hash_password);

        update_user(
            conn,
            user_id,
            update.name.clone(),
            update.email.clone(),
            password_hash,
            Some(role),
            Some(school_id),
        )
        .map(|user| Json(summarize(conn, user)))
        .map_err(|e| {
            eprintln!("Error updating user: {:?}", e);
            internal_error("Database error while updating user")
        })
    })
    .await
}

/// Change Own Password endpoint.
///
/// - **URL:** `/api/1/Users/me/password`
/// - **Method:** `PUT`
/// - **Authentication:** Required
///
/// Verifies the current password before storing the new hash.
#[put("/1/Users/me/password", data = "<change>")]
pub async fn change_own_password(
    db: DbConn,
    auth_user: AuthenticatedUser,
    change: LoggedJson<ChangePasswordRequest>,
) -> Result<Status, response::status::Custom<Json<ErrorResponse>>> {
    let user = auth_user.user;
    db.run(move |conn| {
        if change.new_password.trim().is_empty() {
            return Err(bad_request("Password must not be empty"));
        }
        if !verify_password(&change.current_password, &user.password_hash) {
            return Err(response::status::Custom(
                Status::Unauthorized,
                Json(ErrorResponse {
                    error: "Current password is incorrect".to_string(),
                }),
            ));
        }

        update_user(
            conn,
            user.id,
            None,
            None,
            Some(hash_password(&change.new_password)),
            None,
            None,
        )
        .map(|_| Status::NoContent)
        .map_err(|e| {
            eprintln!("Error changing password: {:?}", e);
            internal_error("Database error while changing password")
        })
    })
    .await
}

/// Delete User endpoint.
///
/// - **URL:** `/api/1/Users/<user_id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
/// - **Authorization:** District role; deleting the calling account is
///   rejected so an instance cannot lock itself out.
#[delete("/1/Users/<user_id>")]
pub async fn delete_user_endpoint(
    db: DbConn,
    user_id: i32,
    district: DistrictUser,
) -> Result<Status, Status> {
    if district.user.id == user_id {
        return Err(Status::Conflict);
    }

    db.run(move |conn| {
        delete_user(conn, user_id)
            .map(|found| if found { Status::NoContent } else { Status::NotFound })
            .map_err(|e| {
                eprintln!("Error deleting user: {:?}", e);
                Status::InternalServerError
            })
    })
    .await
}

/// Returns a vector of all routes defined in this module.
pub fn routes() -> Vec<Route> {
    routes![
        create_user,
        list_users,
        update_user_endpoint,
        change_own_password,
        delete_user_endpoint
    ]
}
