//! API endpoints for the school registry.
//!
//! # Authorization Rules
//! - District users manage the registry and see every school
//! - School-level users only read their own school

use rocket::Route;
use rocket::http::Status;
use rocket::response::{self, status};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::list_query::{Page, PageQuery};
use crate::logged_json::LoggedJson;
use crate::models::{School, SchoolInput};
use crate::orm::school::{
    SchoolFilter, delete_school, get_school_by_id, get_school_by_name_case_insensitive,
    insert_school, school_is_referenced, search_schools, update_school,
};
use crate::session_guards::{AuthenticatedUser, DistrictUser};

/// Error response structure for school API failures.
#[derive(Serialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request payload for updating a school (all fields optional).
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UpdateSchoolRequest {
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub director_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub polo: Option<i32>,
}

/// Create School endpoint.
///
/// - **URL:** `/api/1/Schools`
/// - **Method:** `POST`
/// - **Authentication:** Required
/// - **Authorization:** District role
///
/// The school name must be unique (case-insensitive).
#[post("/1/Schools", data = "<new_school>")]
pub async fn create_school(
    db: DbConn,
    new_school: LoggedJson<SchoolInput>,
    _district: DistrictUser,
) -> Result<status::Created<Json<School>>, response::status::Custom<Json<ErrorResponse>>> {
    db.run(move |conn| {
        if new_school.name.trim().is_empty() {
            let err = Json(ErrorResponse {
                error: "School name must not be empty".to_string(),
            });
            return Err(response::status::Custom(Status::BadRequest, err));
        }

        match get_school_by_name_case_insensitive(conn, &new_school.name) {
            Ok(Some(_existing)) => {
                let err = Json(ErrorResponse {
                    error: format!("School with name '{}' already exists", new_school.name),
                });
                return Err(response::status::Custom(Status::Conflict, err));
            }
            Ok(None) => {}
            Err(e) => {
                eprintln!("Error checking for existing school: {:?}", e);
                let err = Json(ErrorResponse {
                    error: "Database error while checking for existing school".to_string(),
                });
                return Err(response::status::Custom(Status::InternalServerError, err));
            }
        }

        insert_school(conn, new_school.into_inner())
            .map(|school| status::Created::new("/").body(Json(school)))
            .map_err(|e| {
                eprintln!("Error creating school: {:?}", e);
                let err = Json(ErrorResponse {
                    error: "Database error while creating school".to_string(),
                });
                response::status::Custom(Status::InternalServerError, err)
            })
    })
    .await
}

/// List Schools endpoint.
///
/// - **URL:** `/api/1/Schools`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// District users get the filtered registry (polo, city, state and a
/// free-text search over name and director); school-level users get a
/// single-item page with their own school.
#[get("/1/Schools?<polo>&<city>&<state>&<search>&<query..>")]
pub async fn list_schools(
    db: DbConn,
    auth_user: AuthenticatedUser,
    polo: Option<i32>,
    city: Option<String>,
    state: Option<String>,
    search: Option<String>,
    query: PageQuery,
) -> Result<Json<Page<School>>, Status> {
    if !auth_user.is_district() {
        let Some(school_id) = auth_user.user.school_id else {
            return Err(Status::Forbidden);
        };
        let school = db
            .run(move |conn| get_school_by_id(conn, school_id))
            .await
            .map_err(|_| Status::InternalServerError)?;
        let items: Vec<School> = school.into_iter().collect();
        let total = items.len() as i64;
        return Ok(Json(Page::new(items, total, &query)));
    }

    db.run(move |conn| {
        let filter = SchoolFilter {
            polo,
            city,
            state,
            search,
        };
        let (items, total) = search_schools(conn, &filter, query.limit(), query.offset())
            .map_err(|_| Status::InternalServerError)?;
        Ok(Json(Page::new(items, total, &query)))
    })
    .await
}

/// Get School endpoint.
///
/// - **URL:** `/api/1/Schools/<school_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
/// - **Authorization:** District role, or the school's own users
#[get("/1/Schools/<school_id>")]
pub async fn get_school(
    db: DbConn,
    school_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<School>, Status> {
    if !auth_user.can_access_school(school_id) {
        return Err(Status::Forbidden);
    }

    db.run(move |conn| {
        match get_school_by_id(conn, school_id) {
            Ok(Some(school)) => Ok(Json(school)),
            Ok(None) => Err(Status::NotFound),
            Err(_) => Err(Status::InternalServerError),
        }
    })
    .await
}

/// Update School endpoint.
///
/// - **URL:** `/api/1/Schools/<school_id>`
/// - **Method:** `PATCH`
/// - **Authentication:** Required
/// - **Authorization:** District role
#[patch("/1/Schools/<school_id>", data = "<update>")]
pub async fn update_school_endpoint(
    db: DbConn,
    school_id: i32,
    update: LoggedJson<UpdateSchoolRequest>,
    _district: DistrictUser,
) -> Result<Json<School>, Status> {
    db.run(move |conn| {
        match get_school_by_id(conn, school_id) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        }

        update_school(
            conn,
            school_id,
            update.name.clone(),
            update.city.clone(),
            update.state.clone(),
            update.director_name.clone(),
            update.phone.clone(),
            update.email.clone(),
            update.polo,
        )
        .map(Json)
        .map_err(|e| {
            eprintln!("Error updating school: {:?}", e);
            Status::InternalServerError
        })
    })
    .await
}

/// Delete School endpoint.
///
/// - **URL:** `/api/1/Schools/<school_id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
/// - **Authorization:** District role
///
/// A school that still has processes, readings, users or inspection
/// responses attached cannot be removed and answers 409.
#[delete("/1/Schools/<school_id>")]
pub async fn delete_school_endpoint(
    db: DbConn,
    school_id: i32,
    _district: DistrictUser,
) -> Result<Status, Status> {
    db.run(move |conn| {
        match school_is_referenced(conn, school_id) {
            Ok(true) => return Err(Status::Conflict),
            Ok(false) => {}
            Err(_) => return Err(Status::InternalServerError),
        }

        match delete_school(conn, school_id) {
            Ok(true) => Ok(Status::NoContent),
            Ok(false) => Err(Status::NotFound),
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                _,
            )) => Err(Status::Conflict),
            Err(e) => {
                eprintln!("Error deleting school: {:?}", e);
                Err(Status::InternalServerError)
            }
        }
    })
    .await
}

/// Returns a vector of all routes defined in this module.
pub fn routes() -> Vec<Route> {
    routes![
        create_school,
        list_schools,
        get_school,
        update_school_endpoint,
        delete_school_endpoint
    ]
}
