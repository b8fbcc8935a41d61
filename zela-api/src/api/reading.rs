//! API endpoints for water-consumption readings.
//!
//! # Authorization Rules
//! - District users record and read for any school
//! - School-level users record and read for their own school
//! - Only district users delete readings

use rocket::Route;
use rocket::http::Status;
use rocket::response::{self, status};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::list_query::{Page, PageQuery};
use crate::logged_json::LoggedJson;
use crate::models::{WaterReading, WaterReadingInput};
use crate::orm::reading::{
    delete_reading, get_reading_by_id, insert_reading, month_bounds, search_readings,
    update_reading_notes,
};
use crate::orm::school::get_school_by_id;
use crate::session_guards::{AuthenticatedUser, DistrictUser};

/// Error response structure for reading API failures.
#[derive(Serialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request payload for updating a reading's free-text fields. An empty
/// string clears the field.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UpdateReadingRequest {
    pub justification: Option<String>,
    pub corrective_action: Option<String>,
}

fn normalize_note(value: Option<String>) -> Option<Option<String>> {
    value.map(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Create Water Reading endpoint.
///
/// - **URL:** `/api/1/WaterReadings`
/// - **Method:** `POST`
/// - **Authentication:** Required
/// - **Authorization:** District role, or the school's own users
///
/// Consumption, the allowed limit and the over-limit flag are derived
/// server-side from the latest prior reading of the same month. A
/// second reading for the same school and date answers 409.
#[post("/1/WaterReadings", data = "<new_reading>")]
pub async fn create_reading(
    db: DbConn,
    new_reading: LoggedJson<WaterReadingInput>,
    auth_user: AuthenticatedUser,
) -> Result<status::Created<Json<WaterReading>>, response::status::Custom<Json<ErrorResponse>>> {
    if !auth_user.can_access_school(new_reading.school_id) {
        let err = Json(ErrorResponse {
            error: "Forbidden: insufficient permissions to record readings for this school"
                .to_string(),
        });
        return Err(response::status::Custom(Status::Forbidden, err));
    }

    let recorded_by = auth_user.user.id;
    db.run(move |conn| {
        match get_school_by_id(conn, new_reading.school_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                let err = Json(ErrorResponse {
                    error: format!("School with ID {} does not exist", new_reading.school_id),
                });
                return Err(response::status::Custom(Status::BadRequest, err));
            }
            Err(e) => {
                eprintln!("Error validating school for reading: {:?}", e);
                let err = Json(ErrorResponse {
                    error: "Database error while validating school".to_string(),
                });
                return Err(response::status::Custom(Status::InternalServerError, err));
            }
        }

        if new_reading.population <= 0 {
            let err = Json(ErrorResponse {
                error: "Population must be positive".to_string(),
            });
            return Err(response::status::Custom(Status::UnprocessableEntity, err));
        }

        match insert_reading(conn, new_reading.into_inner(), recorded_by) {
            Ok(reading) => Ok(status::Created::new("/").body(Json(reading))),
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => {
                let err = Json(ErrorResponse {
                    error: "A reading for this school and date already exists".to_string(),
                });
                Err(response::status::Custom(Status::Conflict, err))
            }
            Err(e) => {
                eprintln!("Error creating reading: {:?}", e);
                let err = Json(ErrorResponse {
                    error: "Database error while creating reading".to_string(),
                });
                Err(response::status::Custom(Status::InternalServerError, err))
            }
        }
    })
    .await
}

/// List Water Readings endpoint.
///
/// - **URL:** `/api/1/Schools/<school_id>/WaterReadings`
/// - **Method:** `GET`
/// - **Authentication:** Required
/// - **Authorization:** District role, or the school's own users
///
/// Newest first, paginated. `year` and `month` restrict the list to one
/// calendar month and must be passed together.
#[get("/1/Schools/<school_id>/WaterReadings?<year>&<month>&<query..>")]
pub async fn list_readings(
    db: DbConn,
    school_id: i32,
    auth_user: AuthenticatedUser,
    year: Option<i32>,
    month: Option<u32>,
    query: PageQuery,
) -> Result<Json<Page<WaterReading>>, Status> {
    if !auth_user.can_access_school(school_id) {
        return Err(Status::Forbidden);
    }

    let bounds = match (year, month) {
        (Some(y), Some(m)) => Some(month_bounds(y, m).ok_or(Status::BadRequest)?),
        (None, None) => None,
        _ => return Err(Status::BadRequest),
    };

    db.run(move |conn| {
        let (items, total) =
            search_readings(conn, school_id, bounds, query.limit(), query.offset())
                .map_err(|_| Status::InternalServerError)?;
        Ok(Json(Page::new(items, total, &query)))
    })
    .await
}

/// Update Water Reading endpoint.
///
/// - **URL:** `/api/1/WaterReadings/<reading_id>`
/// - **Method:** `PATCH`
/// - **Authentication:** Required
/// - **Authorization:** District role, or the school's own users
///
/// Only the justification and corrective-action texts can change; the
/// derived figures stay what they were at insert time.
#[patch("/1/WaterReadings/<reading_id>", data = "<update>")]
pub async fn update_reading(
    db: DbConn,
    reading_id: i32,
    update: LoggedJson<UpdateReadingRequest>,
    auth_user: AuthenticatedUser,
) -> Result<Json<WaterReading>, Status> {
    db.run(move |conn| {
        let reading = match get_reading_by_id(conn, reading_id) {
            Ok(Some(reading)) => reading,
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        };

        if !auth_user.can_access_school(reading.school_id) {
            return Err(Status::Forbidden);
        }

        update_reading_notes(
            conn,
            reading_id,
            normalize_note(update.justification.clone()),
            normalize_note(update.corrective_action.clone()),
        )
        .map(Json)
        .map_err(|e| {
            eprintln!("Error updating reading: {:?}", e);
            Status::InternalServerError
        })
    })
    .await
}

/// Delete Water Reading endpoint.
///
/// - **URL:** `/api/1/WaterReadings/<reading_id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
/// - **Authorization:** District role
#[delete("/1/WaterReadings/<reading_id>")]
pub async fn delete_reading_endpoint(
    db: DbConn,
    reading_id: i32,
    _district: DistrictUser,
) -> Result<Status, Status> {
    db.run(move |conn| {
        delete_reading(conn, reading_id)
            .map(|found| if found { Status::NoContent } else { Status::NotFound })
            .map_err(|e| {
                eprintln!("Error deleting reading: {:?}", e);
                Status::InternalServerError
            })
    })
    .await
}

/// Returns a vector of all routes defined in this module.
pub fn routes() -> Vec<Route> {
    routes![
        create_reading,
        list_readings,
        update_reading,
        delete_reading_endpoint
    ]
}
