//! API endpoints for fiscalization campaigns.
//!
//! # Authorization Rules
//! - District users create and delete events and see every response
//! - School-level users see their own response and may mark it answered
//! - Only district users flip the notified flag

use rocket::Route;
use rocket::http::Status;
use rocket::response::{self, status};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::list_query::{Page, PageQuery};
use crate::logged_json::LoggedJson;
use crate::models::{
    InspectionEvent, InspectionEventDetail, InspectionEventInput, InspectionResponse,
};
use crate::orm::inspection::{
    delete_event, get_event_by_id, get_response, get_responses_with_schools, insert_event,
    list_events, update_response_flags,
};
use crate::session_guards::{AuthenticatedUser, DistrictUser};

/// Error response structure for inspection API failures.
#[derive(Serialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request payload for updating a response's flags.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UpdateResponseRequest {
    pub responded: Option<bool>,
    pub notified: Option<bool>,
}

/// Create Inspection Event endpoint.
///
/// - **URL:** `/api/1/Inspections`
/// - **Method:** `POST`
/// - **Authentication:** Required
/// - **Authorization:** District role
///
/// Creates the campaign and one pending response per registered school.
#[post("/1/Inspections", data = "<new_event>")]
pub async fn create_event(
    db: DbConn,
    new_event: LoggedJson<InspectionEventInput>,
    _district: DistrictUser,
) -> Result<status::Created<Json<InspectionEvent>>, response::status::Custom<Json<ErrorResponse>>>
{
    db.run(move |conn| {
        insert_event(conn, new_event.into_inner())
            .map(|event| status::Created::new("/").body(Json(event)))
            .map_err(|e| {
                eprintln!("Error creating inspection event: {:?}", e);
                let err = Json(ErrorResponse {
                    error: "Database error while creating inspection event".to_string(),
                });
                response::status::Custom(Status::InternalServerError, err)
            })
    })
    .await
}

/// List Inspection Events endpoint.
///
/// - **URL:** `/api/1/Inspections`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// Newest reference date first, paginated.
#[get("/1/Inspections?<query..>")]
pub async fn list_events_endpoint(
    db: DbConn,
    _auth_user: AuthenticatedUser,
    query: PageQuery,
) -> Result<Json<Page<InspectionEvent>>, Status> {
    db.run(move |conn| {
        let (items, total) = list_events(conn, query.limit(), query.offset())
            .map_err(|_| Status::InternalServerError)?;
        Ok(Json(Page::new(items, total, &query)))
    })
    .await
}

/// Get Inspection Event endpoint.
///
/// - **URL:** `/api/1/Inspections/<event_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// District users see every school's response; school-level users only
/// their own school's row.
#[get("/1/Inspections/<event_id>")]
pub async fn get_event(
    db: DbConn,
    event_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<InspectionEventDetail>, Status> {
    db.run(move |conn| {
        let event = match get_event_by_id(conn, event_id) {
            Ok(Some(event)) => event,
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        };

        let mut responses =
            get_responses_with_schools(conn, event_id).map_err(|_| Status::InternalServerError)?;

        if !auth_user.is_district() {
            responses.retain(|row| Some(row.response.school_id) == auth_user.user.school_id);
        }

        Ok(Json(InspectionEventDetail { event, responses }))
    })
    .await
}

/// Update Inspection Response endpoint.
///
/// - **URL:** `/api/1/Inspections/<event_id>/Responses/<school_id>`
/// - **Method:** `PATCH`
/// - **Authentication:** Required
/// - **Authorization:** School users mark their own school as having
///   responded; the notified flag is district-only.
#[patch("/1/Inspections/<event_id>/Responses/<school_id>", data = "<update>")]
pub async fn update_response(
    db: DbConn,
    event_id: i32,
    school_id: i32,
    update: LoggedJson<UpdateResponseRequest>,
    auth_user: AuthenticatedUser,
) -> Result<Json<InspectionResponse>, Status> {
    if !auth_user.can_access_school(school_id) {
        return Err(Status::Forbidden);
    }
    if update.notified.is_some() && !auth_user.is_district() {
        return Err(Status::Forbidden);
    }

    db.run(move |conn| {
        match get_response(conn, event_id, school_id) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        }

        update_response_flags(conn, event_id, school_id, update.responded, update.notified)
            .map(Json)
            .map_err(|e| {
                eprintln!("Error updating inspection response: {:?}", e);
                Status::InternalServerError
            })
    })
    .await
}

/// Delete Inspection Event endpoint.
///
/// - **URL:** `/api/1/Inspections/<event_id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
/// - **Authorization:** District role
#[delete("/1/Inspections/<event_id>")]
pub async fn delete_event_endpoint(
    db: DbConn,
    event_id: i32,
    _district: DistrictUser,
) -> Result<Status, Status> {
    db.run(move |conn| {
        delete_event(conn, event_id)
            .map(|found| if found { Status::NoContent } else { Status::NotFound })
            .map_err(|e| {
                eprintln!("Error deleting inspection event: {:?}", e);
                Status::InternalServerError
            })
    })
    .await
}

/// Returns a vector of all routes defined in this module.
pub fn routes() -> Vec<Route> {
    routes![
        create_event,
        list_events_endpoint,
        get_event,
        update_response,
        delete_event_endpoint
    ]
}
