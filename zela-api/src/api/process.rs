//! API endpoints for custodian (zeladoria) processes.
//!
//! # Authorization Rules
//! - District users manage processes for any school
//! - School-level users read the processes of their own school

use chrono::{NaiveDateTime, Utc};
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
    CustodianProcess, CustodianProcessDetail, CustodianProcessInput, PERMIT_STAGE,
};
use crate::orm::process::{
    ProcessFilter, delete_process, get_permit_granted_at, get_process_by_id, get_stage_history,
    insert_process, search_processes, set_stage, update_process,
};
use crate::orm::school::get_school_by_id;
use crate::permit;
use crate::session_guards::{AuthenticatedUser, DistrictUser};

/// Error response structure for process API failures.
#[derive(Serialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request payload for updating a process (all fields optional).
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UpdateProcessRequest {
    pub custodian_name: Option<String>,
    pub custodian_cpf: Option<String>,
    pub custodian_role: Option<String>,
    pub sei_number: Option<String>,
    pub exempt_from_payment: Option<bool>,
    pub archived: Option<bool>,
}

/// Request payload for moving a process to a stage.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct SetStageRequest {
    pub stage: i32,
    /// Completion timestamp; defaults to now.
    #[ts(type = "string | null")]
    pub completed_at: Option<NaiveDateTime>,
}

/// Assembles the detail response: stage history plus permit status once
/// stage 6 was completed.
fn build_detail(
    conn: &mut diesel::SqliteConnection,
    process: CustodianProcess,
) -> Result<CustodianProcessDetail, diesel::result::Error> {
    let school_name = get_school_by_id(conn, process.school_id)?
        .map(|school| school.name)
        .unwrap_or_default();
    let stage_history = get_stage_history(conn, process.id)?;

    let permit = if process.stage >= PERMIT_STAGE {
        get_permit_granted_at(conn, process.id)?
            .map(|granted| permit::status(granted.date(), Utc::now().date_naive()))
    } else {
        None
    };

    Ok(CustodianProcessDetail {
        process,
        school_name,
        stage_history,
        permit,
    })
}

/// Create Process endpoint.
///
/// - **URL:** `/api/1/Processes`
/// - **Method:** `POST`
/// - **Authentication:** Required
/// - **Authorization:** District role
///
/// The process starts at stage 1 with its completion recorded.
#[post("/1/Processes", data = "<new_process>")]
pub async fn create_process(
    db: DbConn,
    new_process: LoggedJson<CustodianProcessInput>,
    _district: DistrictUser,
) -> Result<status::Created<Json<CustodianProcess>>, response::status::Custom<Json<ErrorResponse>>>
{
    db.run(move |conn| {
        match get_school_by_id(conn, new_process.school_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                let err = Json(ErrorResponse {
                    error: format!("School with ID {} does not exist", new_process.school_id),
                });
                return Err(response::status::Custom(Status::BadRequest, err));
            }
            Err(e) => {
                eprintln!("Error validating school for process creation: {:?}", e);
                let err = Json(ErrorResponse {
                    error: "Database error while validating school".to_string(),
                });
                return Err(response::status::Custom(Status::InternalServerError, err));
            }
        }

        insert_process(conn, new_process.into_inner())
            .map(|process| status::Created::new("/").body(Json(process)))
            .map_err(|e| {
                eprintln!("Error creating process: {:?}", e);
                let err = Json(ErrorResponse {
                    error: "Database error while creating process".to_string(),
                });
                response::status::Custom(Status::InternalServerError, err)
            })
    })
    .await
}

/// List Processes endpoint.
///
/// - **URL:** `/api/1/Processes`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// Paginated, newest first. Filters: `school_id`, `stage`, `archived`
/// and a free-text `search` over custodian name, CPF and SEI number.
/// School-level users are pinned to their own school.
#[get("/1/Processes?<school_id>&<stage>&<archived>&<search>&<query..>")]
pub async fn list_processes(
    db: DbConn,
    auth_user: AuthenticatedUser,
    school_id: Option<i32>,
    stage: Option<i32>,
    archived: Option<bool>,
    search: Option<String>,
    query: PageQuery,
) -> Result<Json<Page<CustodianProcess>>, Status> {
    let school_id = if auth_user.is_district() {
        school_id
    } else {
        match (auth_user.user.school_id, school_id) {
            (Some(own), None) => Some(own),
            (Some(own), Some(requested)) if requested == own => Some(own),
            _ => return Err(Status::Forbidden),
        }
    };

    db.run(move |conn| {
        let filter = ProcessFilter {
            school_id,
            stage,
            archived,
            search,
        };
        let (items, total) = search_processes(conn, &filter, query.limit(), query.offset())
            .map_err(|_| Status::InternalServerError)?;
        Ok(Json(Page::new(items, total, &query)))
    })
    .await
}

/// Get Process endpoint.
///
/// - **URL:** `/api/1/Processes/<process_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
/// - **Authorization:** District role, or the process school's users
///
/// Returns the process with its stage history and, once stage 6 was
/// completed, the permit validity status.
#[get("/1/Processes/<process_id>")]
pub async fn get_process(
    db: DbConn,
    process_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<Json<CustodianProcessDetail>, Status> {
    db.run(move |conn| {
        let process = match get_process_by_id(conn, process_id) {
            Ok(Some(process)) => process,
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        };

        if !auth_user.can_access_school(process.school_id) {
            return Err(Status::Forbidden);
        }

        build_detail(conn, process)
            .map(Json)
            .map_err(|_| Status::InternalServerError)
    })
    .await
}

/// Update Process endpoint.
///
/// - **URL:** `/api/1/Processes/<process_id>`
/// - **Method:** `PATCH`
/// - **Authentication:** Required
/// - **Authorization:** District role
///
/// Covers the descriptive fields plus the payment-exemption and
/// archived flags; the stage moves through the dedicated endpoint.
#[patch("/1/Processes/<process_id>", data = "<update>")]
pub async fn update_process_endpoint(
    db: DbConn,
    process_id: i32,
    update: LoggedJson<UpdateProcessRequest>,
    _district: DistrictUser,
) -> Result<Json<CustodianProcess>, Status> {
    db.run(move |conn| {
        match get_process_by_id(conn, process_id) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        }

        update_process(
            conn,
            process_id,
            update.custodian_name.clone(),
            update.custodian_cpf.clone(),
            update.custodian_role.clone(),
            update.sei_number.clone(),
            update.exempt_from_payment,
            update.archived,
        )
        .map(Json)
        .map_err(|e| {
            eprintln!("Error updating process: {:?}", e);
            Status::InternalServerError
        })
    })
    .await
}

/// Set Process Stage endpoint.
///
/// - **URL:** `/api/1/Processes/<process_id>/stage`
/// - **Method:** `PUT`
/// - **Authentication:** Required
/// - **Authorization:** District role
///
/// Moves the process and records the stage's completion timestamp.
/// Stages outside 1-7 answer 422.
#[put("/1/Processes/<process_id>/stage", data = "<request>")]
pub async fn set_process_stage(
    db: DbConn,
    process_id: i32,
    request: LoggedJson<SetStageRequest>,
    _district: DistrictUser,
) -> Result<Json<CustodianProcess>, Status> {
    db.run(move |conn| {
        match get_process_by_id(conn, process_id) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        }

        match set_stage(conn, process_id, request.stage, request.completed_at) {
            Ok(Ok(process)) => Ok(Json(process)),
            Ok(Err(_out_of_range)) => Err(Status::UnprocessableEntity),
            Err(e) => {
                eprintln!("Error setting process stage: {:?}", e);
                Err(Status::InternalServerError)
            }
        }
    })
    .await
}

/// Delete Process endpoint.
///
/// - **URL:** `/api/1/Processes/<process_id>`
/// - **Method:** `DELETE`
/// - **Authentication:** Required
/// - **Authorization:** District role
#[delete("/1/Processes/<process_id>")]
pub async fn delete_process_endpoint(
    db: DbConn,
    process_id: i32,
    _district: DistrictUser,
) -> Result<Status, Status> {
    db.run(move |conn| {
        delete_process(conn, process_id)
            .map(|found| if found { Status::NoContent } else { Status::NotFound })
            .map_err(|e| {
                eprintln!("Error deleting process: {:?}", e);
                Status::InternalServerError
            })
    })
    .await
}

/// Returns a vector of all routes defined in this module.
pub fn routes() -> Vec<Route> {
    routes![
        create_process,
        list_processes,
        get_process,
        update_process_endpoint,
        set_process_stage,
        delete_process_endpoint
    ]
}
