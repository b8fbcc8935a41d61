//! PDF report endpoints.
//!
//! Each endpoint gathers the rows the way the list endpoints do and
//! hands them to [`crate::reports`]. A missing font family on disk is
//! an operational problem, reported as 503.

use rocket::Route;
use rocket::http::{ContentType, Status};

use crate::DbConn;
use crate::models::PERMIT_STAGE;
use crate::orm::inspection::{get_event_by_id, get_responses_with_schools};
use crate::orm::process::{get_permit_granted_at, get_process_by_id, get_stage_history};
use crate::orm::reading::{month_bounds, readings_for_month};
use crate::orm::school::get_school_by_id;
use crate::permit;
use crate::reports::{self, ReportError};
use crate::session_guards::{AuthenticatedUser, DistrictUser};

type PdfResponse = (ContentType, Vec<u8>);

fn report_status(error: ReportError) -> Status {
    match error {
        ReportError::Font(e) => {
            error!("Report fonts unavailable: {}", e);
            Status::ServiceUnavailable
        }
        ReportError::Render(e) => {
            error!("Report rendering failed: {}", e);
            Status::InternalServerError
        }
    }
}

/// Monthly Water Report endpoint.
///
/// - **URL:** `/api/1/Reports/water/<school_id>?year&month`
/// - **Method:** `GET`
/// - **Authentication:** Required
/// - **Authorization:** District role, or the school's own users
#[get("/1/Reports/water/<school_id>?<year>&<month>")]
pub async fn water_report(
    db: DbConn,
    school_id: i32,
    year: i32,
    month: u32,
    auth_user: AuthenticatedUser,
) -> Result<PdfResponse, Status> {
    if !auth_user.can_access_school(school_id) {
        return Err(Status::Forbidden);
    }

    let (start, end) = month_bounds(year, month).ok_or(Status::BadRequest)?;

    db.run(move |conn| {
        let school = match get_school_by_id(conn, school_id) {
            Ok(Some(school)) => school,
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        };

        let readings = readings_for_month(conn, school_id, start, end)
            .map_err(|_| Status::InternalServerError)?;

        reports::water_report(&school, year, month, &readings)
            .map(|bytes| (ContentType::PDF, bytes))
            .map_err(report_status)
    })
    .await
}

/// Process Report endpoint.
///
/// - **URL:** `/api/1/Reports/processes/<process_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
/// - **Authorization:** District role, or the process school's users
#[get("/1/Reports/processes/<process_id>")]
pub async fn process_report(
    db: DbConn,
    process_id: i32,
    auth_user: AuthenticatedUser,
) -> Result<PdfResponse, Status> {
    db.run(move |conn| {
        let process = match get_process_by_id(conn, process_id) {
            Ok(Some(process)) => process,
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        };

        if !auth_user.can_access_school(process.school_id) {
            return Err(Status::Forbidden);
        }

        let school_name = get_school_by_id(conn, process.school_id)
            .map_err(|_| Status::InternalServerError)?
            .map(|school| school.name)
            .unwrap_or_default();
        let history =
            get_stage_history(conn, process_id).map_err(|_| Status::InternalServerError)?;

        let permit = if process.stage >= PERMIT_STAGE {
            get_permit_granted_at(conn, process_id)
                .map_err(|_| Status::InternalServerError)?
                .map(|granted| permit::status(granted.date(), chrono::Utc::now().date_naive()))
        } else {
            None
        };

        reports::process_report(&process, &school_name, &history, permit.as_ref())
            .map(|bytes| (ContentType::PDF, bytes))
            .map_err(report_status)
    })
    .await
}

/// Inspection Report endpoint.
///
/// - **URL:** `/api/1/Reports/inspections/<event_id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
/// - **Authorization:** District role (the campaign overview spans all
///   schools)
#[get("/1/Reports/inspections/<event_id>")]
pub async fn inspection_report(
    db: DbConn,
    event_id: i32,
    _district: DistrictUser,
) -> Result<PdfResponse, Status> {
    db.run(move |conn| {
        let event = match get_event_by_id(conn, event_id) {
            Ok(Some(event)) => event,
            Ok(None) => return Err(Status::NotFound),
            Err(_) => return Err(Status::InternalServerError),
        };

        let responses =
            get_responses_with_schools(conn, event_id).map_err(|_| Status::InternalServerError)?;

        reports::inspection_report(&event, &responses)
            .map(|bytes| (ContentType::PDF, bytes))
            .map_err(report_status)
    })
    .await
}

/// Returns a vector of all routes defined in this module.
pub fn routes() -> Vec<Route> {
    routes![water_report, process_report, inspection_report]
}
