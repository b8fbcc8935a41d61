use chrono::{NaiveDate, NaiveDateTime};
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{inspection_events, inspection_responses};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = inspection_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct InspectionEvent {
    pub id: i32,
    #[ts(type = "string")]
    pub reference_date: NaiveDate,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = inspection_events)]
pub struct NewInspectionEvent {
    pub reference_date: NaiveDate,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct InspectionEventInput {
    #[ts(type = "string")]
    pub reference_date: NaiveDate,
    pub description: Option<String>,
}

#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(InspectionEvent, foreign_key = event_id))]
#[diesel(belongs_to(crate::models::school::School))]
#[diesel(table_name = inspection_responses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct InspectionResponse {
    pub id: i32,
    pub event_id: i32,
    pub school_id: i32,
    pub responded: bool,
    pub notified: bool,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = inspection_responses)]
pub struct NewInspectionResponse {
    pub event_id: i32,
    pub school_id: i32,
    pub responded: bool,
    pub notified: bool,
    pub updated_at: NaiveDateTime,
}

/// Response row joined with its school name for list displays.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct InspectionResponseWithSchool {
    #[serde(flatten)]
    #[ts(flatten)]
    pub response: InspectionResponse,
    pub school_name: String,
}

/// Event detail as returned by the API.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct InspectionEventDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub event: InspectionEvent,
    pub responses: Vec<InspectionResponseWithSchool>,
}
