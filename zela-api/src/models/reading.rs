use chrono::{NaiveDate, NaiveDateTime};
use diesel::{Associations, Identifiable, Insertable, Queryable, QueryableByName, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::water_readings;

#[derive(
    Queryable,
    Selectable,
    Identifiable,
    Associations,
    QueryableByName,
    Debug,
    Clone,
    Serialize,
    Deserialize,
    TS,
)]
#[diesel(belongs_to(crate::models::school::School))]
#[diesel(table_name = water_readings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct WaterReading {
    pub id: i32,
    pub school_id: i32,
    #[ts(type = "string")]
    pub reading_date: NaiveDate,
    pub meter_value: f64,
    pub population: i32,
    pub consumption: f64,
    pub daily_limit: f64,
    pub over_limit: bool,
    pub justification: Option<String>,
    pub corrective_action: Option<String>,
    pub recorded_by: i32,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = water_readings)]
pub struct NewWaterReading {
    pub school_id: i32,
    pub reading_date: NaiveDate,
    pub meter_value: f64,
    pub population: i32,
    pub consumption: f64,
    pub daily_limit: f64,
    pub over_limit: bool,
    pub justification: Option<String>,
    pub corrective_action: Option<String>,
    pub recorded_by: i32,
    pub created_at: NaiveDateTime,
}

/// Reading as submitted by the frontend; consumption, limit and the
/// over-limit flag are derived server-side from the previous reading.
#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct WaterReadingInput {
    pub school_id: i32,
    #[ts(type = "string")]
    pub reading_date: NaiveDate,
    pub meter_value: f64,
    pub population: i32,
    pub justification: Option<String>,
    pub corrective_action: Option<String>,
}
