use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, QueryableByName, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::schools;

#[derive(
    Queryable,
    Selectable,
    Identifiable,
    QueryableByName,
    Debug,
    Clone,
    Serialize,
    Deserialize,
    TS,
)]
#[diesel(table_name = schools)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct School {
    pub id: i32,
    pub name: String,
    pub city: String,
    pub state: String,
    pub director_name: String,
    pub phone: String,
    pub email: String,
    pub polo: i32,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = schools)]
pub struct NewSchool {
    pub name: String,
    pub city: String,
    pub state: String,
    pub director_name: String,
    pub phone: String,
    pub email: String,
    pub polo: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// For API inputs and validation
#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct SchoolInput {
    pub name: String,
    pub city: String,
    pub state: String,
    pub director_name: String,
    pub phone: String,
    pub email: String,
    pub polo: i32,
}
