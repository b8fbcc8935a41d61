use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::users;

/// District-level role: full access across all schools.
pub const ROLE_DISTRICT: &str = "district";
/// School-level role: access restricted to the linked school.
pub const ROLE_SCHOOL: &str = "school";

/// Returns true when `role` names one of the two fixed roles.
pub fn is_valid_role(role: &str) -> bool {
    role == ROLE_DISTRICT || role == ROLE_SCHOOL
}

#[derive(Deserialize, Queryable, Identifiable, QueryableByName, Debug, Clone, Serialize, TS)]
#[diesel(table_name = users)]
#[ts(export)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String, // Will be unique
    pub password_hash: String,
    pub role: String,
    pub school_id: Option<i32>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn is_district(&self) -> bool {
        self.role == ROLE_DISTRICT
    }
}

#[derive(Insertable, Deserialize)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub school_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Pre-hash user data as accepted by the ORM layer.
#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub school_id: Option<i32>,
}

/// User representation returned by the API (never carries the hash).
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub school_id: Option<i32>,
    pub school_name: Option<String>,
}

impl UserSummary {
    pub fn from_user(user: User, school_name: Option<String>) -> Self {
        UserSummary {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            school_id: user.school_id,
            school_name,
        }
    }
}
