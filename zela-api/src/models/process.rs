use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, QueryableByName, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{custodian_processes, process_stage_events};

/// First stage of the zeladoria workflow.
pub const STAGE_MIN: i32 = 1;
/// Final stage of the zeladoria workflow.
pub const STAGE_MAX: i32 = 7;
/// Stage whose completion date anchors the occupancy-permit validity window.
pub const PERMIT_STAGE: i32 = 6;

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
#[diesel(table_name = custodian_processes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct CustodianProcess {
    pub id: i32,
    pub school_id: i32,
    pub custodian_name: String,
    pub custodian_cpf: String,
    pub custodian_role: String,
    pub sei_number: String,
    pub stage: i32,
    pub exempt_from_payment: bool,
    pub archived: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = custodian_processes)]
pub struct NewCustodianProcess {
    pub school_id: i32,
    pub custodian_name: String,
    pub custodian_cpf: String,
    pub custodian_role: String,
    pub sei_number: String,
    pub stage: i32,
    pub exempt_from_payment: bool,
    pub archived: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// For API inputs and validation
#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct CustodianProcessInput {
    pub school_id: i32,
    pub custodian_name: String,
    pub custodian_cpf: String,
    pub custodian_role: String,
    pub sei_number: String,
    pub exempt_from_payment: Option<bool>,
}

/// Completion record for a single stage of a process.
#[derive(
    Queryable, Selectable, Identifiable, Associations, Debug, Clone, Serialize, Deserialize, TS,
)]
#[diesel(belongs_to(CustodianProcess, foreign_key = process_id))]
#[diesel(table_name = process_stage_events)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct ProcessStageEvent {
    pub id: i32,
    pub process_id: i32,
    pub stage: i32,
    #[ts(type = "string")]
    pub completed_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = process_stage_events)]
pub struct NewProcessStageEvent {
    pub process_id: i32,
    pub stage: i32,
    pub completed_at: NaiveDateTime,
}

/// Process detail as returned by the API: row plus stage history and,
/// once stage 6 is complete, the permit validity status.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct CustodianProcessDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub process: CustodianProcess,
    pub school_name: String,
    pub stage_history: Vec<ProcessStageEvent>,
    pub permit: Option<crate::permit::PermitStatus>,
}
