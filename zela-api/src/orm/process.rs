//! Database operations for custodian (zeladoria) processes.
//!
//! A process walks through stages 1-7; each completed stage is recorded
//! as a `process_stage_events` row so the frontend can show when every
//! step happened. Completing stage 6 anchors the occupancy-permit
//! validity window handled by [`crate::permit`].

use chrono::{NaiveDateTime, Utc};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::models::{
    CustodianProcess, CustodianProcessInput, NewCustodianProcess, NewProcessStageEvent,
    PERMIT_STAGE, ProcessStageEvent, STAGE_MAX, STAGE_MIN,
};

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    last_insert_rowid: i64,
}

/// Filter options for the process list.
#[derive(Debug, Default, Clone)]
pub struct ProcessFilter {
    pub school_id: Option<i32>,
    pub stage: Option<i32>,
    pub archived: Option<bool>,
    /// Free-text match against custodian name, CPF or SEI number.
    pub search: Option<String>,
}

/// Inserts a new process at stage 1 and records the stage-1 event.
pub fn insert_process(
    conn: &mut SqliteConnection,
    input: CustodianProcessInput,
) -> Result<CustodianProcess, diesel::result::Error> {
    use crate::schema::custodian_processes::dsl::*;

    let now = Utc::now().naive_utc();
    let new_process = NewCustodianProcess {
        school_id: input.school_id,
        custodian_name: input.custodian_name,
        custodian_cpf: input.custodian_cpf,
        custodian_role: input.custodian_role,
        sei_number: input.sei_number,
        stage: STAGE_MIN,
        exempt_from_payment: input.exempt_from_payment.unwrap_or(false),
        archived: false,
        created_at: now,
        updated_at: now,
    };

    conn.transaction(|conn| {
        diesel::insert_into(custodian_processes)
            .values(&new_process)
            .execute(conn)?;

        let last_id = diesel::sql_query("SELECT last_insert_rowid() as last_insert_rowid")
            .get_result::<LastInsertRowId>(conn)?
            .last_insert_rowid;

        record_stage_event(conn, last_id as i32, STAGE_MIN, now)?;

        custodian_processes
            .filter(id.eq(last_id as i32))
            .first::<CustodianProcess>(conn)
    })
}

/// Try to find a process by id.
pub fn get_process_by_id(
    conn: &mut SqliteConnection,
    process_id: i32,
) -> Result<Option<CustodianProcess>, diesel::result::Error> {
    use crate::schema::custodian_processes::dsl::*;
    custodian_processes
        .filter(id.eq(process_id))
        .first::<CustodianProcess>(conn)
        .optional()
}

/// One page of processes matching the filter, with the total match count.
pub fn search_processes(
    conn: &mut SqliteConnection,
    filter: &ProcessFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<CustodianProcess>, i64), diesel::result::Error> {
    let items = filtered_query(filter)
        .order(crate::schema::custodian_processes::dsl::id.desc())
        .limit(limit)
        .offset(offset)
        .load::<CustodianProcess>(conn)?;

    let total = filtered_query(filter).count().get_result::<i64>(conn)?;

    Ok((items, total))
}

fn filtered_query<'a>(
    filter: &ProcessFilter,
) -> crate::schema::custodian_processes::BoxedQuery<'a, diesel::sqlite::Sqlite> {
    use crate::schema::custodian_processes::dsl::*;

    let mut query = custodian_processes.into_boxed();
    if let Some(school_val) = filter.school_id {
        query = query.filter(school_id.eq(school_val));
    }
    if let Some(stage_val) = filter.stage {
        query = query.filter(stage.eq(stage_val));
    }
    if let Some(archived_val) = filter.archived {
        query = query.filter(archived.eq(archived_val));
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", term);
        query = query.filter(
            custodian_name
                .like(pattern.clone())
                .or(custodian_cpf.like(pattern.clone()))
                .or(sei_number.like(pattern)),
        );
    }
    query
}

/// Updates a process's descriptive fields. Only provided fields change.
pub fn update_process(
    conn: &mut SqliteConnection,
    process_id: i32,
    new_custodian_name: Option<String>,
    new_custodian_cpf: Option<String>,
    new_custodian_role: Option<String>,
    new_sei_number: Option<String>,
    new_exempt: Option<bool>,
    new_archived: Option<bool>,
) -> Result<CustodianProcess, diesel::result::Error> {
    use crate::schema::custodian_processes::dsl::*;

    if let Some(val) = new_custodian_name {
        diesel::update(custodian_processes.filter(id.eq(process_id)))
            .set(custodian_name.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_custodian_cpf {
        diesel::update(custodian_processes.filter(id.eq(process_id)))
            .set(custodian_cpf.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_custodian_role {
        diesel::update(custodian_processes.filter(id.eq(process_id)))
            .set(custodian_role.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_sei_number {
        diesel::update(custodian_processes.filter(id.eq(process_id)))
            .set(sei_number.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_exempt {
        diesel::update(custodian_processes.filter(id.eq(process_id)))
            .set(exempt_from_payment.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_archived {
        diesel::update(custodian_processes.filter(id.eq(process_id)))
            .set(archived.eq(val))
            .execute(conn)?;
    }

    diesel::update(custodian_processes.filter(id.eq(process_id)))
        .set(updated_at.eq(Utc::now().naive_utc()))
        .execute(conn)?;

    custodian_processes
        .filter(id.eq(process_id))
        .first::<CustodianProcess>(conn)
}

/// Error returned when a stage number falls outside 1-7.
#[derive(Debug, PartialEq, Eq)]
pub struct StageOutOfRange(pub i32);

/// Moves a process to `new_stage` and records (or refreshes) the
/// completion timestamp for that stage.
pub fn set_stage(
    conn: &mut SqliteConnection,
    process_id: i32,
    new_stage: i32,
    completed_at: Option<NaiveDateTime>,
) -> Result<Result<CustodianProcess, StageOutOfRange>, diesel::result::Error> {
    use crate::schema::custodian_processes::dsl::*;

    if !(STAGE_MIN..=STAGE_MAX).contains(&new_stage) {
        return Ok(Err(StageOutOfRange(new_stage)));
    }

    let when = completed_at.unwrap_or_else(|| Utc::now().naive_utc());

    let process = conn.transaction(|conn| {
        diesel::update(custodian_processes.filter(id.eq(process_id)))
            .set((stage.eq(new_stage), updated_at.eq(Utc::now().naive_utc())))
            .execute(conn)?;

        record_stage_event(conn, process_id, new_stage, when)?;

        custodian_processes
            .filter(id.eq(process_id))
            .first::<CustodianProcess>(conn)
    })?;

    Ok(Ok(process))
}

/// Inserts or replaces the completion event for one stage of a process.
fn record_stage_event(
    conn: &mut SqliteConnection,
    target_process_id: i32,
    target_stage: i32,
    when: NaiveDateTime,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::process_stage_events::dsl::*;

    diesel::replace_into(process_stage_events)
        .values(&NewProcessStageEvent {
            process_id: target_process_id,
            stage: target_stage,
            completed_at: when,
        })
        .execute(conn)
}

/// All completed-stage events of a process, in stage order.
pub fn get_stage_history(
    conn: &mut SqliteConnection,
    target_process_id: i32,
) -> Result<Vec<ProcessStageEvent>, diesel::result::Error> {
    use crate::schema::process_stage_events::dsl::*;
    process_stage_events
        .filter(process_id.eq(target_process_id))
        .order(stage.asc())
        .load::<ProcessStageEvent>(conn)
}

/// Completion timestamp of stage 6, the permit grant date, if the
/// process has reached it.
pub fn get_permit_granted_at(
    conn: &mut SqliteConnection,
    target_process_id: i32,
) -> Result<Option<NaiveDateTime>, diesel::result::Error> {
    use crate::schema::process_stage_events::dsl::*;
    process_stage_events
        .filter(process_id.eq(target_process_id))
        .filter(stage.eq(PERMIT_STAGE))
        .select(completed_at)
        .first::<NaiveDateTime>(conn)
        .optional()
}

/// Deletes a process by id; stage events cascade.
/// Returns Ok(true) if the process was found and deleted.
pub fn delete_process(
    conn: &mut SqliteConnection,
    process_id: i32,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::custodian_processes::dsl::*;
    let rows_affected =
        diesel::delete(custodian_processes.filter(id.eq(process_id))).execute(conn)?;
    Ok(rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::school::insert_school;
    use crate::orm::testing::{sample_school_input, setup_test_db};

    fn process_input(school: i32, custodian: &str, sei: &str) -> CustodianProcessInput {
        CustodianProcessInput {
            school_id: school,
            custodian_name: custodian.to_string(),
            custodian_cpf: "123.456.789-00".to_string(),
            custodian_role: "Zelador".to_string(),
            sei_number: sei.to_string(),
            exempt_from_payment: None,
        }
    }

    #[test]
    fn test_insert_records_stage_one() {
        let mut conn = setup_test_db();
        let school = insert_school(&mut conn, sample_school_input("EM Anexa", 1)).unwrap();
        let process =
            insert_process(&mut conn, process_input(school.id, "Maria", "SEI-001")).unwrap();

        assert_eq!(process.stage, STAGE_MIN);
        assert!(!process.archived);

        let history = get_stage_history(&mut conn, process.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].stage, STAGE_MIN);
    }

    #[test]
    fn test_set_stage_validates_range() {
        let mut conn = setup_test_db();
        let school = insert_school(&mut conn, sample_school_input("EM Anexa", 1)).unwrap();
        let process =
            insert_process(&mut conn, process_input(school.id, "Maria", "SEI-001")).unwrap();

        let result = set_stage(&mut conn, process.id, 8, None).unwrap();
        assert_eq!(result.unwrap_err(), StageOutOfRange(8));

        let result = set_stage(&mut conn, process.id, 0, None).unwrap();
        assert_eq!(result.unwrap_err(), StageOutOfRange(0));

        let process = set_stage(&mut conn, process.id, 3, None).unwrap().unwrap();
        assert_eq!(process.stage, 3);
    }

    #[test]
    fn test_stage_six_sets_permit_grant_date() {
        let mut conn = setup_test_db();
        let school = insert_school(&mut conn, sample_school_input("EM Anexa", 1)).unwrap();
        let process =
            insert_process(&mut conn, process_input(school.id, "Maria", "SEI-001")).unwrap();

        assert!(get_permit_granted_at(&mut conn, process.id).unwrap().is_none());

        let when = chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        set_stage(&mut conn, process.id, PERMIT_STAGE, Some(when))
            .unwrap()
            .unwrap();

        assert_eq!(get_permit_granted_at(&mut conn, process.id).unwrap(), Some(when));

        // Re-completing the stage refreshes the timestamp instead of failing.
        let later = when + chrono::Duration::days(1);
        set_stage(&mut conn, process.id, PERMIT_STAGE, Some(later))
            .unwrap()
            .unwrap();
        assert_eq!(get_permit_granted_at(&mut conn, process.id).unwrap(), Some(later));
    }

    #[test]
    fn test_search_processes_filters() {
        let mut conn = setup_test_db();
        let school_a = insert_school(&mut conn, sample_school_input("EM A", 1)).unwrap();
        let school_b = insert_school(&mut conn, sample_school_input("EM B", 2)).unwrap();

        insert_process(&mut conn, process_input(school_a.id, "Maria Silva", "SEI-001")).unwrap();
        insert_process(&mut conn, process_input(school_b.id, "Joao Souza", "SEI-002")).unwrap();

        let filter = ProcessFilter {
            school_id: Some(school_a.id),
            ..Default::default()
        };
        let (items, total) = search_processes(&mut conn, &filter, 20, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].custodian_name, "Maria Silva");

        let filter = ProcessFilter {
            search: Some("SEI-002".to_string()),
            ..Default::default()
        };
        let (_, total) = search_processes(&mut conn, &filter, 20, 0).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_delete_cascades_stage_events() {
        let mut conn = setup_test_db();
        let school = insert_school(&mut conn, sample_school_input("EM A", 1)).unwrap();
        let process =
            insert_process(&mut conn, process_input(school.id, "Maria", "SEI-001")).unwrap();
        set_stage(&mut conn, process.id, 2, None).unwrap().unwrap();

        assert!(delete_process(&mut conn, process.id).unwrap());
        assert!(get_process_by_id(&mut conn, process.id).unwrap().is_none());
        assert!(get_stage_history(&mut conn, process.id).unwrap().is_empty());
    }
}
