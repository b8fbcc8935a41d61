//! Database operations for fiscalization campaigns.
//!
//! Creating an inspection event fans out one response row per
//! registered school; schools then mark themselves as having responded
//! and the district marks who was notified.

use chrono::Utc;
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::models::{
    InspectionEvent, InspectionEventInput, InspectionResponse, InspectionResponseWithSchool,
    NewInspectionEvent, NewInspectionResponse,
};

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    last_insert_rowid: i64,
}

/// Inserts an inspection event and one pending response per school, in
/// a single transaction.
pub fn insert_event(
    conn: &mut SqliteConnection,
    input: InspectionEventInput,
) -> Result<InspectionEvent, diesel::result::Error> {
    use crate::schema::inspection_events::dsl::*;
    use crate::schema::inspection_responses;

    let now = Utc::now().naive_utc();
    let new_event = NewInspectionEvent {
        reference_date: input.reference_date,
        description: input.description,
        created_at: now,
    };

    conn.transaction(|conn| {
        diesel::insert_into(inspection_events)
            .values(&new_event)
            .execute(conn)?;

        let last_id = diesel::sql_query("SELECT last_insert_rowid() as last_insert_rowid")
            .get_result::<LastInsertRowId>(conn)?
            .last_insert_rowid;

        let schools = crate::orm::school::get_all_schools(conn)?;
        let responses: Vec<NewInspectionResponse> = schools
            .iter()
            .map(|school| NewInspectionResponse {
                event_id: last_id as i32,
                school_id: school.id,
                responded: false,
                notified: false,
                updated_at: now,
            })
            .collect();

        diesel::insert_into(inspection_responses::table)
            .values(&responses)
            .execute(conn)?;

        inspection_events
            .filter(id.eq(last_id as i32))
            .first::<InspectionEvent>(conn)
    })
}

/// Try to find an event by id.
pub fn get_event_by_id(
    conn: &mut SqliteConnection,
    target_event_id: i32,
) -> Result<Option<InspectionEvent>, diesel::result::Error> {
    use crate::schema::inspection_events::dsl::*;
    inspection_events
        .filter(id.eq(target_event_id))
        .first::<InspectionEvent>(conn)
        .optional()
}

/// One page of events, newest reference date first, with the total count.
pub fn list_events(
    conn: &mut SqliteConnection,
    limit: i64,
    offset: i64,
) -> Result<(Vec<InspectionEvent>, i64), diesel::result::Error> {
    use crate::schema::inspection_events::dsl::*;

    let items = inspection_events
        .order(reference_date.desc())
        .limit(limit)
        .offset(offset)
        .load::<InspectionEvent>(conn)?;

    let total = inspection_events.count().get_result::<i64>(conn)?;

    Ok((items, total))
}

/// All responses of an event joined with their school names, ordered by
/// school name for stable display.
pub fn get_responses_with_schools(
    conn: &mut SqliteConnection,
    target_event_id: i32,
) -> Result<Vec<InspectionResponseWithSchool>, diesel::result::Error> {
    use crate::schema::inspection_responses::dsl::*;
    use crate::schema::schools;

    let rows = inspection_responses
        .inner_join(schools::table)
        .filter(event_id.eq(target_event_id))
        .order(schools::name.asc())
        .select((InspectionResponse::as_select(), schools::name))
        .load::<(InspectionResponse, String)>(conn)?;

    Ok(rows
        .into_iter()
        .map(|(response, school_name)| InspectionResponseWithSchool {
            response,
            school_name,
        })
        .collect())
}

/// The response of one school within one event.
pub fn get_response(
    conn: &mut SqliteConnection,
    target_event_id: i32,
    target_school_id: i32,
) -> Result<Option<InspectionResponse>, diesel::result::Error> {
    use crate::schema::inspection_responses::dsl::*;
    inspection_responses
        .filter(event_id.eq(target_event_id))
        .filter(school_id.eq(target_school_id))
        .first::<InspectionResponse>(conn)
        .optional()
}

/// Updates a response's flags. Only provided flags change.
pub fn update_response_flags(
    conn: &mut SqliteConnection,
    target_event_id: i32,
    target_school_id: i32,
    new_responded: Option<bool>,
    new_notified: Option<bool>,
) -> Result<InspectionResponse, diesel::result::Error> {
    use crate::schema::inspection_responses::dsl::*;

    if let Some(val) = new_responded {
        diesel::update(
            inspection_responses
                .filter(event_id.eq(target_event_id))
                .filter(school_id.eq(target_school_id)),
        )
        .set(responded.eq(val))
        .execute(conn)?;
    }
    if let Some(val) = new_notified {
        diesel::update(
            inspection_responses
                .filter(event_id.eq(target_event_id))
                .filter(school_id.eq(target_school_id)),
        )
        .set(notified.eq(val))
        .execute(conn)?;
    }

    diesel::update(
        inspection_responses
            .filter(event_id.eq(target_event_id))
            .filter(school_id.eq(target_school_id)),
    )
    .set(updated_at.eq(Utc::now().naive_utc()))
    .execute(conn)?;

    inspection_responses
        .filter(event_id.eq(target_event_id))
        .filter(school_id.eq(target_school_id))
        .first::<InspectionResponse>(conn)
}

/// Deletes an event by id; responses cascade.
/// Returns Ok(true) if the event was found and deleted.
pub fn delete_event(
    conn: &mut SqliteConnection,
    target_event_id: i32,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::inspection_events::dsl::*;
    let rows_affected =
        diesel::delete(inspection_events.filter(id.eq(target_event_id))).execute(conn)?;
    Ok(rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::school::insert_school;
    use crate::orm::testing::{sample_school_input, setup_test_db};

    fn event_input(y: i32, m: u32, d: u32) -> InspectionEventInput {
        InspectionEventInput {
            reference_date: chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            description: Some("Vistoria semestral".to_string()),
        }
    }

    #[test]
    fn test_insert_event_fans_out_responses() {
        let mut conn = setup_test_db();
        insert_school(&mut conn, sample_school_input("EM Um", 1)).unwrap();
        insert_school(&mut conn, sample_school_input("EM Dois", 2)).unwrap();

        let event = insert_event(&mut conn, event_input(2025, 6, 1)).unwrap();

        let responses = get_responses_with_schools(&mut conn, event.id).unwrap();
        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| !r.response.responded && !r.response.notified));
        // Ordered by school name.
        assert_eq!(responses[0].school_name, "EM Dois");
    }

    #[test]
    fn test_update_response_flags() {
        let mut conn = setup_test_db();
        let school = insert_school(&mut conn, sample_school_input("EM Um", 1)).unwrap();
        let event = insert_event(&mut conn, event_input(2025, 6, 1)).unwrap();

        let updated =
            update_response_flags(&mut conn, event.id, school.id, Some(true), None).unwrap();
        assert!(updated.responded);
        assert!(!updated.notified);

        let updated =
            update_response_flags(&mut conn, event.id, school.id, None, Some(true)).unwrap();
        assert!(updated.responded);
        assert!(updated.notified);
    }

    #[test]
    fn test_delete_event_cascades() {
        let mut conn = setup_test_db();
        let school = insert_school(&mut conn, sample_school_input("EM Um", 1)).unwrap();
        let event = insert_event(&mut conn, event_input(2025, 6, 1)).unwrap();

        assert!(delete_event(&mut conn, event.id).unwrap());
        assert!(get_event_by_id(&mut conn, event.id).unwrap().is_none());
        assert!(get_response(&mut conn, event.id, school.id).unwrap().is_none());
    }

    #[test]
    fn test_list_events_newest_first() {
        let mut conn = setup_test_db();
        insert_event(&mut conn, event_input(2025, 3, 1)).unwrap();
        insert_event(&mut conn, event_input(2025, 6, 1)).unwrap();

        let (items, total) = list_events(&mut conn, 20, 0).unwrap();
        assert_eq!(total, 2);
        assert_eq!(
            items[0].reference_date,
            chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
    }
}
