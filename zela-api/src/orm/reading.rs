//! Database operations for water-consumption readings.
//!
//! Consumption, the allowed limit and the over-limit flag are derived
//! once, when the reading is inserted, from the latest earlier reading
//! of the same school (see [`crate::consumption`]). Later edits only
//! touch the justification text, so the stored figures stay what the
//! district saw when the reading was taken.

use chrono::{NaiveDate, Utc};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::consumption::derive_reading;
use crate::models::{NewWaterReading, WaterReading, WaterReadingInput};

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    last_insert_rowid: i64,
}

/// First day of the given month and first day of the following month,
/// bounding the month as a half-open date range.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, end))
}

/// The most recent reading of the school strictly before `date`.
pub fn latest_prior_reading(
    conn: &mut SqliteConnection,
    target_school_id: i32,
    date: NaiveDate,
) -> Result<Option<WaterReading>, diesel::result::Error> {
    use crate::schema::water_readings::dsl::*;
    water_readings
        .filter(school_id.eq(target_school_id))
        .filter(reading_date.lt(date))
        .order(reading_date.desc())
        .first::<WaterReading>(conn)
        .optional()
}

/// Inserts a reading, deriving consumption, limit and over-limit flag
/// from the latest prior reading of the same school.
///
/// A second reading for the same school and date violates the unique
/// index and surfaces as a `UniqueViolation`.
pub fn insert_reading(
    conn: &mut SqliteConnection,
    input: WaterReadingInput,
    recorded_by_user: i32,
) -> Result<WaterReading, diesel::result::Error> {
    use crate::schema::water_readings::dsl::*;

    let previous = latest_prior_reading(conn, input.school_id, input.reading_date)?
        .map(|r| (r.reading_date, r.meter_value));
    let derived = derive_reading(previous, input.reading_date, input.meter_value, input.population);

    let new_reading = NewWaterReading {
        school_id: input.school_id,
        reading_date: input.reading_date,
        meter_value: input.meter_value,
        population: input.population,
        consumption: derived.consumption,
        daily_limit: derived.daily_limit,
        over_limit: derived.over_limit,
        justification: input.justification,
        corrective_action: input.corrective_action,
        recorded_by: recorded_by_user,
        created_at: Utc::now().naive_utc(),
    };

    diesel::insert_into(water_readings)
        .values(&new_reading)
        .execute(conn)?;

    let last_id = diesel::sql_query("SELECT last_insert_rowid() as last_insert_rowid")
        .get_result::<LastInsertRowId>(conn)?
        .last_insert_rowid;

    water_readings
        .filter(id.eq(last_id as i32))
        .first::<WaterReading>(conn)
}

/// Try to find a reading by id.
pub fn get_reading_by_id(
    conn: &mut SqliteConnection,
    reading_id: i32,
) -> Result<Option<WaterReading>, diesel::result::Error> {
    use crate::schema::water_readings::dsl::*;
    water_readings
        .filter(id.eq(reading_id))
        .first::<WaterReading>(conn)
        .optional()
}

/// One page of a school's readings, newest first, optionally restricted
/// to one calendar month; returns the total match count as well.
pub fn search_readings(
    conn: &mut SqliteConnection,
    target_school_id: i32,
    month: Option<(NaiveDate, NaiveDate)>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<WaterReading>, i64), diesel::result::Error> {
    use crate::schema::water_readings::dsl::*;

    let mut query = water_readings
        .filter(school_id.eq(target_school_id))
        .into_boxed();
    if let Some((start, end)) = month {
        query = query.filter(reading_date.ge(start)).filter(reading_date.lt(end));
    }
    let items = query
        .order(reading_date.desc())
        .limit(limit)
        .offset(offset)
        .load::<WaterReading>(conn)?;

    let mut count_query = water_readings
        .filter(school_id.eq(target_school_id))
        .into_boxed();
    if let Some((start, end)) = month {
        count_query = count_query
            .filter(reading_date.ge(start))
            .filter(reading_date.lt(end));
    }
    let total = count_query.count().get_result::<i64>(conn)?;

    Ok((items, total))
}

/// All readings of a school within one month, in date order. Used by
/// the monthly PDF report.
pub fn readings_for_month(
    conn: &mut SqliteConnection,
    target_school_id: i32,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<WaterReading>, diesel::result::Error> {
    use crate::schema::water_readings::dsl::*;
    water_readings
        .filter(school_id.eq(target_school_id))
        .filter(reading_date.ge(start))
        .filter(reading_date.lt(end))
        .order(reading_date.asc())
        .load::<WaterReading>(conn)
}

/// Updates the free-text fields of a reading. The derived figures are
/// immutable once stored.
pub fn update_reading_notes(
    conn: &mut SqliteConnection,
    reading_id: i32,
    new_justification: Option<Option<String>>,
    new_corrective_action: Option<Option<String>>,
) -> Result<WaterReading, diesel::result::Error> {
    use crate::schema::water_readings::dsl::*;

    if let Some(val) = new_justification {
        diesel::update(water_readings.filter(id.eq(reading_id)))
            .set(justification.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_corrective_action {
        diesel::update(water_readings.filter(id.eq(reading_id)))
            .set(corrective_action.eq(val))
            .execute(conn)?;
    }

    water_readings
        .filter(id.eq(reading_id))
        .first::<WaterReading>(conn)
}

/// Deletes a reading by id.
/// Returns Ok(true) if the reading was found and deleted.
pub fn delete_reading(
    conn: &mut SqliteConnection,
    reading_id: i32,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::water_readings::dsl::*;
    let rows_affected = diesel::delete(water_readings.filter(id.eq(reading_id))).execute(conn)?;
    Ok(rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ROLE_DISTRICT, UserInput};
    use crate::orm::login::hash_password;
    use crate::orm::school::insert_school;
    use crate::orm::testing::{sample_school_input, setup_test_db};
    use crate::orm::user::insert_user;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_school_and_user(conn: &mut SqliteConnection) -> (i32, i32) {
        let school = insert_school(conn, sample_school_input("EM Hidrometro", 1)).unwrap();
        let user = insert_user(
            conn,
            UserInput {
                name: "Recorder".to_string(),
                email: "recorder@zela.local".to_string(),
                password_hash: hash_password("secret"),
                role: ROLE_DISTRICT.to_string(),
                school_id: None,
            },
        )
        .unwrap();
        (school.id, user.id)
    }

    fn reading_input(school: i32, d: NaiveDate, meter: f64, pop: i32) -> WaterReadingInput {
        WaterReadingInput {
            school_id: school,
            reading_date: d,
            meter_value: meter,
            population: pop,
            justification: None,
            corrective_action: None,
        }
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(2025, 12).unwrap(),
            (date(2025, 12, 1), date(2026, 1, 1))
        );
        assert_eq!(
            month_bounds(2025, 3).unwrap(),
            (date(2025, 3, 1), date(2025, 4, 1))
        );
        assert!(month_bounds(2025, 13).is_none());
    }

    #[test]
    fn test_first_reading_has_zero_consumption() {
        let mut conn = setup_test_db();
        let (school, user) = setup_school_and_user(&mut conn);

        let reading =
            insert_reading(&mut conn, reading_input(school, date(2025, 3, 10), 500.0, 1000), user)
                .unwrap();
        assert_eq!(reading.consumption, 0.0);
        assert_eq!(reading.daily_limit, 8.0);
        assert!(!reading.over_limit);
    }

    #[test]
    fn test_same_month_consumption_and_over_limit() {
        let mut conn = setup_test_db();
        let (school, user) = setup_school_and_user(&mut conn);

        insert_reading(&mut conn, reading_input(school, date(2025, 3, 10), 500.0, 1000), user)
            .unwrap();
        let reading =
            insert_reading(&mut conn, reading_input(school, date(2025, 3, 11), 520.0, 1000), user)
                .unwrap();

        assert_eq!(reading.consumption, 20.0);
        assert_eq!(reading.daily_limit, 8.0);
        assert!(reading.over_limit);
    }

    #[test]
    fn test_month_rollover_resets_baseline() {
        let mut conn = setup_test_db();
        let (school, user) = setup_school_and_user(&mut conn);

        insert_reading(&mut conn, reading_input(school, date(2025, 3, 31), 500.0, 1000), user)
            .unwrap();
        let reading =
            insert_reading(&mut conn, reading_input(school, date(2025, 4, 1), 560.0, 1000), user)
                .unwrap();

        assert_eq!(reading.consumption, 0.0);
        assert!(!reading.over_limit);
    }

    #[test]
    fn test_duplicate_date_is_rejected() {
        let mut conn = setup_test_db();
        let (school, user) = setup_school_and_user(&mut conn);

        insert_reading(&mut conn, reading_input(school, date(2025, 3, 10), 500.0, 1000), user)
            .unwrap();
        let result =
            insert_reading(&mut conn, reading_input(school, date(2025, 3, 10), 501.0, 1000), user);
        assert!(matches!(
            result,
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _
            ))
        ));
    }

    #[test]
    fn test_search_readings_month_filter() {
        let mut conn = setup_test_db();
        let (school, user) = setup_school_and_user(&mut conn);

        insert_reading(&mut conn, reading_input(school, date(2025, 3, 10), 500.0, 100), user)
            .unwrap();
        insert_reading(&mut conn, reading_input(school, date(2025, 3, 11), 501.0, 100), user)
            .unwrap();
        insert_reading(&mut conn, reading_input(school, date(2025, 4, 2), 510.0, 100), user)
            .unwrap();

        let (items, total) =
            search_readings(&mut conn, school, month_bounds(2025, 3), 20, 0).unwrap();
        assert_eq!(total, 2);
        // Newest first.
        assert_eq!(items[0].reading_date, date(2025, 3, 11));

        let (_, total) = search_readings(&mut conn, school, None, 20, 0).unwrap();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_update_notes_keeps_derived_figures() {
        let mut conn = setup_test_db();
        let (school, user) = setup_school_and_user(&mut conn);

        insert_reading(&mut conn, reading_input(school, date(2025, 3, 10), 500.0, 1000), user)
            .unwrap();
        let reading =
            insert_reading(&mut conn, reading_input(school, date(2025, 3, 11), 520.0, 1000), user)
                .unwrap();

        let updated = update_reading_notes(
            &mut conn,
            reading.id,
            Some(Some("Vazamento no banheiro".to_string())),
            Some(Some("Reparo agendado".to_string())),
        )
        .unwrap();

        assert_eq!(updated.justification.as_deref(), Some("Vazamento no banheiro"));
        assert_eq!(updated.consumption, 20.0);
        assert!(updated.over_limit);
    }
}
