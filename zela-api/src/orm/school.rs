use chrono::Utc;
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::models::{NewSchool, School, SchoolInput};

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    last_insert_rowid: i64,
}

/// Filter options for the school list.
#[derive(Debug, Default, Clone)]
pub struct SchoolFilter {
    pub polo: Option<i32>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Free-text match against school name or director name.
    pub search: Option<String>,
}

/// Try to find a school by name (case-insensitive).
/// Returns Ok(Some(School)) if found, Ok(None) if not, Err on DB error.
pub fn get_school_by_name_case_insensitive(
    conn: &mut SqliteConnection,
    school_name: &str,
) -> Result<Option<School>, diesel::result::Error> {
    diesel::sql_query("SELECT * FROM schools WHERE LOWER(name) = LOWER(?)")
        .bind::<diesel::sql_types::Text, _>(school_name)
        .get_result::<School>(conn)
        .optional()
}

/// Try to find a school by id.
pub fn get_school_by_id(
    conn: &mut SqliteConnection,
    school_id: i32,
) -> Result<Option<School>, diesel::result::Error> {
    use crate::schema::schools::dsl::*;
    schools
        .filter(id.eq(school_id))
        .first::<School>(conn)
        .optional()
}

/// Inserts a new school and returns the stored row.
pub fn insert_school(
    conn: &mut SqliteConnection,
    input: SchoolInput,
) -> Result<School, diesel::result::Error> {
    use crate::schema::schools::dsl::*;

    let now = Utc::now().naive_utc();
    let new_school = NewSchool {
        name: input.name,
        city: input.city,
        state: input.state,
        director_name: input.director_name,
        phone: input.phone,
        email: input.email,
        polo: input.polo,
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(schools)
        .values(&new_school)
        .execute(conn)?;

    let last_id = diesel::sql_query("SELECT last_insert_rowid() as last_insert_rowid")
        .get_result::<LastInsertRowId>(conn)?
        .last_insert_rowid;

    schools.filter(id.eq(last_id as i32)).first::<School>(conn)
}

/// Returns all schools in ascending order by id.
pub fn get_all_schools(conn: &mut SqliteConnection) -> Result<Vec<School>, diesel::result::Error> {
    use crate::schema::schools::dsl::*;
    schools.order(id.asc()).load::<School>(conn)
}

/// One page of schools matching the filter, with the total match count.
pub fn search_schools(
    conn: &mut SqliteConnection,
    filter: &SchoolFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<School>, i64), diesel::result::Error> {
    let items = filtered_query(filter)
        .order(crate::schema::schools::dsl::name.asc())
        .limit(limit)
        .offset(offset)
        .load::<School>(conn)?;

    let total = filtered_query(filter).count().get_result::<i64>(conn)?;

    Ok((items, total))
}

fn filtered_query<'a>(
    filter: &SchoolFilter,
) -> crate::schema::schools::BoxedQuery<'a, diesel::sqlite::Sqlite> {
    use crate::schema::schools::dsl::*;

    let mut query = schools.into_boxed();
    if let Some(polo_val) = filter.polo {
        query = query.filter(polo.eq(polo_val));
    }
    if let Some(city_val) = &filter.city {
        query = query.filter(city.eq(city_val.clone()));
    }
    if let Some(state_val) = &filter.state {
        query = query.filter(state.eq(state_val.clone()));
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", term);
        query = query.filter(name.like(pattern.clone()).or(director_name.like(pattern)));
    }
    query
}

/// Updates a school's fields. Only provided fields change.
pub fn update_school(
    conn: &mut SqliteConnection,
    school_id: i32,
    new_name: Option<String>,
    new_city: Option<String>,
    new_state: Option<String>,
    new_director_name: Option<String>,
    new_phone: Option<String>,
    new_email: Option<String>,
    new_polo: Option<i32>,
) -> Result<School, diesel::result::Error> {
    use crate::schema::schools::dsl::*;

    if let Some(val) = new_name {
        diesel::update(schools.filter(id.eq(school_id)))
            .set(name.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_city {
        diesel::update(schools.filter(id.eq(school_id)))
            .set(city.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_state {
        diesel::update(schools.filter(id.eq(school_id)))
            .set(state.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_director_name {
        diesel::update(schools.filter(id.eq(school_id)))
            .set(director_name.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_phone {
        diesel::update(schools.filter(id.eq(school_id)))
            .set(phone.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_email {
        diesel::update(schools.filter(id.eq(school_id)))
            .set(email.eq(val))
            .execute(conn)?;
    }
    if let Some(val) = new_polo {
        diesel::update(schools.filter(id.eq(school_id)))
            .set(polo.eq(val))
            .execute(conn)?;
    }

    diesel::update(schools.filter(id.eq(school_id)))
        .set(updated_at.eq(Utc::now().naive_utc()))
        .execute(conn)?;

    schools.filter(id.eq(school_id)).first::<School>(conn)
}

/// True when any user, process, reading or inspection response still
/// references the school. Such schools must not be removed.
pub fn school_is_referenced(
    conn: &mut SqliteConnection,
    target_school_id: i32,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::{custodian_processes, inspection_responses, users, water_readings};

    let users_count: i64 = users::table
        .filter(users::school_id.eq(target_school_id))
        .count()
        .get_result(conn)?;
    if users_count > 0 {
        return Ok(true);
    }

    let processes_count: i64 = custodian_processes::table
        .filter(custodian_processes::school_id.eq(target_school_id))
        .count()
        .get_result(conn)?;
    if processes_count > 0 {
        return Ok(true);
    }

    let readings_count: i64 = water_readings::table
        .filter(water_readings::school_id.eq(target_school_id))
        .count()
        .get_result(conn)?;
    if readings_count > 0 {
        return Ok(true);
    }

    let responses_count: i64 = inspection_responses::table
        .filter(inspection_responses::school_id.eq(target_school_id))
        .count()
        .get_result(conn)?;
    Ok(responses_count > 0)
}

/// Deletes a school by id.
/// Returns Ok(true) if the school was found and deleted, Ok(false) if not
/// found. Callers check [`school_is_referenced`] first; the foreign keys
/// back that check up at the database level.
pub fn delete_school(
    conn: &mut SqliteConnection,
    school_id: i32,
) -> Result<bool, diesel::result::Error> {
    use crate::schema::schools::dsl::*;
    let rows_affected = diesel::delete(schools.filter(id.eq(school_id))).execute(conn)?;
    Ok(rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::{sample_school_input, setup_test_db};

    #[test]
    fn test_insert_school() {
        let mut conn = setup_test_db();
        let school = insert_school(&mut conn, sample_school_input("EM Santos Dumont", 2)).unwrap();
        assert!(school.id > 0);
        assert_eq!(school.name, "EM Santos Dumont");
        assert_eq!(school.polo, 2);
    }

    #[test]
    fn test_get_school_by_name_case_insensitive() {
        let mut conn = setup_test_db();
        let created = insert_school(&mut conn, sample_school_input("EM Tiradentes", 1)).unwrap();

        for probe in ["em tiradentes", "EM TIRADENTES", "Em Tiradentes"] {
            let found = get_school_by_name_case_insensitive(&mut conn, probe)
                .expect("query should succeed")
                .expect("school should be found");
            assert_eq!(found.id, created.id);
        }

        let missing = get_school_by_name_case_insensitive(&mut conn, "EM Inexistente").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_search_schools_filters() {
        let mut conn = setup_test_db();
        insert_school(&mut conn, sample_school_input("EM Norte", 1)).unwrap();
        insert_school(&mut conn, sample_school_input("EM Sul", 2)).unwrap();
        insert_school(&mut conn, sample_school_input("CE Sul Dois", 2)).unwrap();

        let filter = SchoolFilter {
            polo: Some(2),
            ..Default::default()
        };
        let (items, total) = search_schools(&mut conn, &filter, 20, 0).unwrap();
        assert_eq!(total, 2);
        assert!(items.iter().all(|s| s.polo == 2));

        let filter = SchoolFilter {
            search: Some("Norte".to_string()),
            ..Default::default()
        };
        let (items, total) = search_schools(&mut conn, &filter, 20, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].name, "EM Norte");
    }

    #[test]
    fn test_school_is_referenced() {
        use crate::models::{ROLE_SCHOOL, UserInput};
        use crate::orm::login::hash_password;
        use crate::orm::user::{delete_user, insert_user};

        let mut conn = setup_test_db();
        let school = insert_school(&mut conn, sample_school_input("EM Vinculada", 1)).unwrap();
        assert!(!school_is_referenced(&mut conn, school.id).unwrap());

        let user = insert_user(
            &mut conn,
            UserInput {
                name: "Diretor".to_string(),
                email: "ref@zela.local".to_string(),
                password_hash: hash_password("pw"),
                role: ROLE_SCHOOL.to_string(),
                school_id: Some(school.id),
            },
        )
        .unwrap();
        assert!(school_is_referenced(&mut conn, school.id).unwrap());

        delete_user(&mut conn, user.id).unwrap();
        assert!(!school_is_referenced(&mut conn, school.id).unwrap());
    }

    #[test]
    fn test_update_and_delete_school() {
        let mut conn = setup_test_db();
        let school = insert_school(&mut conn, sample_school_input("EM Velha", 1)).unwrap();

        let updated = update_school(
            &mut conn,
            school.id,
            Some("EM Nova".to_string()),
            None,
            None,
            None,
            None,
            None,
            Some(3),
        )
        .unwrap();
        assert_eq!(updated.name, "EM Nova");
        assert_eq!(updated.polo, 3);

        assert!(delete_school(&mut conn, school.id).unwrap());
        assert!(get_school_by_id(&mut conn, school.id).unwrap().is_none());
    }
}
